//! # ストーリーボードユースケース
//!
//! ストーリーボードセッションの作成・取得・削除とライブイベント配信を
//! 実装する。認可ルールはポーカーセッションと同一。

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    storyboard::{Storyboard, StoryboardId},
    team::TeamId,
    value_objects::SessionTitle,
};
use kaizenboard_infra::{
    event_bus::{SessionChannel, SessionEvent, SessionEventBus},
    repository::{StoryboardRepository, TeamRepository},
    session::SessionData,
};

use crate::error::ApiError;

/// ストーリーボードユースケース
pub struct StoryboardUseCase {
    boards: Arc<dyn StoryboardRepository>,
    teams:  Arc<dyn TeamRepository>,
    events: Arc<dyn SessionEventBus>,
    clock:  Arc<dyn Clock>,
}

impl StoryboardUseCase {
    pub fn new(
        boards: Arc<dyn StoryboardRepository>,
        teams: Arc<dyn TeamRepository>,
        events: Arc<dyn SessionEventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            boards,
            teams,
            events,
            clock,
        }
    }

    /// ストーリーボードを作成する
    pub async fn create(
        &self,
        actor: &SessionData,
        name: &str,
        team_id: Option<TeamId>,
    ) -> Result<Storyboard, ApiError> {
        if let Some(team_id) = &team_id {
            self.ensure_team_member(actor, team_id).await?;
        }

        let name = SessionTitle::new(name)?;
        let board = Storyboard::new(
            actor.user_id().clone(),
            team_id,
            name,
            self.clock.now(),
        );
        self.boards.insert(&board).await?;
        Ok(board)
    }

    /// 自分がオーナーのセッション一覧を取得する
    pub async fn list_mine(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), ApiError> {
        Ok(self.boards.list_for_owner(actor.user_id(), limit, offset).await?)
    }

    /// チームに紐づくセッション一覧を取得する
    pub async fn list_for_team(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), ApiError> {
        self.ensure_team_member(actor, team_id).await?;
        Ok(self.boards.list_for_team(team_id, limit, offset).await?)
    }

    /// セッションを取得する
    pub async fn get(
        &self,
        _actor: &SessionData,
        id: &StoryboardId,
    ) -> Result<Storyboard, ApiError> {
        self.find_board(id).await
    }

    /// セッションを削除する
    pub async fn delete(
        &self,
        actor: &SessionData,
        id: &StoryboardId,
    ) -> Result<(), ApiError> {
        let board = self.find_board(id).await?;

        if !board.is_owned_by(actor.user_id()) && !actor.is_admin() {
            return Err(ApiError::Forbidden(
                "オーナーのみセッションを削除できます".to_string(),
            ));
        }

        self.boards.delete(id).await?;
        Ok(())
    }

    /// ライブセッションへイベントを配信する
    pub async fn publish_event(
        &self,
        actor: &SessionData,
        id: &StoryboardId,
        event_type: &str,
        value: serde_json::Value,
    ) -> Result<(), ApiError> {
        self.find_board(id).await?;

        let event = SessionEvent {
            event_type: event_type.to_string(),
            user_id:    actor.user_id().to_string(),
            value,
        };
        self.events
            .publish(SessionChannel::Storyboard, &id.to_string(), &event)
            .await?;
        Ok(())
    }

    // --- 内部ヘルパー ---

    async fn find_board(&self, id: &StoryboardId) -> Result<Storyboard, ApiError> {
        self.boards
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("ストーリーボードが見つかりません: {id}"))
            })
    }

    async fn ensure_team_member(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
    ) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        self.teams
            .find_member_role(team_id, actor.user_id())
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                ApiError::Forbidden("チームのメンバーではありません".to_string())
            })
    }
}

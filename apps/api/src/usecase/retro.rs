//! # レトロスペクティブユースケース
//!
//! レトロセッションの作成・取得・フェーズ進行・削除とライブイベント配信を
//! 実装する。
//!
//! ## 認可ルール
//!
//! - 取得・イベント送信: ログイン済みユーザー全員
//! - チーム紐づけ・チーム別一覧: チームメンバーのみ
//! - フェーズ進行: オーナーのみ
//! - 削除: オーナーまたはアプリ管理者

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    retro::{BrainstormVisibility, Retro, RetroFormat, RetroId},
    team::TeamId,
    value_objects::SessionTitle,
};
use kaizenboard_infra::{
    event_bus::{SessionChannel, SessionEvent, SessionEventBus},
    repository::{RetroRepository, TeamRepository},
    session::SessionData,
};

use crate::error::ApiError;

/// レトロセッション作成の入力
#[derive(Debug, Clone)]
pub struct CreateRetroInput {
    pub name:       String,
    pub team_id:    Option<TeamId>,
    pub format:     RetroFormat,
    pub visibility: BrainstormVisibility,
    pub max_votes:  u8,
}

/// レトロスペクティブユースケース
pub struct RetroUseCase {
    retros: Arc<dyn RetroRepository>,
    teams:  Arc<dyn TeamRepository>,
    events: Arc<dyn SessionEventBus>,
    clock:  Arc<dyn Clock>,
}

impl RetroUseCase {
    pub fn new(
        retros: Arc<dyn RetroRepository>,
        teams: Arc<dyn TeamRepository>,
        events: Arc<dyn SessionEventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            retros,
            teams,
            events,
            clock,
        }
    }

    /// レトロセッションを作成する
    ///
    /// 作成直後のフェーズは Intro。
    pub async fn create(
        &self,
        actor: &SessionData,
        input: CreateRetroInput,
    ) -> Result<Retro, ApiError> {
        if let Some(team_id) = &input.team_id {
            self.ensure_team_member(actor, team_id).await?;
        }

        let name = SessionTitle::new(&input.name)?;
        let retro = Retro::new(
            actor.user_id().clone(),
            input.team_id,
            name,
            input.format,
            input.visibility,
            input.max_votes,
            self.clock.now(),
        )?;
        self.retros.insert(&retro).await?;
        Ok(retro)
    }

    /// 自分がオーナーのセッション一覧を取得する
    pub async fn list_mine(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), ApiError> {
        Ok(self.retros.list_for_owner(actor.user_id(), limit, offset).await?)
    }

    /// チームに紐づくセッション一覧を取得する
    pub async fn list_for_team(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), ApiError> {
        self.ensure_team_member(actor, team_id).await?;
        Ok(self.retros.list_for_team(team_id, limit, offset).await?)
    }

    /// セッションを取得する
    pub async fn get(&self, _actor: &SessionData, id: &RetroId) -> Result<Retro, ApiError> {
        self.find_retro(id).await
    }

    /// フェーズを 1 段階進める
    ///
    /// 進行後の状態を永続化し、接続中の参加者に `phase_advanced` イベントを
    /// 配信する。完了済みセッションの進行は 400 エラーになる。
    pub async fn advance(&self, actor: &SessionData, id: &RetroId) -> Result<Retro, ApiError> {
        let retro = self.find_retro(id).await?;

        if !retro.is_owned_by(actor.user_id()) {
            return Err(ApiError::Forbidden(
                "オーナーのみフェーズを進行できます".to_string(),
            ));
        }

        let advanced = retro.advanced(self.clock.now())?;
        self.retros.update(&advanced).await?;

        let event = SessionEvent {
            event_type: "phase_advanced".to_string(),
            user_id:    actor.user_id().to_string(),
            value:      serde_json::json!({ "phase": advanced.phase() }),
        };
        self.events
            .publish(SessionChannel::Retro, &id.to_string(), &event)
            .await?;

        Ok(advanced)
    }

    /// セッションを削除する
    pub async fn delete(&self, actor: &SessionData, id: &RetroId) -> Result<(), ApiError> {
        let retro = self.find_retro(id).await?;

        if !retro.is_owned_by(actor.user_id()) && !actor.is_admin() {
            return Err(ApiError::Forbidden(
                "オーナーのみセッションを削除できます".to_string(),
            ));
        }

        self.retros.delete(id).await?;
        Ok(())
    }

    /// ライブセッションへイベントを配信する
    pub async fn publish_event(
        &self,
        actor: &SessionData,
        id: &RetroId,
        event_type: &str,
        value: serde_json::Value,
    ) -> Result<(), ApiError> {
        self.find_retro(id).await?;

        let event = SessionEvent {
            event_type: event_type.to_string(),
            user_id:    actor.user_id().to_string(),
            value,
        };
        self.events
            .publish(SessionChannel::Retro, &id.to_string(), &event)
            .await?;
        Ok(())
    }

    // --- 内部ヘルパー ---

    async fn find_retro(&self, id: &RetroId) -> Result<Retro, ApiError> {
        self.retros
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("レトロスペクティブが見つかりません: {id}"))
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

//! # プランニングポーカーユースケース
//!
//! ポーカーセッションの作成・取得・削除とライブイベント配信を実装する。
//!
//! ## 認可ルール
//!
//! - 取得・イベント送信: ログイン済みユーザー全員
//!   （セッションは URL 共有で参加できる）
//! - チーム紐づけ・チーム別一覧: チームメンバーのみ
//! - 削除: オーナーまたはアプリ管理者

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    poker::{PointScale, PokerGame, PokerGameId, RoundingMode},
    team::TeamId,
    value_objects::SessionTitle,
};
use kaizenboard_infra::{
    event_bus::{SessionChannel, SessionEvent, SessionEventBus},
    repository::{PokerRepository, TeamRepository},
    session::SessionData,
};

use crate::error::ApiError;

/// ポーカーセッション作成の入力
#[derive(Debug, Clone)]
pub struct CreatePokerInput {
    pub name:               String,
    pub team_id:            Option<TeamId>,
    pub point_scale:        Option<Vec<String>>,
    pub auto_finish_voting: bool,
    pub rounding:           RoundingMode,
}

/// プランニングポーカーユースケース
pub struct PokerUseCase {
    pokers: Arc<dyn PokerRepository>,
    teams:  Arc<dyn TeamRepository>,
    events: Arc<dyn SessionEventBus>,
    clock:  Arc<dyn Clock>,
}

impl PokerUseCase {
    pub fn new(
        pokers: Arc<dyn PokerRepository>,
        teams: Arc<dyn TeamRepository>,
        events: Arc<dyn SessionEventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pokers,
            teams,
            events,
            clock,
        }
    }

    /// ポーカーセッションを作成する
    ///
    /// ポイントスケール省略時は標準スケールを使用する。
    pub async fn create(
        &self,
        actor: &SessionData,
        input: CreatePokerInput,
    ) -> Result<PokerGame, ApiError> {
        if let Some(team_id) = &input.team_id {
            self.ensure_team_member(actor, team_id).await?;
        }

        let name = SessionTitle::new(&input.name)?;
        let point_scale = match input.point_scale {
            Some(values) => PointScale::new(values)?,
            None => PointScale::standard(),
        };

        let game = PokerGame::new(
            actor.user_id().clone(),
            input.team_id,
            name,
            point_scale,
            input.auto_finish_voting,
            input.rounding,
            self.clock.now(),
        );
        self.pokers.insert(&game).await?;
        Ok(game)
    }

    /// 自分がオーナーのセッション一覧を取得する
    pub async fn list_mine(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), ApiError> {
        Ok(self.pokers.list_for_owner(actor.user_id(), limit, offset).await?)
    }

    /// チームに紐づくセッション一覧を取得する
    pub async fn list_for_team(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), ApiError> {
        self.ensure_team_member(actor, team_id).await?;
        Ok(self.pokers.list_for_team(team_id, limit, offset).await?)
    }

    /// セッションを取得する
    pub async fn get(
        &self,
        _actor: &SessionData,
        id: &PokerGameId,
    ) -> Result<PokerGame, ApiError> {
        self.find_game(id).await
    }

    /// セッションを削除する
    pub async fn delete(
        &self,
        actor: &SessionData,
        id: &PokerGameId,
    ) -> Result<(), ApiError> {
        let game = self.find_game(id).await?;

        if !game.is_owned_by(actor.user_id()) && !actor.is_admin() {
            return Err(ApiError::Forbidden(
                "オーナーのみセッションを削除できます".to_string(),
            ));
        }

        self.pokers.delete(id).await?;
        Ok(())
    }

    /// ライブセッションへイベントを配信する
    ///
    /// 投票やラウンド操作のリアルタイム処理は WebSocket サーバー側が
    /// 担当するため、ここではチャンネルへの配信のみを行う。
    pub async fn publish_event(
        &self,
        actor: &SessionData,
        id: &PokerGameId,
        event_type: &str,
        value: serde_json::Value,
    ) -> Result<(), ApiError> {
        self.find_game(id).await?;

        let event = SessionEvent {
            event_type: event_type.to_string(),
            user_id:    actor.user_id().to_string(),
            value,
        };
        self.events
            .publish(SessionChannel::Poker, &id.to_string(), &event)
            .await?;
        Ok(())
    }

    // --- 内部ヘルパー ---

    async fn find_game(&self, id: &PokerGameId) -> Result<PokerGame, ApiError> {
        self.pokers
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("ポーカーセッションが見つかりません: {id}"))
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

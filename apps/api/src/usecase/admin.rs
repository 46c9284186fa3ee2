//! # 管理者ユースケース
//!
//! アプリケーション全体の集計値取得と、ユーザーの一覧・ロール変更を
//! 実装する。すべての操作はアプリ管理者のみ実行できる。

use std::sync::Arc;

use kaizenboard_domain::{clock::Clock, user::User, user::UserId};
use kaizenboard_infra::{
    repository::{ApplicationStats, StatsRepository, UserRepository},
    session::SessionData,
};

use crate::error::{ApiError, require_admin};

/// 管理者ユースケース
pub struct AdminUseCase {
    stats: Arc<dyn StatsRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl AdminUseCase {
    pub fn new(
        stats: Arc<dyn StatsRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stats,
            users,
            clock,
        }
    }

    /// アプリケーション全体の集計値を取得する
    pub async fn application_stats(
        &self,
        actor: &SessionData,
    ) -> Result<ApplicationStats, ApiError> {
        require_admin(actor)?;
        Ok(self.stats.application_stats().await?)
    }

    /// 全ユーザー一覧を取得する
    pub async fn list_users(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), ApiError> {
        require_admin(actor)?;
        Ok(self.users.list(limit, offset).await?)
    }

    /// ユーザーを管理者に昇格する
    ///
    /// ゲストユーザーは昇格できない。
    pub async fn promote_user(
        &self,
        actor: &SessionData,
        user_id: &UserId,
    ) -> Result<User, ApiError> {
        require_admin(actor)?;

        let user = self.find_user(user_id).await?;
        let promoted = user.promoted(self.clock.now())?;
        self.users.update(&promoted).await?;
        Ok(promoted)
    }

    /// 管理者を一般ユーザーに降格する
    ///
    /// 自分自身の降格も許可する（最後の管理者の保護は運用に委ねる）。
    pub async fn demote_user(
        &self,
        actor: &SessionData,
        user_id: &UserId,
    ) -> Result<User, ApiError> {
        require_admin(actor)?;

        let user = self.find_user(user_id).await?;
        let demoted = user.demoted(self.clock.now());
        self.users.update(&demoted).await?;
        Ok(demoted)
    }

    async fn find_user(&self, id: &UserId) -> Result<User, ApiError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {id}")))
    }
}

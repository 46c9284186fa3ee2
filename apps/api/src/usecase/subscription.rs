//! # サブスクリプションユースケース
//!
//! 有料プランの契約状態の参照と管理を実装する。
//!
//! ## 認可ルール
//!
//! - 自分の契約一覧: 本人
//! - 作成・更新・解約・削除・全件一覧: アプリ管理者のみ
//!   （決済プロバイダの Webhook を受けた管理バッチが使用する想定）

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kaizenboard_domain::{
    clock::Clock,
    subscription::{Subscription, SubscriptionId, SubscriptionPlan},
    user::UserId,
};
use kaizenboard_infra::{
    repository::{SubscriptionRepository, UserRepository},
    session::SessionData,
};

use crate::error::{ApiError, require_admin};

/// サブスクリプションユースケース
pub struct SubscriptionUseCase {
    subscriptions: Arc<dyn SubscriptionRepository>,
    users:         Arc<dyn UserRepository>,
    clock:         Arc<dyn Clock>,
}

impl SubscriptionUseCase {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            users,
            clock,
        }
    }

    /// 自分の現在有効なサブスクリプションを取得する
    ///
    /// 有効な契約がなければ `None` を返す（エラーにはしない）。
    pub async fn current_for(
        &self,
        actor: &SessionData,
    ) -> Result<Option<Subscription>, ApiError> {
        let now = self.clock.now();
        let subscriptions = self.subscriptions.list_for_user(actor.user_id()).await?;

        Ok(subscriptions
            .into_iter()
            .find(|s| s.is_valid_at(now)))
    }

    /// サブスクリプションを作成する（管理者）
    pub async fn create(
        &self,
        actor: &SessionData,
        user_id: &UserId,
        customer_id: &str,
        provider_subscription_id: &str,
        plan: SubscriptionPlan,
        expires_at: DateTime<Utc>,
    ) -> Result<Subscription, ApiError> {
        require_admin(actor)?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {user_id}")))?;

        let now = self.clock.now();
        let subscription = Subscription::new(
            user_id.clone(),
            customer_id,
            provider_subscription_id,
            plan,
            expires_at,
            now,
        )?;
        self.subscriptions.insert(&subscription).await?;
        Ok(subscription)
    }

    /// サブスクリプションを取得する（管理者）
    pub async fn get(
        &self,
        actor: &SessionData,
        id: &SubscriptionId,
    ) -> Result<Subscription, ApiError> {
        require_admin(actor)?;
        self.find_subscription(id).await
    }

    /// 全サブスクリプション一覧を取得する（管理者）
    pub async fn list(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Subscription>, i64), ApiError> {
        require_admin(actor)?;
        Ok(self.subscriptions.list(limit, offset).await?)
    }

    /// 有効期限を延長する（管理者）
    pub async fn extend(
        &self,
        actor: &SessionData,
        id: &SubscriptionId,
        expires_at: DateTime<Utc>,
    ) -> Result<Subscription, ApiError> {
        require_admin(actor)?;

        let subscription = self.find_subscription(id).await?;
        let updated = subscription.with_expiry(expires_at, self.clock.now());
        self.subscriptions.update(&updated).await?;
        Ok(updated)
    }

    /// 解約する（管理者）
    ///
    /// レコードは残し、アクティブフラグのみ落とす。
    pub async fn deactivate(
        &self,
        actor: &SessionData,
        id: &SubscriptionId,
    ) -> Result<Subscription, ApiError> {
        require_admin(actor)?;

        let subscription = self.find_subscription(id).await?;
        let updated = subscription.deactivated(self.clock.now());
        self.subscriptions.update(&updated).await?;
        Ok(updated)
    }

    /// サブスクリプションを削除する（管理者）
    pub async fn delete(
        &self,
        actor: &SessionData,
        id: &SubscriptionId,
    ) -> Result<(), ApiError> {
        require_admin(actor)?;

        self.find_subscription(id).await?;
        self.subscriptions.delete(id).await?;
        Ok(())
    }

    // --- 内部ヘルパー ---

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Subscription, ApiError> {
        self.subscriptions
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("サブスクリプションが見つかりません: {id}"))
            })
    }
}

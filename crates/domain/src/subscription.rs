//! # サブスクリプション（エンティティ）
//!
//! 有料プランの契約状態を表現する。
//!
//! ## 設計方針
//!
//! - 決済プロバイダ側の顧客 ID・契約 ID は不透明な文字列として保持する
//! - 有効判定は「アクティブフラグ」かつ「有効期限内」の両方を満たすこと

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{DomainError, user::UserId};

define_uuid_id! {
    /// サブスクリプション ID
    pub struct SubscriptionId;
}

/// サブスクリプションの対象プラン
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionPlan {
    /// 個人プラン
    Individual,
    /// チームプラン
    Team,
    /// 組織プラン
    Organization,
}

/// サブスクリプション（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id:          SubscriptionId,
    user_id:     UserId,
    customer_id: String,
    provider_subscription_id: String,
    plan:        SubscriptionPlan,
    active:      bool,
    expires_at:  DateTime<Utc>,
    created_at:  DateTime<Utc>,
    updated_at:  DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        user_id: UserId,
        customer_id: impl Into<String>,
        provider_subscription_id: impl Into<String>,
        plan: SubscriptionPlan,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let customer_id = customer_id.into();
        let provider_subscription_id = provider_subscription_id.into();

        if customer_id.trim().is_empty() {
            return Err(DomainError::Validation("顧客 ID は必須です".to_string()));
        }

        if provider_subscription_id.trim().is_empty() {
            return Err(DomainError::Validation("契約 ID は必須です".to_string()));
        }

        Ok(Self {
            id: SubscriptionId::new(),
            user_id,
            customer_id,
            provider_subscription_id,
            plan,
            active: true,
            expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: SubscriptionId,
        user_id: UserId,
        customer_id: String,
        provider_subscription_id: String,
        plan: SubscriptionPlan,
        active: bool,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            customer_id,
            provider_subscription_id,
            plan,
            active,
            expires_at,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn provider_subscription_id(&self) -> &str {
        &self.provider_subscription_id
    }

    pub fn plan(&self) -> SubscriptionPlan {
        self.plan
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn expires_at(&self) -> &DateTime<Utc> {
        &self.expires_at
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    /// 指定時点で有効か
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at > now
    }

    /// 有効期限を延長した新しいインスタンスを返す
    pub fn with_expiry(self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            updated_at: now,
            ..self
        }
    }

    /// 解約した新しいインスタンスを返す
    pub fn deactivated(self, now: DateTime<Utc>) -> Self {
        Self {
            active: false,
            updated_at: now,
            ..self
        }
    }
}

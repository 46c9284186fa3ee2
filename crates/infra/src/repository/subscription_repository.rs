//! # SubscriptionRepository
//!
//! サブスクリプションの永続化を担当するリポジトリ。

use async_trait::async_trait;
use kaizenboard_domain::{
    subscription::{Subscription, SubscriptionId, SubscriptionPlan},
    user::UserId,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::error::InfraError;

/// サブスクリプションリポジトリトレイト
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// サブスクリプションを保存する
    async fn insert(&self, subscription: &Subscription) -> Result<(), InfraError>;

    /// ID でサブスクリプションを検索する
    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, InfraError>;

    /// ユーザーのサブスクリプション一覧を取得する
    async fn list_for_user(&self, user_id: &UserId)
    -> Result<Vec<Subscription>, InfraError>;

    /// 全サブスクリプション一覧を取得する（管理者向け）
    async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Subscription>, i64), InfraError>;

    /// サブスクリプションを更新する
    async fn update(&self, subscription: &Subscription) -> Result<(), InfraError>;

    /// サブスクリプションを削除する
    async fn delete(&self, id: &SubscriptionId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の SubscriptionRepository
#[derive(Debug, Clone)]
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, customer_id, provider_subscription_id, \
                              plan, active, expires_at, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<Subscription, InfraError> {
    Ok(Subscription::from_db(
        SubscriptionId::from_uuid(row.try_get("id")?),
        UserId::from_uuid(row.try_get("user_id")?),
        row.try_get("customer_id")?,
        row.try_get("provider_subscription_id")?,
        row.try_get::<String, _>("plan")?
            .parse::<SubscriptionPlan>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("active")?,
        row.try_get("expires_at")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, user_id, customer_id, provider_subscription_id,
                 plan, active, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(subscription.id().as_uuid())
        .bind(subscription.user_id().as_uuid())
        .bind(subscription.customer_id())
        .bind(subscription.provider_subscription_id())
        .bind(subscription.plan().to_string())
        .bind(subscription.active())
        .bind(subscription.expires_at())
        .bind(subscription.created_at())
        .bind(subscription.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, InfraError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Subscription>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM subscriptions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let subscriptions = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((subscriptions, total))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET plan = $2, active = $3, expires_at = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(subscription.id().as_uuid())
        .bind(subscription.plan().to_string())
        .bind(subscription.active())
        .bind(subscription.expires_at())
        .bind(subscription.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! # CredentialsRepository
//!
//! パスワードハッシュの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - 認証情報は `users` とは別テーブルに分離し、通常のユーザー取得で
//!   ハッシュがメモリに乗らないようにする
//! - ゲストユーザーは認証情報を持たない

use async_trait::async_trait;
use kaizenboard_domain::{password::PasswordHash, user::UserId};
use sqlx::{PgPool, Row as _};

use crate::error::InfraError;

/// 認証情報リポジトリトレイト
#[async_trait]
pub trait CredentialsRepository: Send + Sync {
    /// パスワードハッシュを保存する（既存なら置き換える）
    async fn upsert(&self, user_id: &UserId, hash: &PasswordHash) -> Result<(), InfraError>;

    /// ユーザーのパスワードハッシュを取得する
    async fn find_by_user_id(&self, user_id: &UserId)
    -> Result<Option<PasswordHash>, InfraError>;

    /// ユーザーの認証情報を削除する
    async fn delete(&self, user_id: &UserId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の CredentialsRepository
#[derive(Debug, Clone)]
pub struct PostgresCredentialsRepository {
    pool: PgPool,
}

impl PostgresCredentialsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialsRepository for PostgresCredentialsRepository {
    async fn upsert(&self, user_id: &UserId, hash: &PasswordHash) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO user_credentials (user_id, password_hash, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(hash.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PasswordHash>, InfraError> {
        let row = sqlx::query(
            "SELECT password_hash FROM user_credentials WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(PasswordHash::new(
                row.try_get::<String, _>("password_hash")?,
            ))),
            None => Ok(None),
        }
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM user_credentials WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

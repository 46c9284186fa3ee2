//! # UserRepository
//!
//! ユーザー情報の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - ゲストユーザーは `email` が NULL の行として保存する
//! - メールアドレスの一意制約違反は Conflict エラーに変換する
//! - 一覧はページネーション（limit/offset）+ 総件数で返す

use async_trait::async_trait;
use kaizenboard_domain::{
    user::{Email, User, UserId, UserRole, UserStatus},
    value_objects::UserName,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::{error::InfraError, repository::map_unique_violation};

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーを保存する
    ///
    /// メールアドレスが既に存在する場合は Conflict エラーを返す。
    async fn insert(&self, user: &User) -> Result<(), InfraError>;

    /// ID でユーザーを検索する
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

    /// メールアドレスでユーザーを検索する
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError>;

    /// ユーザー一覧を取得する（管理者向け）
    ///
    /// # 戻り値
    ///
    /// `(ユーザーのページ, 総件数)`
    async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), InfraError>;

    /// ユーザーを更新する
    async fn update(&self, user: &User) -> Result<(), InfraError>;

    /// ユーザーを削除する
    ///
    /// 所有するセッション・メンバーシップは DB のカスケードで削除される。
    async fn delete(&self, id: &UserId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, name, email, role, status, last_active_at, created_at, updated_at";

/// DB の行を User エンティティに変換する
fn map_row(row: &PgRow) -> Result<User, InfraError> {
    let email = row
        .try_get::<Option<String>, _>("email")?
        .map(Email::new)
        .transpose()
        .map_err(|e| InfraError::unexpected(e.to_string()))?;

    Ok(User::from_db(
        UserId::from_uuid(row.try_get("id")?),
        UserName::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        email,
        row.try_get::<String, _>("role")?
            .parse::<UserRole>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get::<String, _>("status")?
            .parse::<UserStatus>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("last_active_at")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, status, last_active_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.name().as_str())
        .bind(user.email().map(Email::as_str))
        .bind(user.role().to_string())
        .bind(user.status().to_string())
        .bind(user.last_active_at())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let id = user.email().map_or_else(|| user.id().to_string(), |e| e.as_str().to_string());
            map_unique_violation(e, "User", id)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM users ORDER BY created_at LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let users = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((users, total))
    }

    async fn update(&self, user: &User) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, role = $4, status = $5,
                last_active_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.name().as_str())
        .bind(user.email().map(Email::as_str))
        .bind(user.role().to_string())
        .bind(user.status().to_string())
        .bind(user.last_active_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "User", user.id().to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

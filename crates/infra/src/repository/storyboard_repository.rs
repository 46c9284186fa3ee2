//! # StoryboardRepository
//!
//! ストーリーボードセッションの永続化を担当するリポジトリ。

use async_trait::async_trait;
use kaizenboard_domain::{
    storyboard::{Storyboard, StoryboardId},
    team::TeamId,
    user::UserId,
    value_objects::SessionTitle,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::error::InfraError;

/// ストーリーボードリポジトリトレイト
#[async_trait]
pub trait StoryboardRepository: Send + Sync {
    /// セッションを保存する
    async fn insert(&self, board: &Storyboard) -> Result<(), InfraError>;

    /// ID でセッションを検索する
    async fn find_by_id(&self, id: &StoryboardId) -> Result<Option<Storyboard>, InfraError>;

    /// ユーザーがオーナーのセッション一覧を取得する
    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), InfraError>;

    /// チームに紐づくセッション一覧を取得する
    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), InfraError>;

    /// セッションを削除する
    async fn delete(&self, id: &StoryboardId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の StoryboardRepository
#[derive(Debug, Clone)]
pub struct PostgresStoryboardRepository {
    pool: PgPool,
}

impl PostgresStoryboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, owner_id, team_id, name, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<Storyboard, InfraError> {
    Ok(Storyboard::from_db(
        StoryboardId::from_uuid(row.try_get("id")?),
        UserId::from_uuid(row.try_get("owner_id")?),
        row.try_get::<Option<uuid::Uuid>, _>("team_id")?
            .map(TeamId::from_uuid),
        SessionTitle::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl StoryboardRepository for PostgresStoryboardRepository {
    async fn insert(&self, board: &Storyboard) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO storyboards (id, owner_id, team_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(board.id().as_uuid())
        .bind(board.owner_id().as_uuid())
        .bind(board.team_id().map(TeamId::as_uuid))
        .bind(board.name().as_str())
        .bind(board.created_at())
        .bind(board.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &StoryboardId,
    ) -> Result<Option<Storyboard>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM storyboards WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM storyboards WHERE owner_id = $1",
        )
        .bind(owner_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM storyboards
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let boards = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((boards, total))
    }

    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM storyboards WHERE team_id = $1",
        )
        .bind(team_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM storyboards
            WHERE team_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(team_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let boards = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((boards, total))
    }

    async fn delete(&self, id: &StoryboardId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM storyboards WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

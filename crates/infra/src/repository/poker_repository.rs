//! # PokerRepository
//!
//! プランニングポーカーセッションの永続化を担当するリポジトリ。
//!
//! ポイントスケールは PostgreSQL の TEXT[] として保存する。

use async_trait::async_trait;
use kaizenboard_domain::{
    poker::{PointScale, PokerGame, PokerGameId, RoundingMode},
    team::TeamId,
    user::UserId,
    value_objects::SessionTitle,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::error::InfraError;

/// プランニングポーカーリポジトリトレイト
#[async_trait]
pub trait PokerRepository: Send + Sync {
    /// セッションを保存する
    async fn insert(&self, game: &PokerGame) -> Result<(), InfraError>;

    /// ID でセッションを検索する
    async fn find_by_id(&self, id: &PokerGameId) -> Result<Option<PokerGame>, InfraError>;

    /// ユーザーがオーナーのセッション一覧を取得する
    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), InfraError>;

    /// チームに紐づくセッション一覧を取得する
    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), InfraError>;

    /// セッションを削除する
    async fn delete(&self, id: &PokerGameId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の PokerRepository
#[derive(Debug, Clone)]
pub struct PostgresPokerRepository {
    pool: PgPool,
}

impl PostgresPokerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, owner_id, team_id, name, point_scale, \
                              auto_finish_voting, rounding, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<PokerGame, InfraError> {
    Ok(PokerGame::from_db(
        PokerGameId::from_uuid(row.try_get("id")?),
        UserId::from_uuid(row.try_get("owner_id")?),
        row.try_get::<Option<uuid::Uuid>, _>("team_id")?
            .map(TeamId::from_uuid),
        SessionTitle::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        PointScale::new(row.try_get::<Vec<String>, _>("point_scale")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("auto_finish_voting")?,
        row.try_get::<String, _>("rounding")?
            .parse::<RoundingMode>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl PokerRepository for PostgresPokerRepository {
    async fn insert(&self, game: &PokerGame) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO poker_games
                (id, owner_id, team_id, name, point_scale,
                 auto_finish_voting, rounding, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(game.id().as_uuid())
        .bind(game.owner_id().as_uuid())
        .bind(game.team_id().map(TeamId::as_uuid))
        .bind(game.name().as_str())
        .bind(game.point_scale().values())
        .bind(game.auto_finish_voting())
        .bind(game.rounding().to_string())
        .bind(game.created_at())
        .bind(game.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PokerGameId) -> Result<Option<PokerGame>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM poker_games WHERE id = $1"
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
    ) -> Result<(Vec<PokerGame>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM poker_games WHERE owner_id = $1",
        )
        .bind(owner_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM poker_games
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

        let games = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((games, total))
    }

    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM poker_games WHERE team_id = $1",
        )
        .bind(team_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM poker_games
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

        let games = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((games, total))
    }

    async fn delete(&self, id: &PokerGameId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM poker_games WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

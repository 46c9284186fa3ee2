//! # RetroRepository
//!
//! レトロスペクティブセッションの永続化を担当するリポジトリ。

use async_trait::async_trait;
use kaizenboard_domain::{
    retro::{BrainstormVisibility, Retro, RetroFormat, RetroId, RetroPhase},
    team::TeamId,
    user::UserId,
    value_objects::SessionTitle,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::error::InfraError;

/// レトロスペクティブリポジトリトレイト
#[async_trait]
pub trait RetroRepository: Send + Sync {
    /// セッションを保存する
    async fn insert(&self, retro: &Retro) -> Result<(), InfraError>;

    /// ID でセッションを検索する
    async fn find_by_id(&self, id: &RetroId) -> Result<Option<Retro>, InfraError>;

    /// ユーザーがオーナーのセッション一覧を取得する
    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), InfraError>;

    /// チームに紐づくセッション一覧を取得する
    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), InfraError>;

    /// フェーズを更新する
    async fn update(&self, retro: &Retro) -> Result<(), InfraError>;

    /// セッションを削除する
    async fn delete(&self, id: &RetroId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の RetroRepository
#[derive(Debug, Clone)]
pub struct PostgresRetroRepository {
    pool: PgPool,
}

impl PostgresRetroRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, owner_id, team_id, name, format, phase, \
                              visibility, max_votes, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<Retro, InfraError> {
    Ok(Retro::from_db(
        RetroId::from_uuid(row.try_get("id")?),
        UserId::from_uuid(row.try_get("owner_id")?),
        row.try_get::<Option<uuid::Uuid>, _>("team_id")?
            .map(TeamId::from_uuid),
        SessionTitle::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get::<String, _>("format")?
            .parse::<RetroFormat>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get::<String, _>("phase")?
            .parse::<RetroPhase>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get::<String, _>("visibility")?
            .parse::<BrainstormVisibility>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        u8::try_from(row.try_get::<i16, _>("max_votes")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl RetroRepository for PostgresRetroRepository {
    async fn insert(&self, retro: &Retro) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO retros
                (id, owner_id, team_id, name, format, phase,
                 visibility, max_votes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(retro.id().as_uuid())
        .bind(retro.owner_id().as_uuid())
        .bind(retro.team_id().map(TeamId::as_uuid))
        .bind(retro.name().as_str())
        .bind(retro.format().to_string())
        .bind(retro.phase().to_string())
        .bind(retro.visibility().to_string())
        .bind(i16::from(retro.max_votes()))
        .bind(retro.created_at())
        .bind(retro.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &RetroId) -> Result<Option<Retro>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM retros WHERE id = $1"
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
    ) -> Result<(Vec<Retro>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM retros WHERE owner_id = $1",
        )
        .bind(owner_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM retros
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

        let retros = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((retros, total))
    }

    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM retros WHERE team_id = $1",
        )
        .bind(team_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM retros
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

        let retros = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((retros, total))
    }

    async fn update(&self, retro: &Retro) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE retros
            SET name = $2, phase = $3, visibility = $4, max_votes = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(retro.id().as_uuid())
        .bind(retro.name().as_str())
        .bind(retro.phase().to_string())
        .bind(retro.visibility().to_string())
        .bind(i16::from(retro.max_votes()))
        .bind(retro.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &RetroId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM retros WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! # CheckinRepository
//!
//! 日次チェックインの永続化を担当するリポジトリ。
//!
//! 同一チーム・同一ユーザー・同一日の重複は DB の複合一意制約で防ぎ、
//! 違反は Conflict エラーに変換する。

use async_trait::async_trait;
use chrono::NaiveDate;
use kaizenboard_domain::{
    checkin::{Checkin, CheckinContent, CheckinId},
    team::TeamId,
    user::UserId,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::{error::InfraError, repository::map_unique_violation};

/// チェックインリポジトリトレイト
#[async_trait]
pub trait CheckinRepository: Send + Sync {
    /// チェックインを保存する
    ///
    /// 同一日のチェックインが既に存在する場合は Conflict エラーを返す。
    async fn insert(&self, checkin: &Checkin) -> Result<(), InfraError>;

    /// ID でチェックインを検索する
    async fn find_by_id(&self, id: &CheckinId) -> Result<Option<Checkin>, InfraError>;

    /// チームの指定日のチェックイン一覧を取得する
    async fn list_for_team_on(
        &self,
        team_id: &TeamId,
        date: NaiveDate,
    ) -> Result<Vec<Checkin>, InfraError>;

    /// チェックインを更新する
    async fn update(&self, checkin: &Checkin) -> Result<(), InfraError>;

    /// チェックインを削除する
    async fn delete(&self, id: &CheckinId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の CheckinRepository
#[derive(Debug, Clone)]
pub struct PostgresCheckinRepository {
    pool: PgPool,
}

impl PostgresCheckinRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, team_id, user_id, checkin_date, yesterday, today, \
                              blockers, discuss, goals_met, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<Checkin, InfraError> {
    let content = CheckinContent::new(
        row.try_get::<String, _>("yesterday")?,
        row.try_get::<String, _>("today")?,
        row.try_get::<String, _>("blockers")?,
        row.try_get::<String, _>("discuss")?,
        row.try_get("goals_met")?,
    )
    .map_err(|e| InfraError::unexpected(e.to_string()))?;

    Ok(Checkin::from_db(
        CheckinId::from_uuid(row.try_get("id")?),
        TeamId::from_uuid(row.try_get("team_id")?),
        UserId::from_uuid(row.try_get("user_id")?),
        row.try_get("checkin_date")?,
        content,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl CheckinRepository for PostgresCheckinRepository {
    async fn insert(&self, checkin: &Checkin) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO checkins
                (id, team_id, user_id, checkin_date, yesterday, today,
                 blockers, discuss, goals_met, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(checkin.id().as_uuid())
        .bind(checkin.team_id().as_uuid())
        .bind(checkin.user_id().as_uuid())
        .bind(checkin.checkin_date())
        .bind(checkin.content().yesterday())
        .bind(checkin.content().today())
        .bind(checkin.content().blockers())
        .bind(checkin.content().discuss())
        .bind(checkin.content().goals_met())
        .bind(checkin.created_at())
        .bind(checkin.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "Checkin", checkin.checkin_date().to_string())
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CheckinId) -> Result<Option<Checkin>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM checkins WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list_for_team_on(
        &self,
        team_id: &TeamId,
        date: NaiveDate,
    ) -> Result<Vec<Checkin>, InfraError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM checkins
            WHERE team_id = $1 AND checkin_date = $2
            ORDER BY created_at
            "#
        ))
        .bind(team_id.as_uuid())
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    async fn update(&self, checkin: &Checkin) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE checkins
            SET yesterday = $2, today = $3, blockers = $4, discuss = $5,
                goals_met = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(checkin.id().as_uuid())
        .bind(checkin.content().yesterday())
        .bind(checkin.content().today())
        .bind(checkin.content().blockers())
        .bind(checkin.content().discuss())
        .bind(checkin.content().goals_met())
        .bind(checkin.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &CheckinId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM checkins WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! # StatsRepository
//!
//! 管理画面向けの集計値を取得するリポジトリ。
//!
//! 各テーブルの件数をサブクエリで一括取得する。管理画面の表示用であり、
//! 正確性よりも 1 クエリで完結することを優先する。

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row as _};

use crate::error::InfraError;

/// アプリケーション全体の集計値
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStats {
    pub registered_user_count: i64,
    pub guest_user_count:      i64,
    pub organization_count:    i64,
    pub department_count:      i64,
    pub team_count:            i64,
    pub poker_count:           i64,
    pub retro_count:           i64,
    pub storyboard_count:      i64,
    pub checkin_count:         i64,
    pub subscription_count:    i64,
}

/// 集計リポジトリトレイト
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// アプリケーション全体の集計値を取得する
    async fn application_stats(&self) -> Result<ApplicationStats, InfraError>;
}

/// PostgreSQL 実装の StatsRepository
#[derive(Debug, Clone)]
pub struct PostgresStatsRepository {
    pool: PgPool,
}

impl PostgresStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    async fn application_stats(&self) -> Result<ApplicationStats, InfraError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role <> 'guest') AS registered_user_count,
                (SELECT COUNT(*) FROM users WHERE role = 'guest')  AS guest_user_count,
                (SELECT COUNT(*) FROM organizations)               AS organization_count,
                (SELECT COUNT(*) FROM departments)                 AS department_count,
                (SELECT COUNT(*) FROM teams)                       AS team_count,
                (SELECT COUNT(*) FROM poker_games)                 AS poker_count,
                (SELECT COUNT(*) FROM retros)                      AS retro_count,
                (SELECT COUNT(*) FROM storyboards)                 AS storyboard_count,
                (SELECT COUNT(*) FROM checkins)                    AS checkin_count,
                (SELECT COUNT(*) FROM subscriptions)               AS subscription_count
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ApplicationStats {
            registered_user_count: row.try_get("registered_user_count")?,
            guest_user_count:      row.try_get("guest_user_count")?,
            organization_count:    row.try_get("organization_count")?,
            department_count:      row.try_get("department_count")?,
            team_count:            row.try_get("team_count")?,
            poker_count:           row.try_get("poker_count")?,
            retro_count:           row.try_get("retro_count")?,
            storyboard_count:      row.try_get("storyboard_count")?,
            checkin_count:         row.try_get("checkin_count")?,
            subscription_count:    row.try_get("subscription_count")?,
        })
    }
}

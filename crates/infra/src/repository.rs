//! # リポジトリ実装
//!
//! ユースケース層が依存するリポジトリトレイトと、その PostgreSQL 実装を
//! 提供する。
//!
//! ## 設計方針
//!
//! - **依存性逆転**: ユースケース層はトレイトにのみ依存する
//! - **行のマッピング**: DB の行とドメインエンティティの変換は各実装に閉じる
//! - **一意制約違反の変換**: PostgreSQL の unique violation は
//!   [`InfraErrorKind::Conflict`](crate::InfraErrorKind::Conflict) に変換する
//! - **ランタイムバインド**: クエリは `sqlx::query` + `try_get` を使用し、
//!   ビルド時にデータベース接続を要求しない

pub mod checkin_repository;
pub mod credentials_repository;
pub mod organization_repository;
pub mod poker_repository;
pub mod retro_repository;
pub mod stats_repository;
pub mod storyboard_repository;
pub mod subscription_repository;
pub mod team_repository;
pub mod user_repository;

pub use checkin_repository::{CheckinRepository, PostgresCheckinRepository};
pub use credentials_repository::{CredentialsRepository, PostgresCredentialsRepository};
pub use organization_repository::{
    OrganizationMember,
    OrganizationRepository,
    PostgresOrganizationRepository,
};
pub use poker_repository::{PokerRepository, PostgresPokerRepository};
pub use retro_repository::{PostgresRetroRepository, RetroRepository};
pub use stats_repository::{ApplicationStats, PostgresStatsRepository, StatsRepository};
pub use storyboard_repository::{PostgresStoryboardRepository, StoryboardRepository};
pub use subscription_repository::{PostgresSubscriptionRepository, SubscriptionRepository};
pub use team_repository::{PostgresTeamRepository, TeamMember, TeamRepository};
pub use user_repository::{PostgresUserRepository, UserRepository};

use crate::InfraError;

/// 一意制約違反を Conflict エラーに変換する
///
/// それ以外の DB エラーはそのまま `InfraError` に変換する。
pub(crate) fn map_unique_violation(
    err: sqlx::Error,
    entity: &str,
    id: impl Into<String>,
) -> InfraError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            InfraError::conflict(entity, id)
        }
        _ => err.into(),
    }
}

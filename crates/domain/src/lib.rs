//! # KaizenBoard ドメイン層
//!
//! チームコラボレーション（プランニングポーカー、レトロスペクティブ、
//! ストーリーボード、チェックイン）のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: User, Team,
//!   PokerGame）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: Email,
//!   GroupName）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! api → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層（DB、Redis）には一切依存しない。
//!
//! ## 使用例
//!
//! ```rust
//! use kaizenboard_domain::{DomainError, team::TeamId};
//!
//! // チーム ID の生成
//! let team_id = TeamId::new();
//!
//! // ドメインエラーの生成
//! let error = DomainError::NotFound {
//!     entity_type: "Team",
//!     id:          team_id.to_string(),
//! };
//! ```

#[macro_use]
mod macros;

pub mod checkin;
pub mod clock;
pub mod error;
pub mod org;
pub mod password;
pub mod poker;
pub mod retro;
pub mod storyboard;
pub mod subscription;
pub mod team;
pub mod user;
pub mod value_objects;

pub use error::DomainError;

/// PII マスキングで使用する固定文字列
pub const REDACTED: &str = "[REDACTED]";

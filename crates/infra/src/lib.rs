//! # KaizenBoard インフラ層
//!
//! データベース（PostgreSQL）、セッションストア（Redis）、パスワード
//! ハッシュ（Argon2id）など、外部システムとの境界を実装する。
//!
//! ## 設計方針
//!
//! - **トレイトによる抽象化**: リポジトリ・セッション管理・イベント配信は
//!   トレイトとして定義し、ユースケース層はトレイトにのみ依存する
//! - **エラーの集約**: 外部システムのエラーは [`InfraError`] に変換し、
//!   発生時点の [`tracing_error::SpanTrace`] を自動キャプチャする
//! - **ドメインとの変換**: DB の行とドメインエンティティの相互変換は
//!   各リポジトリ実装に閉じる

pub mod db;
pub mod error;
pub mod event_bus;
pub mod password;
pub mod repository;
pub mod session;

pub use error::{InfraError, InfraErrorKind};

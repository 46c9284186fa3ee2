//! # ユースケース層
//!
//! ハンドラから呼び出されるアプリケーションロジックを実装する。
//!
//! ## 設計方針
//!
//! - 各ユースケースはリポジトリトレイトの `Arc<dyn _>` を保持し、
//!   テストではスタブ実装に差し替える
//! - 認可判定（本人・グループ管理者・アプリ管理者）はユースケース層で行い、
//!   ハンドラは認証とリクエスト/レスポンスの変換に専念する
//! - 現在時刻は [`Clock`](kaizenboard_domain::clock::Clock) 経由で取得する

pub mod admin;
pub mod auth;
pub mod checkin;
pub mod organization;
pub mod poker;
pub mod retro;
pub mod storyboard;
pub mod subscription;
pub mod team;
pub mod user;

pub use admin::AdminUseCase;
pub use auth::AuthUseCase;
pub use checkin::CheckinUseCase;
pub use organization::OrganizationUseCase;
pub use poker::PokerUseCase;
pub use retro::RetroUseCase;
pub use storyboard::StoryboardUseCase;
pub use subscription::SubscriptionUseCase;
pub use team::TeamUseCase;
pub use user::UserUseCase;

//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置し、対応するユースケースを保持する
//!   State 構造体とリクエスト/レスポンス DTO を同じファイルに置く
//! - ハンドラは「セッション認証 → DTO 変換 → ユースケース呼び出し →
//!   レスポンス変換」のみを行い、認可とビジネスロジックはユースケース層に
//!   委譲する
//! - 成功レスポンスは [`ApiResponse`](kaizenboard_shared::ApiResponse) で、
//!   一覧は [`PaginatedResponse`](kaizenboard_shared::PaginatedResponse) で
//!   包む

use serde::Deserialize;

pub mod admin;
pub mod auth;
pub mod checkin;
pub mod health;
pub mod organization;
pub mod poker;
pub mod retro;
pub mod storyboard;
pub mod subscription;
pub mod team;
pub mod user;

/// ページネーションクエリパラメータ
///
/// `limit` は 1〜100 に丸め（デフォルト 20）、`offset` は 0 以上に丸める。
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit:  Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    const DEFAULT_LIMIT: i64 = 20;
    const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

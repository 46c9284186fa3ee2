//! # ページネーション付きレスポンス
//!
//! limit/offset ページネーションに対応した API レスポンス型。

use serde::{Deserialize, Serialize};

/// ページネーション付きレスポンス
///
/// `ApiResponse<T>` が単一データ用であるのに対し、
/// `PaginatedResponse<T>` はリスト + 総件数のページネーション形式。
/// 管理画面のユーザー一覧などで使用する。
///
/// ## JSON 形式
///
/// ```json
/// {
///   "data": [...],
///   "total": 120,
///   "limit": 25,
///   "offset": 50
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data:   Vec<T>,
    pub total:  i64,
    pub limit:  i64,
    pub offset: i64,
}

impl<T> PaginatedResponse<T> {
    /// 新しい `PaginatedResponse` を作成する
    pub fn new(data: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            data,
            total,
            limit,
            offset,
        }
    }
}

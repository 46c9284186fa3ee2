//! # API エラーハンドリング
//!
//! HTTP API のエラー定義と、axum レスポンスへの変換。
//! 各ハンドラが共通で使うエラー型と認証ヘルパーを集約する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::DomainError;
use kaizenboard_infra::{
    InfraError,
    InfraErrorKind,
    session::{SessionData, SessionManager},
};
use kaizenboard_shared::ErrorResponse;
use thiserror::Error;

/// セッション Cookie 名
pub const SESSION_COOKIE_NAME: &str = "kaizenboard_session";

/// API で発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// 認証されていない
    #[error("認証が必要です")]
    Unauthorized,

    /// ログイン失敗
    ///
    /// メールアドレスの存在有無を漏らさないよう、専用のメッセージを返す。
    #[error("認証に失敗しました")]
    AuthenticationFailed,

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 競合
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// インフラエラー
    #[error("インフラエラー: {0}")]
    Infra(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::unauthorized("認証が必要です"),
            ),
            ApiError::AuthenticationFailed => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new(
                    "authentication-failed",
                    "Authentication Failed",
                    401,
                    "メールアドレスまたはパスワードが正しくありません",
                ),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::forbidden(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::not_found(msg)),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::validation_error(msg),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::conflict(msg)),
            ApiError::Infra(e) => match e.kind() {
                InfraErrorKind::Conflict { .. } => (
                    StatusCode::CONFLICT,
                    ErrorResponse::conflict("リソースが競合しています"),
                ),
                InfraErrorKind::InvalidInput(msg) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::validation_error(msg),
                ),
                _ => {
                    tracing::error!(
                        error.category = "infrastructure",
                        span_trace = %e.span_trace(),
                        "インフラエラー: {}",
                        e
                    );
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::internal_error(),
                    )
                }
            },
            ApiError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal_error(),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

// --- 認証ヘルパー ---

/// セッション認証を行う
///
/// Cookie からセッション ID を取り出し、セッションストアを参照する。
/// ハンドラでのボイラープレートを 1 行に削減する。
pub async fn authenticate(
    session_manager: &dyn SessionManager,
    jar: &CookieJar,
) -> Result<SessionData, ApiError> {
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    match session_manager.get(&session_id).await {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::error!(
                error.category = "infrastructure",
                error.kind = "session",
                "セッション取得で内部エラー: {}",
                e
            );
            Err(ApiError::Infra(e))
        }
    }
}

/// アプリケーション管理者であることを要求する
pub fn require_admin(session: &SessionData) -> Result<(), ApiError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "管理者権限が必要です".to_string(),
        ))
    }
}

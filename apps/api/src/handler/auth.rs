//! # 認証ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/auth/register` - ユーザー登録（セッション開始）
//! - `POST /api/v1/auth/guest` - ゲストユーザー作成（セッション開始）
//! - `POST /api/v1/auth/login` - ログイン
//! - `POST /api/v1/auth/logout` - ログアウト
//! - `GET /api/v1/auth/session` - 現在のセッションユーザー取得
//!
//! セッション ID は HttpOnly Cookie で返す。

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::ApiResponse;
use serde::Deserialize;

use crate::{
    error::{ApiError, SESSION_COOKIE_NAME, authenticate},
    handler::user::UserDto,
    usecase::AuthUseCase,
};

/// 認証 API の共有状態
pub struct AuthState {
    pub usecase:         AuthUseCase,
    pub session_manager: Arc<dyn SessionManager>,
    /// Cookie に Secure 属性を付与するか（HTTPS 環境で true）
    pub cookie_secure:   bool,
}

// --- リクエスト型 ---

/// ユーザー登録リクエスト
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name:     String,
    pub email:    String,
    pub password: String,
}

/// ゲスト作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateGuestRequest {
    pub name: String,
}

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email:    String,
    pub password: String,
}

// --- Cookie ヘルパー ---

/// Redis 側のセッション TTL（24時間）と揃える
const SESSION_MAX_AGE: i64 = 86400;

fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_MAX_AGE))
        .secure(secure)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME)
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build()
}

// --- ハンドラ ---

/// POST /api/v1/auth/register
///
/// ユーザーを登録し、セッションを開始する。
///
/// ## レスポンス
///
/// - `201 Created`: 作成されたユーザー（Set-Cookie 付き）
/// - `400 Bad Request`: バリデーションエラー
/// - `409 Conflict`: メールアドレス重複
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session_id) = state
        .usecase
        .register(&req.name, &req.email, &req.password)
        .await?;

    let jar = jar.add(session_cookie(session_id, state.cookie_secure));
    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// POST /api/v1/auth/guest
///
/// ゲストユーザーを作成し、セッションを開始する。
/// ゲストは名前のみで参加でき、セッションの失効とともにアクセス手段を失う。
#[tracing::instrument(skip_all)]
pub async fn create_guest(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<CreateGuestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session_id) = state.usecase.create_guest(&req.name).await?;

    let jar = jar.add(session_cookie(session_id, state.cookie_secure));
    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// POST /api/v1/auth/login
///
/// メールアドレスとパスワードで認証し、セッションを開始する。
///
/// ## レスポンス
///
/// - `200 OK`: ログイン成功（Set-Cookie 付き）
/// - `401 Unauthorized`: 認証失敗（理由は区別しない）
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session_id) = state.usecase.login(&req.email, &req.password).await?;

    let jar = jar.add(session_cookie(session_id, state.cookie_secure));
    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::OK, jar, Json(response)))
}

/// POST /api/v1/auth/logout
///
/// セッションを削除し、Cookie を破棄する。
/// セッションが既に無効でも成功として扱う。
#[tracing::instrument(skip_all)]
pub async fn logout(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        state.usecase.logout(cookie.value()).await?;
    }

    let jar = jar.remove(removal_cookie());
    Ok((StatusCode::NO_CONTENT, jar))
}

/// GET /api/v1/auth/session
///
/// 現在のセッションに対応するユーザーを取得する。
#[tracing::instrument(skip_all)]
pub async fn get_session(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let user = state.usecase.current_user(&session).await?;

    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::OK, Json(response)))
}

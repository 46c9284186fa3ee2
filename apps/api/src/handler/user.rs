//! # ユーザーハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/users/{id}` - ユーザー取得
//! - `PUT /api/v1/users/{id}` - プロフィール更新
//! - `DELETE /api/v1/users/{id}` - ユーザー削除（退会）
//!
//! いずれも本人またはアプリ管理者のみ操作できる。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::user::{User, UserId};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    usecase::UserUseCase,
};

/// ユーザー API の共有状態
pub struct UserState {
    pub usecase:         UserUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// ユーザーレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserDto {
    pub id:             Uuid,
    pub name:           String,
    pub email:          Option<String>,
    pub role:           String,
    pub status:         String,
    pub last_active_at: Option<String>,
    pub created_at:     String,
    pub updated_at:     String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id:             *user.id().as_uuid(),
            name:           user.name().as_str().to_string(),
            email:          user.email().map(|e| e.as_str().to_string()),
            role:           user.role().to_string(),
            status:         user.status().to_string(),
            last_active_at: user.last_active_at().map(|at| at.to_rfc3339()),
            created_at:     user.created_at().to_rfc3339(),
            updated_at:     user.updated_at().to_rfc3339(),
        }
    }
}

/// プロフィール更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name:  String,
    pub email: Option<String>,
}

/// GET /api/v1/users/{id}
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<Arc<UserState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let user = state.usecase.get(&session, &UserId::from_uuid(id)).await?;

    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/users/{id}
///
/// ## レスポンス
///
/// - `200 OK`: 更新後のユーザー
/// - `400 Bad Request`: バリデーションエラー、ゲストへのメールアドレス設定
/// - `409 Conflict`: メールアドレス重複
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<Arc<UserState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let user = state
        .usecase
        .update_profile(
            &session,
            &UserId::from_uuid(id),
            &req.name,
            req.email.as_deref(),
        )
        .await?;

    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/users/{id}
///
/// ユーザーを削除し、発行済みのセッションをすべて失効させる。
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<Arc<UserState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state.usecase.delete(&session, &UserId::from_uuid(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, header},
        routing::get,
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        error::SESSION_COOKIE_NAME,
        test_utils::{
            StubSessionManager,
            StubUserStore,
            fixed_clock,
            guest_user,
            registered_user,
            response_body,
            session_for,
        },
    };

    const SESSION_ID: &str = "test-session-id";

    fn create_test_app(store: StubUserStore, actor: &User) -> Router {
        let sessions = Arc::new(StubSessionManager::with_session(
            SESSION_ID,
            session_for(actor),
        ));
        let usecase = UserUseCase::new(Arc::new(store), sessions.clone(), fixed_clock());
        let state = Arc::new(UserState {
            usecase,
            session_manager: sessions,
        });

        Router::new()
            .route(
                "/api/v1/users/{id}",
                get(get_user).put(update_user).delete(delete_user),
            )
            .with_state(state)
    }

    fn authed_request(method: axum::http::Method, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={SESSION_ID}"))
            .header("content-type", "application/json")
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_自分のユーザー情報を取得できる() {
        // Given
        let user = registered_user("yamada@example.com");
        let uri = format!("/api/v1/users/{}", user.id());
        let sut = create_test_app(StubUserStore::with_users(vec![user.clone()]), &user);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<UserDto> = response_body(response).await;
        assert_eq!(body.data, UserDto::from(&user));
    }

    #[tokio::test]
    async fn test_get_他人のユーザー情報は403が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let other = registered_user("suzuki@example.com");
        let uri = format!("/api/v1/users/{}", other.id());
        let sut = create_test_app(
            StubUserStore::with_users(vec![actor.clone(), other]),
            &actor,
        );

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_put_プロフィールを更新できる() {
        // Given
        let user = registered_user("yamada@example.com");
        let uri = format!("/api/v1/users/{}", user.id());
        let sut = create_test_app(StubUserStore::with_users(vec![user.clone()]), &user);

        let request = authed_request(
            axum::http::Method::PUT,
            &uri,
            Body::from(
                serde_json::json!({
                    "name": "山田次郎",
                    "email": "jiro@example.com"
                })
                .to_string(),
            ),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<UserDto> = response_body(response).await;
        assert_eq!(body.data.name, "山田次郎");
        assert_eq!(body.data.email.as_deref(), Some("jiro@example.com"));
    }

    #[tokio::test]
    async fn test_put_ゲストへのメールアドレス設定は400が返る() {
        // Given
        let guest = guest_user("通りすがりの参加者");
        let uri = format!("/api/v1/users/{}", guest.id());
        let sut = create_test_app(StubUserStore::with_users(vec![guest.clone()]), &guest);

        let request = authed_request(
            axum::http::Method::PUT,
            &uri,
            Body::from(
                serde_json::json!({
                    "name": "通りすがりの参加者",
                    "email": "guest@example.com"
                })
                .to_string(),
            ),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_退会すると204が返りセッションが失効する() {
        // Given
        let user = registered_user("yamada@example.com");
        let uri = format!("/api/v1/users/{}", user.id());
        let sut = create_test_app(StubUserStore::with_users(vec![user.clone()]), &user);

        let request = authed_request(axum::http::Method::DELETE, &uri, Body::empty());

        // When
        let response = sut.clone().oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // セッションが失効しているため、以降のリクエストは 401
        let followup = authed_request(axum::http::Method::GET, &uri, Body::empty());
        let response = sut.oneshot(followup).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_存在しないユーザーは404が返る() {
        // Given: 管理者はどのユーザーにもアクセスできるが、対象が存在しない
        let admin = crate::test_utils::admin_user("admin@example.com");
        let uri = format!("/api/v1/users/{}", Uuid::now_v7());
        let sut = create_test_app(StubUserStore::with_users(vec![admin.clone()]), &admin);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

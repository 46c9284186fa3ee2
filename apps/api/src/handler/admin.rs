//! # 管理者ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/admin/stats` - アプリケーション全体の集計値
//! - `GET /api/v1/admin/users` - 全ユーザー一覧
//! - `POST /api/v1/admin/users/{id}/promote` - 管理者に昇格
//! - `POST /api/v1/admin/users/{id}/demote` - 一般ユーザーに降格
//! - `GET /api/v1/admin/subscriptions` - 全サブスクリプション一覧
//! - `POST /api/v1/admin/subscriptions` - サブスクリプション作成
//! - `GET /api/v1/admin/subscriptions/{id}` - サブスクリプション取得
//! - `PUT /api/v1/admin/subscriptions/{id}` - 延長または解約
//! - `DELETE /api/v1/admin/subscriptions/{id}` - 削除
//!
//! すべてアプリ管理者のみ実行できる。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use kaizenboard_domain::{
    subscription::{SubscriptionId, SubscriptionPlan},
    user::UserId,
};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::{ApiResponse, PaginatedResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    handler::{PageQuery, subscription::SubscriptionDto, user::UserDto},
    usecase::{AdminUseCase, SubscriptionUseCase},
};

/// 管理者 API の共有状態
pub struct AdminState {
    pub usecase:         AdminUseCase,
    pub subscriptions:   SubscriptionUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// サブスクリプション作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id:                  Uuid,
    pub customer_id:              String,
    pub provider_subscription_id: String,
    pub plan:                     SubscriptionPlan,
    pub expires_at:               DateTime<Utc>,
}

/// サブスクリプション更新リクエスト
///
/// `active: false` で解約、`expires_at` 指定で期限延長。
#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub active:     Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// GET /api/v1/admin/stats
#[tracing::instrument(skip_all)]
pub async fn get_stats(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let stats = state.usecase.application_stats(&session).await?;

    let response = ApiResponse::new(stats);
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/admin/users
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (users, total) = state
        .usecase
        .list_users(&session, page.limit(), page.offset())
        .await?;

    let data = users.iter().map(UserDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/admin/users/{id}/promote
///
/// ゲストユーザーの昇格は `400 Bad Request` を返す。
#[tracing::instrument(skip_all)]
pub async fn promote_user(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let user = state
        .usecase
        .promote_user(&session, &UserId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/admin/users/{id}/demote
#[tracing::instrument(skip_all)]
pub async fn demote_user(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let user = state
        .usecase
        .demote_user(&session, &UserId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(UserDto::from(&user));
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/admin/subscriptions
#[tracing::instrument(skip_all)]
pub async fn list_subscriptions(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (subscriptions, total) = state
        .subscriptions
        .list(&session, page.limit(), page.offset())
        .await?;

    let data = subscriptions.iter().map(SubscriptionDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/admin/subscriptions
#[tracing::instrument(skip_all)]
pub async fn create_subscription(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let subscription = state
        .subscriptions
        .create(
            &session,
            &UserId::from_uuid(req.user_id),
            &req.customer_id,
            &req.provider_subscription_id,
            req.plan,
            req.expires_at,
        )
        .await?;

    let response = ApiResponse::new(SubscriptionDto::from(&subscription));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/admin/subscriptions/{id}
#[tracing::instrument(skip_all)]
pub async fn get_subscription(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let subscription = state
        .subscriptions
        .get(&session, &SubscriptionId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(SubscriptionDto::from(&subscription));
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/admin/subscriptions/{id}
///
/// `active: false` が指定されていれば解約し、それ以外で `expires_at` が
/// 指定されていれば期限を延長する。
#[tracing::instrument(skip_all)]
pub async fn update_subscription(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let id = SubscriptionId::from_uuid(id);

    let subscription = match (req.active, req.expires_at) {
        (Some(false), _) => state.subscriptions.deactivate(&session, &id).await?,
        (_, Some(expires_at)) => {
            state.subscriptions.extend(&session, &id, expires_at).await?
        }
        _ => {
            return Err(ApiError::BadRequest(
                "active または expires_at のいずれかを指定してください".to_string(),
            ));
        }
    };

    let response = ApiResponse::new(SubscriptionDto::from(&subscription));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/admin/subscriptions/{id}
#[tracing::instrument(skip_all)]
pub async fn delete_subscription(
    State(state): State<Arc<AdminState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .subscriptions
        .delete(&session, &SubscriptionId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

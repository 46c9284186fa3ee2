//! # サブスクリプションハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/subscriptions/me` - 自分の現在有効なサブスクリプション
//!
//! 管理者向けの契約管理 API は [`admin`](crate::handler::admin) を参照。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::subscription::Subscription;
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    usecase::SubscriptionUseCase,
};

/// サブスクリプション API の共有状態
pub struct SubscriptionState {
    pub usecase:         SubscriptionUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// サブスクリプションレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionDto {
    pub id:                       Uuid,
    pub user_id:                  Uuid,
    pub customer_id:              String,
    pub provider_subscription_id: String,
    pub plan:                     String,
    pub active:                   bool,
    pub expires_at:               String,
    pub created_at:               String,
    pub updated_at:               String,
}

impl From<&Subscription> for SubscriptionDto {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id:                       *subscription.id().as_uuid(),
            user_id:                  *subscription.user_id().as_uuid(),
            customer_id:              subscription.customer_id().to_string(),
            provider_subscription_id: subscription
                .provider_subscription_id()
                .to_string(),
            plan:                     subscription.plan().to_string(),
            active:                   subscription.active(),
            expires_at:               subscription.expires_at().to_rfc3339(),
            created_at:               subscription.created_at().to_rfc3339(),
            updated_at:               subscription.updated_at().to_rfc3339(),
        }
    }
}

/// GET /api/v1/subscriptions/me
///
/// 有効な契約がない場合は `data: null` を返す。
#[tracing::instrument(skip_all)]
pub async fn get_my_subscription(
    State(state): State<Arc<SubscriptionState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let subscription = state.usecase.current_for(&session).await?;

    let response = ApiResponse::new(subscription.as_ref().map(SubscriptionDto::from));
    Ok((StatusCode::OK, Json(response)))
}

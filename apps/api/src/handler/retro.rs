//! # レトロスペクティブハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/retros` - セッション作成
//! - `GET /api/v1/retros` - 自分がオーナーのセッション一覧
//! - `GET /api/v1/retros/{id}` - セッション取得
//! - `DELETE /api/v1/retros/{id}` - セッション削除
//! - `POST /api/v1/retros/{id}/advance` - フェーズ進行（オーナーのみ）
//! - `POST /api/v1/retros/{id}/events` - ライブイベント配信

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::{
    retro::{BrainstormVisibility, Retro, RetroFormat, RetroId},
    team::TeamId,
};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    handler::{PageQuery, poker::PublishEventRequest},
    usecase::{RetroUseCase, retro::CreateRetroInput},
};

/// レトロ API の共有状態
pub struct RetroState {
    pub usecase:         RetroUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// レトロセッションレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RetroDto {
    pub id:         Uuid,
    pub owner_id:   Uuid,
    pub team_id:    Option<Uuid>,
    pub name:       String,
    pub format:     String,
    pub phase:      String,
    pub visibility: String,
    pub max_votes:  u8,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Retro> for RetroDto {
    fn from(retro: &Retro) -> Self {
        Self {
            id:         *retro.id().as_uuid(),
            owner_id:   *retro.owner_id().as_uuid(),
            team_id:    retro.team_id().map(|id| *id.as_uuid()),
            name:       retro.name().as_str().to_string(),
            format:     retro.format().to_string(),
            phase:      retro.phase().to_string(),
            visibility: retro.visibility().to_string(),
            max_votes:  retro.max_votes(),
            created_at: retro.created_at().to_rfc3339(),
            updated_at: retro.updated_at().to_rfc3339(),
        }
    }
}

/// セッション作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateRetroRequest {
    pub name:       String,
    pub team_id:    Option<Uuid>,
    #[serde(default = "default_format")]
    pub format:     RetroFormat,
    #[serde(default = "default_visibility")]
    pub visibility: BrainstormVisibility,
    #[serde(default = "default_max_votes")]
    pub max_votes:  u8,
}

fn default_format() -> RetroFormat {
    RetroFormat::WorkedImproveQuestion
}

fn default_visibility() -> BrainstormVisibility {
    BrainstormVisibility::Concealed
}

fn default_max_votes() -> u8 {
    3
}

/// POST /api/v1/retros
#[tracing::instrument(skip_all)]
pub async fn create_retro(
    State(state): State<Arc<RetroState>>,
    jar: CookieJar,
    Json(req): Json<CreateRetroRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let input = CreateRetroInput {
        name:       req.name,
        team_id:    req.team_id.map(TeamId::from_uuid),
        format:     req.format,
        visibility: req.visibility,
        max_votes:  req.max_votes,
    };
    let retro = state.usecase.create(&session, input).await?;

    let response = ApiResponse::new(RetroDto::from(&retro));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/retros
#[tracing::instrument(skip_all)]
pub async fn list_retros(
    State(state): State<Arc<RetroState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (retros, total) = state
        .usecase
        .list_mine(&session, page.limit(), page.offset())
        .await?;

    let data = retros.iter().map(RetroDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/retros/{id}
#[tracing::instrument(skip_all)]
pub async fn get_retro(
    State(state): State<Arc<RetroState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let retro = state.usecase.get(&session, &RetroId::from_uuid(id)).await?;

    let response = ApiResponse::new(RetroDto::from(&retro));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/retros/{id}
#[tracing::instrument(skip_all)]
pub async fn delete_retro(
    State(state): State<Arc<RetroState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .delete(&session, &RetroId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/retros/{id}/advance
///
/// フェーズを 1 段階進め、進行後の状態を返す。
///
/// ## レスポンス
///
/// - `200 OK`: 進行後のセッション
/// - `400 Bad Request`: 完了済みセッションの進行
/// - `403 Forbidden`: オーナー以外の操作
#[tracing::instrument(skip_all)]
pub async fn advance_retro(
    State(state): State<Arc<RetroState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let retro = state
        .usecase
        .advance(&session, &RetroId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(RetroDto::from(&retro));
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/retros/{id}/events
#[tracing::instrument(skip_all)]
pub async fn publish_retro_event(
    State(state): State<Arc<RetroState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .publish_event(&session, &RetroId::from_uuid(id), &req.event_type, req.value)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

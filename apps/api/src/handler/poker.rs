//! # プランニングポーカーハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/poker` - セッション作成
//! - `GET /api/v1/poker` - 自分がオーナーのセッション一覧
//! - `GET /api/v1/poker/{id}` - セッション取得
//! - `DELETE /api/v1/poker/{id}` - セッション削除
//! - `POST /api/v1/poker/{id}/events` - ライブイベント配信
//!
//! セッションは URL 共有で参加できるため、取得とイベント配信は
//! ログイン済みユーザー全員に開放する。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::{
    poker::{PokerGame, PokerGameId, RoundingMode},
    team::TeamId,
};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    handler::PageQuery,
    usecase::{PokerUseCase, poker::CreatePokerInput},
};

/// ポーカー API の共有状態
pub struct PokerState {
    pub usecase:         PokerUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// ポーカーセッションレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PokerDto {
    pub id:                 Uuid,
    pub owner_id:           Uuid,
    pub team_id:            Option<Uuid>,
    pub name:               String,
    pub point_scale:        Vec<String>,
    pub auto_finish_voting: bool,
    pub rounding:           String,
    pub created_at:         String,
    pub updated_at:         String,
}

impl From<&PokerGame> for PokerDto {
    fn from(game: &PokerGame) -> Self {
        Self {
            id:                 *game.id().as_uuid(),
            owner_id:           *game.owner_id().as_uuid(),
            team_id:            game.team_id().map(|id| *id.as_uuid()),
            name:               game.name().as_str().to_string(),
            point_scale:        game.point_scale().values().to_vec(),
            auto_finish_voting: game.auto_finish_voting(),
            rounding:           game.rounding().to_string(),
            created_at:         game.created_at().to_rfc3339(),
            updated_at:         game.updated_at().to_rfc3339(),
        }
    }
}

/// セッション作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreatePokerRequest {
    pub name:               String,
    pub team_id:            Option<Uuid>,
    pub point_scale:        Option<Vec<String>>,
    #[serde(default)]
    pub auto_finish_voting: bool,
    #[serde(default = "default_rounding")]
    pub rounding:           RoundingMode,
}

fn default_rounding() -> RoundingMode {
    RoundingMode::Round
}

/// ライブイベント配信リクエスト
#[derive(Debug, Deserialize)]
pub struct PublishEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub value:      serde_json::Value,
}

/// POST /api/v1/poker
#[tracing::instrument(skip_all)]
pub async fn create_poker(
    State(state): State<Arc<PokerState>>,
    jar: CookieJar,
    Json(req): Json<CreatePokerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let input = CreatePokerInput {
        name:               req.name,
        team_id:            req.team_id.map(TeamId::from_uuid),
        point_scale:        req.point_scale,
        auto_finish_voting: req.auto_finish_voting,
        rounding:           req.rounding,
    };
    let game = state.usecase.create(&session, input).await?;

    let response = ApiResponse::new(PokerDto::from(&game));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/poker
///
/// 自分がオーナーのセッション一覧を返す。
#[tracing::instrument(skip_all)]
pub async fn list_poker(
    State(state): State<Arc<PokerState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (games, total) = state
        .usecase
        .list_mine(&session, page.limit(), page.offset())
        .await?;

    let data = games.iter().map(PokerDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/poker/{id}
#[tracing::instrument(skip_all)]
pub async fn get_poker(
    State(state): State<Arc<PokerState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let game = state
        .usecase
        .get(&session, &PokerGameId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(PokerDto::from(&game));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/poker/{id}
///
/// オーナーまたはアプリ管理者のみ削除できる。
#[tracing::instrument(skip_all)]
pub async fn delete_poker(
    State(state): State<Arc<PokerState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .delete(&session, &PokerGameId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/poker/{id}/events
///
/// ライブセッションのチャンネルへイベントを配信する。
#[tracing::instrument(skip_all)]
pub async fn publish_poker_event(
    State(state): State<Arc<PokerState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .publish_event(
            &session,
            &PokerGameId::from_uuid(id),
            &req.event_type,
            req.value,
        )
        .await?;

    Ok(StatusCode::ACCEPTED)
}

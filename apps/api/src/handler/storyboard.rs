//! # ストーリーボードハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/storyboards` - ボード作成
//! - `GET /api/v1/storyboards` - 自分がオーナーのボード一覧
//! - `GET /api/v1/storyboards/{id}` - ボード取得
//! - `DELETE /api/v1/storyboards/{id}` - ボード削除
//! - `POST /api/v1/storyboards/{id}/events` - ライブイベント配信

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::{
    storyboard::{Storyboard, StoryboardId},
    team::TeamId,
};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    handler::{PageQuery, poker::PublishEventRequest},
    usecase::StoryboardUseCase,
};

/// ストーリーボード API の共有状態
pub struct StoryboardState {
    pub usecase:         StoryboardUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// ストーリーボードレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StoryboardDto {
    pub id:         Uuid,
    pub owner_id:   Uuid,
    pub team_id:    Option<Uuid>,
    pub name:       String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Storyboard> for StoryboardDto {
    fn from(board: &Storyboard) -> Self {
        Self {
            id:         *board.id().as_uuid(),
            owner_id:   *board.owner_id().as_uuid(),
            team_id:    board.team_id().map(|id| *id.as_uuid()),
            name:       board.name().as_str().to_string(),
            created_at: board.created_at().to_rfc3339(),
            updated_at: board.updated_at().to_rfc3339(),
        }
    }
}

/// ボード作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateStoryboardRequest {
    pub name:    String,
    pub team_id: Option<Uuid>,
}

/// POST /api/v1/storyboards
#[tracing::instrument(skip_all)]
pub async fn create_storyboard(
    State(state): State<Arc<StoryboardState>>,
    jar: CookieJar,
    Json(req): Json<CreateStoryboardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let board = state
        .usecase
        .create(&session, &req.name, req.team_id.map(TeamId::from_uuid))
        .await?;

    let response = ApiResponse::new(StoryboardDto::from(&board));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/storyboards
#[tracing::instrument(skip_all)]
pub async fn list_storyboards(
    State(state): State<Arc<StoryboardState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (boards, total) = state
        .usecase
        .list_mine(&session, page.limit(), page.offset())
        .await?;

    let data = boards.iter().map(StoryboardDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/storyboards/{id}
#[tracing::instrument(skip_all)]
pub async fn get_storyboard(
    State(state): State<Arc<StoryboardState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let board = state
        .usecase
        .get(&session, &StoryboardId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(StoryboardDto::from(&board));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/storyboards/{id}
#[tracing::instrument(skip_all)]
pub async fn delete_storyboard(
    State(state): State<Arc<StoryboardState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .delete(&session, &StoryboardId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/storyboards/{id}/events
#[tracing::instrument(skip_all)]
pub async fn publish_storyboard_event(
    State(state): State<Arc<StoryboardState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .publish_event(
            &session,
            &StoryboardId::from_uuid(id),
            &req.event_type,
            req.value,
        )
        .await?;

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, header},
        routing::{get, post},
    };
    use kaizenboard_domain::{user::User, value_objects::SessionTitle};
    use kaizenboard_infra::event_bus::SessionChannel;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        error::SESSION_COOKIE_NAME,
        test_utils::{
            RecordingEventBus,
            StubSessionManager,
            StubStoryboardStore,
            StubTeamStore,
            admin_user,
            fixed_clock,
            fixed_now,
            registered_user,
            response_body,
            session_for,
        },
    };

    const SESSION_ID: &str = "test-session-id";

    fn create_test_app(
        boards: StubStoryboardStore,
        events: Arc<RecordingEventBus>,
        actor: &User,
    ) -> Router {
        let sessions = Arc::new(StubSessionManager::with_session(
            SESSION_ID,
            session_for(actor),
        ));
        let usecase = StoryboardUseCase::new(
            Arc::new(boards),
            Arc::new(StubTeamStore::empty()),
            events,
            fixed_clock(),
        );
        let state = Arc::new(StoryboardState {
            usecase,
            session_manager: sessions,
        });

        Router::new()
            .route(
                "/api/v1/storyboards",
                post(create_storyboard).get(list_storyboards),
            )
            .route(
                "/api/v1/storyboards/{id}",
                get(get_storyboard).delete(delete_storyboard),
            )
            .route(
                "/api/v1/storyboards/{id}/events",
                post(publish_storyboard_event),
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

    fn sample_board(owner: &User) -> Storyboard {
        Storyboard::new(
            owner.id().clone(),
            None,
            SessionTitle::new("新機能マッピング").unwrap(),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn test_post_ボードを作成すると201が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let sut = create_test_app(
            StubStoryboardStore::empty(),
            Arc::new(RecordingEventBus::new()),
            &actor,
        );

        let request = authed_request(
            axum::http::Method::POST,
            "/api/v1/storyboards",
            Body::from(serde_json::json!({ "name": "新機能マッピング" }).to_string()),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<StoryboardDto> = response_body(response).await;
        assert_eq!(body.data.name, "新機能マッピング");
        assert_eq!(body.data.owner_id, *actor.id().as_uuid());
    }

    #[tokio::test]
    async fn test_get_自分がオーナーのボードのみが一覧に含まれる() {
        // Given
        let actor = registered_user("yamada@example.com");
        let other = registered_user("suzuki@example.com");
        let mine = sample_board(&actor);
        let theirs = sample_board(&other);
        let sut = create_test_app(
            StubStoryboardStore::with_boards(vec![mine.clone(), theirs]),
            Arc::new(RecordingEventBus::new()),
            &actor,
        );

        let request =
            authed_request(axum::http::Method::GET, "/api/v1/storyboards", Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: PaginatedResponse<StoryboardDto> = response_body(response).await;
        assert_eq!(body.total, 1);
        assert_eq!(body.data[0].id, *mine.id().as_uuid());
    }

    #[tokio::test]
    async fn test_delete_アプリ管理者はオーナーでなくても削除できる() {
        // Given
        let owner = registered_user("owner@example.com");
        let actor = admin_user("admin@example.com");
        let board = sample_board(&owner);
        let uri = format!("/api/v1/storyboards/{}", board.id());
        let sut = create_test_app(
            StubStoryboardStore::with_boards(vec![board]),
            Arc::new(RecordingEventBus::new()),
            &actor,
        );

        let request = authed_request(axum::http::Method::DELETE, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_post_イベントはストーリーボードチャンネルに配信される() {
        // Given
        let actor = registered_user("yamada@example.com");
        let board = sample_board(&actor);
        let uri = format!("/api/v1/storyboards/{}/events", board.id());
        let events = Arc::new(RecordingEventBus::new());
        let sut = create_test_app(
            StubStoryboardStore::with_boards(vec![board.clone()]),
            events.clone(),
            &actor,
        );

        let request = authed_request(
            axum::http::Method::POST,
            &uri,
            Body::from(
                serde_json::json!({
                    "event_type": "card_moved",
                    "value": { "card_id": "c-1", "column": "doing" }
                })
                .to_string(),
            ),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let published = events.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, SessionChannel::Storyboard);
        assert_eq!(published[0].2.event_type, "card_moved");
    }
}

//! # チームハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/teams` - 単独チーム作成
//! - `GET /api/v1/teams` - 所属チーム一覧
//! - `GET /api/v1/teams/{id}` - チーム取得
//! - `PUT /api/v1/teams/{id}` - チーム名変更
//! - `DELETE /api/v1/teams/{id}` - チーム削除
//! - `GET /api/v1/teams/{id}/members` - メンバー一覧
//! - `POST /api/v1/teams/{id}/members` - メンバー追加
//! - `PUT /api/v1/teams/{id}/members/{user_id}` - ロール変更
//! - `DELETE /api/v1/teams/{id}/members/{user_id}` - メンバー削除
//! - `GET /api/v1/teams/{id}/poker` - チームのポーカーセッション一覧
//! - `GET /api/v1/teams/{id}/retros` - チームのレトロセッション一覧
//! - `GET /api/v1/teams/{id}/storyboards` - チームのストーリーボード一覧

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::{
    org::GroupRole,
    team::{Team, TeamId},
    user::UserId,
};
use kaizenboard_infra::{repository::TeamMember, session::SessionManager};
use kaizenboard_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    handler::{
        PageQuery,
        organization::{AddMemberRequest, GroupNameRequest, UpdateMemberRequest},
        poker::PokerDto,
        retro::RetroDto,
        storyboard::StoryboardDto,
    },
    usecase::{PokerUseCase, RetroUseCase, StoryboardUseCase, TeamUseCase},
};

/// チーム API の共有状態
///
/// チーム配下のセッション一覧のため、各セッションのユースケースも保持する。
pub struct TeamState {
    pub usecase:         TeamUseCase,
    pub poker:           PokerUseCase,
    pub retro:           RetroUseCase,
    pub storyboard:      StoryboardUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// チームレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TeamDto {
    pub id:              Uuid,
    pub name:            String,
    pub organization_id: Option<Uuid>,
    pub department_id:   Option<Uuid>,
    pub created_at:      String,
    pub updated_at:      String,
}

impl From<&Team> for TeamDto {
    fn from(team: &Team) -> Self {
        Self {
            id:              *team.id().as_uuid(),
            name:            team.name().as_str().to_string(),
            organization_id: team.organization_id().map(|id| *id.as_uuid()),
            department_id:   team.department_id().map(|id| *id.as_uuid()),
            created_at:      team.created_at().to_rfc3339(),
            updated_at:      team.updated_at().to_rfc3339(),
        }
    }
}

/// 所属チームレスポンス DTO（自分のロール付き）
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MyTeamDto {
    pub id:              Uuid,
    pub name:            String,
    pub organization_id: Option<Uuid>,
    pub department_id:   Option<Uuid>,
    pub role:            String,
    pub created_at:      String,
    pub updated_at:      String,
}

impl MyTeamDto {
    fn new(team: &Team, role: GroupRole) -> Self {
        Self {
            id:              *team.id().as_uuid(),
            name:            team.name().as_str().to_string(),
            organization_id: team.organization_id().map(|id| *id.as_uuid()),
            department_id:   team.department_id().map(|id| *id.as_uuid()),
            role:            role.to_string(),
            created_at:      team.created_at().to_rfc3339(),
            updated_at:      team.updated_at().to_rfc3339(),
        }
    }
}

/// チームメンバーレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TeamMemberDto {
    pub user_id: Uuid,
    pub name:    String,
    pub email:   Option<String>,
    pub role:    String,
}

impl From<&TeamMember> for TeamMemberDto {
    fn from(member: &TeamMember) -> Self {
        Self {
            user_id: *member.user_id.as_uuid(),
            name:    member.name.clone(),
            email:   member.email.clone(),
            role:    member.role.to_string(),
        }
    }
}

// --- チームハンドラ ---

/// POST /api/v1/teams
///
/// 組織に属さない単独チームを作成する。ゲストも作成できる。
#[tracing::instrument(skip_all)]
pub async fn create_team(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let team = state.usecase.create(&session, &req.name).await?;

    let response = ApiResponse::new(TeamDto::from(&team));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/teams
#[tracing::instrument(skip_all)]
pub async fn list_teams(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (teams, total) = state
        .usecase
        .list_mine(&session, page.limit(), page.offset())
        .await?;

    let data = teams
        .iter()
        .map(|(team, role)| MyTeamDto::new(team, *role))
        .collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/teams/{id}
#[tracing::instrument(skip_all)]
pub async fn get_team(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let team = state.usecase.get(&session, &TeamId::from_uuid(id)).await?;

    let response = ApiResponse::new(TeamDto::from(&team));
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/teams/{id}
#[tracing::instrument(skip_all)]
pub async fn update_team(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let team = state
        .usecase
        .update(&session, &TeamId::from_uuid(id), &req.name)
        .await?;

    let response = ApiResponse::new(TeamDto::from(&team));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/teams/{id}
#[tracing::instrument(skip_all)]
pub async fn delete_team(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state.usecase.delete(&session, &TeamId::from_uuid(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

// --- メンバーハンドラ ---

/// GET /api/v1/teams/{id}/members
#[tracing::instrument(skip_all)]
pub async fn list_members(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (members, total) = state
        .usecase
        .list_members(&session, &TeamId::from_uuid(id), page.limit(), page.offset())
        .await?;

    let data = members.iter().map(TeamMemberDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/teams/{id}/members
#[tracing::instrument(skip_all)]
pub async fn add_member(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .upsert_member(
            &session,
            &TeamId::from_uuid(id),
            &UserId::from_uuid(req.user_id),
            req.role,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/teams/{id}/members/{user_id}
#[tracing::instrument(skip_all)]
pub async fn update_member(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .upsert_member(
            &session,
            &TeamId::from_uuid(id),
            &UserId::from_uuid(user_id),
            req.role,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/teams/{id}/members/{user_id}
///
/// 一般メンバーは自分自身のみ削除（脱退）できる。
#[tracing::instrument(skip_all)]
pub async fn remove_member(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .remove_member(
            &session,
            &TeamId::from_uuid(id),
            &UserId::from_uuid(user_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// --- チーム配下セッション一覧ハンドラ ---

/// GET /api/v1/teams/{id}/poker
#[tracing::instrument(skip_all)]
pub async fn list_team_poker(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (games, total) = state
        .poker
        .list_for_team(&session, &TeamId::from_uuid(id), page.limit(), page.offset())
        .await?;

    let data = games.iter().map(PokerDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/teams/{id}/retros
#[tracing::instrument(skip_all)]
pub async fn list_team_retros(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (retros, total) = state
        .retro
        .list_for_team(&session, &TeamId::from_uuid(id), page.limit(), page.offset())
        .await?;

    let data = retros.iter().map(RetroDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/teams/{id}/storyboards
#[tracing::instrument(skip_all)]
pub async fn list_team_storyboards(
    State(state): State<Arc<TeamState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (boards, total) = state
        .storyboard
        .list_for_team(&session, &TeamId::from_uuid(id), page.limit(), page.offset())
        .await?;

    let data = boards.iter().map(StoryboardDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, header},
        routing::{get, post},
    };
    use kaizenboard_domain::{
        poker::{PointScale, PokerGame, RoundingMode},
        user::User,
        value_objects::{GroupName, SessionTitle},
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        error::SESSION_COOKIE_NAME,
        test_utils::{
            RecordingEventBus,
            StubOrgStore,
            StubPokerStore,
            StubRetroStore,
            StubSessionManager,
            StubStoryboardStore,
            StubTeamStore,
            StubUserStore,
            fixed_clock,
            fixed_now,
            guest_user,
            registered_user,
            response_body,
            session_for,
        },
    };

    const SESSION_ID: &str = "test-session-id";

    fn create_test_app(teams: StubTeamStore, pokers: StubPokerStore, actor: &User) -> Router {
        let teams = Arc::new(teams);
        let sessions = Arc::new(StubSessionManager::with_session(
            SESSION_ID,
            session_for(actor),
        ));
        let events = Arc::new(RecordingEventBus::new());
        let clock = fixed_clock();

        let usecase = TeamUseCase::new(
            teams.clone(),
            Arc::new(StubOrgStore::empty()),
            Arc::new(StubUserStore::empty()),
            clock.clone(),
        );
        let poker = PokerUseCase::new(
            Arc::new(pokers),
            teams.clone(),
            events.clone(),
            clock.clone(),
        );
        let retro = RetroUseCase::new(
            Arc::new(StubRetroStore::empty()),
            teams.clone(),
            events.clone(),
            clock.clone(),
        );
        let storyboard = StoryboardUseCase::new(
            Arc::new(StubStoryboardStore::empty()),
            teams,
            events,
            clock,
        );
        let state = Arc::new(TeamState {
            usecase,
            poker,
            retro,
            storyboard,
            session_manager: sessions,
        });

        Router::new()
            .route("/api/v1/teams", post(create_team).get(list_teams))
            .route(
                "/api/v1/teams/{id}",
                get(get_team).put(update_team).delete(delete_team),
            )
            .route(
                "/api/v1/teams/{id}/members",
                get(list_members).post(add_member),
            )
            .route("/api/v1/teams/{id}/poker", get(list_team_poker))
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

    fn sample_team() -> Team {
        Team::new_standalone(GroupName::new("開発チーム").unwrap(), fixed_now())
    }

    #[tokio::test]
    async fn test_post_ゲストも単独チームを作成できる() {
        // Given
        let actor = guest_user("通りすがりの参加者");
        let sut = create_test_app(StubTeamStore::empty(), StubPokerStore::empty(), &actor);

        let request = authed_request(
            axum::http::Method::POST,
            "/api/v1/teams",
            Body::from(serde_json::json!({ "name": "開発チーム" }).to_string()),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<TeamDto> = response_body(response).await;
        assert_eq!(body.data.name, "開発チーム");
        assert!(body.data.organization_id.is_none());
    }

    #[tokio::test]
    async fn test_get_作成者はチーム管理者として一覧に表示される() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Admin)],
        );
        let sut = create_test_app(teams, StubPokerStore::empty(), &actor);

        let request = authed_request(axum::http::Method::GET, "/api/v1/teams", Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: PaginatedResponse<MyTeamDto> = response_body(response).await;
        assert_eq!(body.total, 1);
        assert_eq!(body.data[0].role, "admin");
    }

    #[tokio::test]
    async fn test_get_非メンバーのチーム取得は403が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let uri = format!("/api/v1/teams/{}", team.id());
        let teams = StubTeamStore::with_team(team, vec![]);
        let sut = create_test_app(teams, StubPokerStore::empty(), &actor);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_put_一般メンバーのチーム名変更は403が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let uri = format!("/api/v1/teams/{}", team.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(teams, StubPokerStore::empty(), &actor);

        let request = authed_request(
            axum::http::Method::PUT,
            &uri,
            Body::from(serde_json::json!({ "name": "新チーム名" }).to_string()),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_get_チームメンバーはチームのポーカー一覧を取得できる() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let game = PokerGame::new(
            actor.id().clone(),
            Some(team.id().clone()),
            SessionTitle::new("スプリント 42 見積もり").unwrap(),
            PointScale::standard(),
            false,
            RoundingMode::Round,
            fixed_now(),
        );
        let uri = format!("/api/v1/teams/{}/poker", team.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(teams, StubPokerStore::with_games(vec![game]), &actor);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: PaginatedResponse<PokerDto> = response_body(response).await;
        assert_eq!(body.total, 1);
        assert_eq!(body.data[0].name, "スプリント 42 見積もり");
    }

    #[tokio::test]
    async fn test_get_非メンバーのチームポーカー一覧は403が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let uri = format!("/api/v1/teams/{}/poker", team.id());
        let teams = StubTeamStore::with_team(team, vec![]);
        let sut = create_test_app(teams, StubPokerStore::empty(), &actor);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

//! # チェックインハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/teams/{id}/checkins` - チェックイン投稿
//! - `GET /api/v1/teams/{id}/checkins?date=YYYY-MM-DD` - 指定日の一覧
//! - `GET /api/v1/teams/{id}/checkins/{checkin_id}` - チェックイン取得
//! - `PUT /api/v1/teams/{id}/checkins/{checkin_id}` - 本文更新（投稿者のみ）
//! - `DELETE /api/v1/teams/{id}/checkins/{checkin_id}` - 削除
//!
//! いずれもチームメンバーのみ操作できる。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use kaizenboard_domain::{
    checkin::{Checkin, CheckinId},
    team::TeamId,
};
use kaizenboard_infra::session::SessionManager;
use kaizenboard_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    usecase::{CheckinUseCase, checkin::CheckinContentInput},
};

/// チェックイン API の共有状態
pub struct CheckinState {
    pub usecase:         CheckinUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

/// チェックインレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CheckinDto {
    pub id:           Uuid,
    pub team_id:      Uuid,
    pub user_id:      Uuid,
    pub checkin_date: NaiveDate,
    pub yesterday:    String,
    pub today:        String,
    pub blockers:     String,
    pub discuss:      String,
    pub goals_met:    bool,
    pub created_at:   String,
    pub updated_at:   String,
}

impl From<&Checkin> for CheckinDto {
    fn from(checkin: &Checkin) -> Self {
        Self {
            id:           *checkin.id().as_uuid(),
            team_id:      *checkin.team_id().as_uuid(),
            user_id:      *checkin.user_id().as_uuid(),
            checkin_date: checkin.checkin_date(),
            yesterday:    checkin.content().yesterday().to_string(),
            today:        checkin.content().today().to_string(),
            blockers:     checkin.content().blockers().to_string(),
            discuss:      checkin.content().discuss().to_string(),
            goals_met:    checkin.content().goals_met(),
            created_at:   checkin.created_at().to_rfc3339(),
            updated_at:   checkin.updated_at().to_rfc3339(),
        }
    }
}

/// チェックイン本文のリクエスト
#[derive(Debug, Deserialize)]
pub struct CheckinContentRequest {
    #[serde(default)]
    pub yesterday: String,
    #[serde(default)]
    pub today:     String,
    #[serde(default)]
    pub blockers:  String,
    #[serde(default)]
    pub discuss:   String,
    #[serde(default)]
    pub goals_met: bool,
}

impl CheckinContentRequest {
    fn into_input(self) -> CheckinContentInput {
        CheckinContentInput {
            yesterday: self.yesterday,
            today:     self.today,
            blockers:  self.blockers,
            discuss:   self.discuss,
            goals_met: self.goals_met,
        }
    }
}

/// チェックイン投稿リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateCheckinRequest {
    /// 省略時は今日の日付
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub content: CheckinContentRequest,
}

/// 日付クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

/// POST /api/v1/teams/{id}/checkins
///
/// ## レスポンス
///
/// - `201 Created`: 投稿されたチェックイン
/// - `409 Conflict`: 同一日に投稿済み
#[tracing::instrument(skip_all)]
pub async fn create_checkin(
    State(state): State<Arc<CheckinState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateCheckinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let checkin = state
        .usecase
        .create(
            &session,
            &TeamId::from_uuid(id),
            req.date,
            req.content.into_input(),
        )
        .await?;

    let response = ApiResponse::new(CheckinDto::from(&checkin));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/teams/{id}/checkins?date=YYYY-MM-DD
///
/// 指定日（省略時は今日）のチーム全員分のチェックインを返す。
#[tracing::instrument(skip_all)]
pub async fn list_checkins(
    State(state): State<Arc<CheckinState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let checkins = state
        .usecase
        .list_for_team(&session, &TeamId::from_uuid(id), query.date)
        .await?;

    let data: Vec<CheckinDto> = checkins.iter().map(CheckinDto::from).collect();
    let response = ApiResponse::new(data);
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/teams/{id}/checkins/{checkin_id}
#[tracing::instrument(skip_all)]
pub async fn get_checkin(
    State(state): State<Arc<CheckinState>>,
    jar: CookieJar,
    Path((id, checkin_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let checkin = state
        .usecase
        .get(
            &session,
            &TeamId::from_uuid(id),
            &CheckinId::from_uuid(checkin_id),
        )
        .await?;

    let response = ApiResponse::new(CheckinDto::from(&checkin));
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/teams/{id}/checkins/{checkin_id}
#[tracing::instrument(skip_all)]
pub async fn update_checkin(
    State(state): State<Arc<CheckinState>>,
    jar: CookieJar,
    Path((id, checkin_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CheckinContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let checkin = state
        .usecase
        .update(
            &session,
            &TeamId::from_uuid(id),
            &CheckinId::from_uuid(checkin_id),
            req.into_input(),
        )
        .await?;

    let response = ApiResponse::new(CheckinDto::from(&checkin));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/teams/{id}/checkins/{checkin_id}
#[tracing::instrument(skip_all)]
pub async fn delete_checkin(
    State(state): State<Arc<CheckinState>>,
    jar: CookieJar,
    Path((id, checkin_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .delete(
            &session,
            &TeamId::from_uuid(id),
            &CheckinId::from_uuid(checkin_id),
        )
        .await?;

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
    use kaizenboard_domain::{
        checkin::CheckinContent,
        org::GroupRole,
        team::Team,
        user::User,
        value_objects::GroupName,
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        error::SESSION_COOKIE_NAME,
        test_utils::{
            StubCheckinStore,
            StubSessionManager,
            StubTeamStore,
            fixed_clock,
            fixed_now,
            registered_user,
            response_body,
            session_for,
        },
    };

    const SESSION_ID: &str = "test-session-id";

    fn create_test_app(
        checkins: StubCheckinStore,
        teams: StubTeamStore,
        actor: &User,
    ) -> Router {
        let sessions = Arc::new(StubSessionManager::with_session(
            SESSION_ID,
            session_for(actor),
        ));
        let usecase =
            CheckinUseCase::new(Arc::new(checkins), Arc::new(teams), fixed_clock());
        let state = Arc::new(CheckinState {
            usecase,
            session_manager: sessions,
        });

        Router::new()
            .route(
                "/api/v1/teams/{id}/checkins",
                get(list_checkins).post(create_checkin),
            )
            .route(
                "/api/v1/teams/{id}/checkins/{checkin_id}",
                get(get_checkin).put(update_checkin).delete(delete_checkin),
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

    fn sample_team() -> Team {
        Team::new_standalone(GroupName::new("開発チーム").unwrap(), fixed_now())
    }

    fn sample_checkin(team: &Team, author: &User) -> Checkin {
        Checkin::new(
            team.id().clone(),
            author.id().clone(),
            fixed_now().date_naive(),
            CheckinContent::new(
                "API の実装".to_string(),
                "テストの追加".to_string(),
                String::new(),
                String::new(),
                true,
            )
            .unwrap(),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn test_post_チェックインを投稿すると201が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let uri = format!("/api/v1/teams/{}/checkins", team.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(StubCheckinStore::empty(), teams, &actor);

        let request = authed_request(
            axum::http::Method::POST,
            &uri,
            Body::from(
                serde_json::json!({
                    "yesterday": "API の実装",
                    "today": "テストの追加",
                    "goals_met": true
                })
                .to_string(),
            ),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<CheckinDto> = response_body(response).await;
        assert_eq!(body.data.yesterday, "API の実装");
        // 日付省略時は今日の日付
        assert_eq!(body.data.checkin_date, fixed_now().date_naive());
    }

    #[tokio::test]
    async fn test_post_同一日の二重投稿は409が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let uri = format!("/api/v1/teams/{}/checkins", team.id());
        let existing = sample_checkin(&team, &actor);
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(StubCheckinStore::with_checkins(vec![existing]), teams, &actor);

        let request = authed_request(
            axum::http::Method::POST,
            &uri,
            Body::from(serde_json::json!({ "today": "二重投稿" }).to_string()),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_get_非メンバーの一覧取得は403が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let uri = format!("/api/v1/teams/{}/checkins", team.id());
        let teams = StubTeamStore::with_team(team, vec![]);
        let sut = create_test_app(StubCheckinStore::empty(), teams, &actor);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_get_指定日のチェックインのみが返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let checkin = sample_checkin(&team, &actor);
        let uri = format!(
            "/api/v1/teams/{}/checkins?date={}",
            team.id(),
            fixed_now().date_naive()
        );
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(StubCheckinStore::with_checkins(vec![checkin]), teams, &actor);

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<Vec<CheckinDto>> = response_body(response).await;
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_get_チェックインを単体で取得できる() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let checkin = sample_checkin(&team, &actor);
        let uri = format!("/api/v1/teams/{}/checkins/{}", team.id(), checkin.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(
            StubCheckinStore::with_checkins(vec![checkin.clone()]),
            teams,
            &actor,
        );

        let request = authed_request(axum::http::Method::GET, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<CheckinDto> = response_body(response).await;
        assert_eq!(body.data, CheckinDto::from(&checkin));
    }

    #[tokio::test]
    async fn test_put_投稿者以外の更新は403が返る() {
        // Given
        let author = registered_user("author@example.com");
        let actor = registered_user("other@example.com");
        let team = sample_team();
        let checkin = sample_checkin(&team, &author);
        let uri = format!("/api/v1/teams/{}/checkins/{}", team.id(), checkin.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![
                (author.id().clone(), GroupRole::Member),
                (actor.id().clone(), GroupRole::Member),
            ],
        );
        let sut = create_test_app(StubCheckinStore::with_checkins(vec![checkin]), teams, &actor);

        let request = authed_request(
            axum::http::Method::PUT,
            &uri,
            Body::from(serde_json::json!({ "today": "書き換え" }).to_string()),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_チーム管理者は他人のチェックインを削除できる() {
        // Given
        let author = registered_user("author@example.com");
        let actor = registered_user("leader@example.com");
        let team = sample_team();
        let checkin = sample_checkin(&team, &author);
        let uri = format!("/api/v1/teams/{}/checkins/{}", team.id(), checkin.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![
                (author.id().clone(), GroupRole::Member),
                (actor.id().clone(), GroupRole::Admin),
            ],
        );
        let sut = create_test_app(StubCheckinStore::with_checkins(vec![checkin]), teams, &actor);

        let request = authed_request(axum::http::Method::DELETE, &uri, Body::empty());

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_put_別チームのチェックインidは404が返る() {
        // Given
        let actor = registered_user("yamada@example.com");
        let team = sample_team();
        let other_team = sample_team();
        let checkin = sample_checkin(&other_team, &actor);
        let uri = format!("/api/v1/teams/{}/checkins/{}", team.id(), checkin.id());
        let teams = StubTeamStore::with_team(
            team,
            vec![(actor.id().clone(), GroupRole::Member)],
        );
        let sut = create_test_app(StubCheckinStore::with_checkins(vec![checkin]), teams, &actor);

        let request = authed_request(
            axum::http::Method::PUT,
            &uri,
            Body::from(serde_json::json!({ "today": "更新" }).to_string()),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! # 組織ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/organizations` - 組織作成
//! - `GET /api/v1/organizations` - 所属組織一覧
//! - `GET /api/v1/organizations/{id}` - 組織取得
//! - `PUT /api/v1/organizations/{id}` - 組織名変更
//! - `DELETE /api/v1/organizations/{id}` - 組織削除
//! - `GET /api/v1/organizations/{id}/members` - メンバー一覧
//! - `POST /api/v1/organizations/{id}/members` - メンバー追加
//! - `PUT /api/v1/organizations/{id}/members/{user_id}` - ロール変更
//! - `DELETE /api/v1/organizations/{id}/members/{user_id}` - メンバー削除
//! - `POST /api/v1/organizations/{id}/departments` - 部門作成
//! - `GET /api/v1/organizations/{id}/departments` - 部門一覧
//! - `GET /api/v1/organizations/{id}/departments/{dept_id}` - 部門取得
//! - `PUT /api/v1/organizations/{id}/departments/{dept_id}` - 部門名変更
//! - `DELETE /api/v1/organizations/{id}/departments/{dept_id}` - 部門削除
//! - `POST /api/v1/organizations/{id}/teams` - 組織直下チーム作成
//! - `GET /api/v1/organizations/{id}/teams` - 組織直下チーム一覧
//! - `POST /api/v1/organizations/{id}/departments/{dept_id}/teams` - 部門配下チーム作成
//! - `GET /api/v1/organizations/{id}/departments/{dept_id}/teams` - 部門配下チーム一覧

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use kaizenboard_domain::{
    org::{Department, DepartmentId, GroupRole, Organization, OrganizationId},
    user::UserId,
};
use kaizenboard_infra::{repository::OrganizationMember, session::SessionManager};
use kaizenboard_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, authenticate},
    handler::{PageQuery, team::TeamDto},
    usecase::OrganizationUseCase,
};

/// 組織 API の共有状態
pub struct OrganizationState {
    pub usecase:         OrganizationUseCase,
    pub session_manager: Arc<dyn SessionManager>,
}

// --- レスポンス DTO ---

/// 組織レスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OrganizationDto {
    pub id:         Uuid,
    pub name:       String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Organization> for OrganizationDto {
    fn from(org: &Organization) -> Self {
        Self {
            id:         *org.id().as_uuid(),
            name:       org.name().as_str().to_string(),
            created_at: org.created_at().to_rfc3339(),
            updated_at: org.updated_at().to_rfc3339(),
        }
    }
}

/// 所属組織レスポンス DTO（自分のロール付き）
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MyOrganizationDto {
    pub id:         Uuid,
    pub name:       String,
    pub role:       String,
    pub created_at: String,
    pub updated_at: String,
}

impl MyOrganizationDto {
    fn new(org: &Organization, role: GroupRole) -> Self {
        Self {
            id:         *org.id().as_uuid(),
            name:       org.name().as_str().to_string(),
            role:       role.to_string(),
            created_at: org.created_at().to_rfc3339(),
            updated_at: org.updated_at().to_rfc3339(),
        }
    }
}

/// メンバーレスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MemberDto {
    pub user_id: Uuid,
    pub name:    String,
    pub email:   Option<String>,
    pub role:    String,
}

impl From<&OrganizationMember> for MemberDto {
    fn from(member: &OrganizationMember) -> Self {
        Self {
            user_id: *member.user_id.as_uuid(),
            name:    member.name.clone(),
            email:   member.email.clone(),
            role:    member.role.to_string(),
        }
    }
}

/// 部門レスポンス DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DepartmentDto {
    pub id:              Uuid,
    pub organization_id: Uuid,
    pub name:            String,
    pub created_at:      String,
    pub updated_at:      String,
}

impl From<&Department> for DepartmentDto {
    fn from(dept: &Department) -> Self {
        Self {
            id:              *dept.id().as_uuid(),
            organization_id: *dept.organization_id().as_uuid(),
            name:            dept.name().as_str().to_string(),
            created_at:      dept.created_at().to_rfc3339(),
            updated_at:      dept.updated_at().to_rfc3339(),
        }
    }
}

// --- リクエスト型 ---

/// 組織・部門・チームの作成/名前変更リクエスト
#[derive(Debug, Deserialize)]
pub struct GroupNameRequest {
    pub name: String,
}

/// メンバー追加リクエスト
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role:    GroupRole,
}

/// ロール変更リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: GroupRole,
}

// --- 組織ハンドラ ---

/// POST /api/v1/organizations
#[tracing::instrument(skip_all)]
pub async fn create_organization(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let org = state.usecase.create(&session, &req.name).await?;

    let response = ApiResponse::new(OrganizationDto::from(&org));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/organizations
///
/// 自分が所属する組織の一覧を返す。
#[tracing::instrument(skip_all)]
pub async fn list_organizations(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (orgs, total) = state
        .usecase
        .list_mine(&session, page.limit(), page.offset())
        .await?;

    let data = orgs
        .iter()
        .map(|(org, role)| MyOrganizationDto::new(org, *role))
        .collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/organizations/{id}
#[tracing::instrument(skip_all)]
pub async fn get_organization(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let org = state
        .usecase
        .get(&session, &OrganizationId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(OrganizationDto::from(&org));
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/organizations/{id}
#[tracing::instrument(skip_all)]
pub async fn update_organization(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let org = state
        .usecase
        .update(&session, &OrganizationId::from_uuid(id), &req.name)
        .await?;

    let response = ApiResponse::new(OrganizationDto::from(&org));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/organizations/{id}
#[tracing::instrument(skip_all)]
pub async fn delete_organization(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .delete(&session, &OrganizationId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// --- メンバーハンドラ ---

/// GET /api/v1/organizations/{id}/members
#[tracing::instrument(skip_all)]
pub async fn list_members(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (members, total) = state
        .usecase
        .list_members(
            &session,
            &OrganizationId::from_uuid(id),
            page.limit(),
            page.offset(),
        )
        .await?;

    let data = members.iter().map(MemberDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/organizations/{id}/members
#[tracing::instrument(skip_all)]
pub async fn add_member(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .upsert_member(
            &session,
            &OrganizationId::from_uuid(id),
            &UserId::from_uuid(req.user_id),
            req.role,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/organizations/{id}/members/{user_id}
///
/// 最後の管理者の降格は `409 Conflict` を返す。
#[tracing::instrument(skip_all)]
pub async fn update_member(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .upsert_member(
            &session,
            &OrganizationId::from_uuid(id),
            &UserId::from_uuid(user_id),
            req.role,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/organizations/{id}/members/{user_id}
///
/// 一般メンバーは自分自身のみ削除（脱退）できる。
/// 最後の管理者の削除は `409 Conflict` を返す。
#[tracing::instrument(skip_all)]
pub async fn remove_member(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .remove_member(
            &session,
            &OrganizationId::from_uuid(id),
            &UserId::from_uuid(user_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// --- 部門ハンドラ ---

/// POST /api/v1/organizations/{id}/departments
#[tracing::instrument(skip_all)]
pub async fn create_department(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let dept = state
        .usecase
        .create_department(&session, &OrganizationId::from_uuid(id), &req.name)
        .await?;

    let response = ApiResponse::new(DepartmentDto::from(&dept));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/organizations/{id}/departments
#[tracing::instrument(skip_all)]
pub async fn list_departments(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (depts, total) = state
        .usecase
        .list_departments(
            &session,
            &OrganizationId::from_uuid(id),
            page.limit(),
            page.offset(),
        )
        .await?;

    let data = depts.iter().map(DepartmentDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/organizations/{id}/departments/{dept_id}
#[tracing::instrument(skip_all)]
pub async fn get_department(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, dept_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let dept = state
        .usecase
        .get_department(
            &session,
            &OrganizationId::from_uuid(id),
            &DepartmentId::from_uuid(dept_id),
        )
        .await?;

    let response = ApiResponse::new(DepartmentDto::from(&dept));
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/organizations/{id}/departments/{dept_id}
#[tracing::instrument(skip_all)]
pub async fn update_department(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, dept_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let dept = state
        .usecase
        .update_department(
            &session,
            &OrganizationId::from_uuid(id),
            &DepartmentId::from_uuid(dept_id),
            &req.name,
        )
        .await?;

    let response = ApiResponse::new(DepartmentDto::from(&dept));
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /api/v1/organizations/{id}/departments/{dept_id}
#[tracing::instrument(skip_all)]
pub async fn delete_department(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, dept_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    state
        .usecase
        .delete_department(
            &session,
            &OrganizationId::from_uuid(id),
            &DepartmentId::from_uuid(dept_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// --- 組織・部門配下チームハンドラ ---

/// POST /api/v1/organizations/{id}/teams
#[tracing::instrument(skip_all)]
pub async fn create_team(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let team = state
        .usecase
        .create_team(&session, &OrganizationId::from_uuid(id), &req.name)
        .await?;

    let response = ApiResponse::new(TeamDto::from(&team));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/organizations/{id}/teams
///
/// 部門に属さない組織直下チームのみを返す。
#[tracing::instrument(skip_all)]
pub async fn list_teams(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (teams, total) = state
        .usecase
        .list_teams(
            &session,
            &OrganizationId::from_uuid(id),
            page.limit(),
            page.offset(),
        )
        .await?;

    let data = teams.iter().map(TeamDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/organizations/{id}/departments/{dept_id}/teams
#[tracing::instrument(skip_all)]
pub async fn create_department_team(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, dept_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<GroupNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let team = state
        .usecase
        .create_department_team(
            &session,
            &OrganizationId::from_uuid(id),
            &DepartmentId::from_uuid(dept_id),
            &req.name,
        )
        .await?;

    let response = ApiResponse::new(TeamDto::from(&team));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/organizations/{id}/departments/{dept_id}/teams
#[tracing::instrument(skip_all)]
pub async fn list_department_teams(
    State(state): State<Arc<OrganizationState>>,
    jar: CookieJar,
    Path((id, dept_id)): Path<(Uuid, Uuid)>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(state.session_manager.as_ref(), &jar).await?;
    let (teams, total) = state
        .usecase
        .list_department_teams(
            &session,
            &OrganizationId::from_uuid(id),
            &DepartmentId::from_uuid(dept_id),
            page.limit(),
            page.offset(),
        )
        .await?;

    let data = teams.iter().map(TeamDto::from).collect();
    let response = PaginatedResponse::new(data, total, page.limit(), page.offset());
    Ok((StatusCode::OK, Json(response)))
}

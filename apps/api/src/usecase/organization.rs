//! # 組織ユースケース
//!
//! 組織・部門の CRUD とメンバー管理を実装する。
//!
//! ## 認可ルール
//!
//! - 参照（組織・メンバー・部門の取得/一覧）: 組織メンバーまたはアプリ管理者
//! - 変更（更新・削除・メンバー管理・部門管理）: 組織管理者またはアプリ管理者
//! - 作成: ログイン済みユーザー（ゲストは不可）

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    org::{Department, DepartmentId, GroupRole, Organization, OrganizationId},
    team::Team,
    user::{UserId, UserRole},
    value_objects::GroupName,
};
use kaizenboard_infra::{
    repository::{
        OrganizationMember, OrganizationRepository, TeamRepository, UserRepository,
    },
    session::SessionData,
};

use crate::error::ApiError;

/// 組織ユースケース
pub struct OrganizationUseCase {
    orgs:  Arc<dyn OrganizationRepository>,
    teams: Arc<dyn TeamRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl OrganizationUseCase {
    pub fn new(
        orgs: Arc<dyn OrganizationRepository>,
        teams: Arc<dyn TeamRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orgs,
            teams,
            users,
            clock,
        }
    }

    /// 組織を作成する
    ///
    /// 作成者は自動的に組織管理者として登録される。ゲストは作成できない。
    pub async fn create(
        &self,
        actor: &SessionData,
        name: &str,
    ) -> Result<Organization, ApiError> {
        if actor.role() == UserRole::Guest {
            return Err(ApiError::Forbidden(
                "ゲストユーザーは組織を作成できません".to_string(),
            ));
        }

        let name = GroupName::new(name)?;
        let org = Organization::new(name, self.clock.now());
        self.orgs.insert(&org, actor.user_id()).await?;
        Ok(org)
    }

    /// 自分が所属する組織一覧を取得する
    pub async fn list_mine(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Organization, GroupRole)>, i64), ApiError> {
        Ok(self.orgs.list_for_user(actor.user_id(), limit, offset).await?)
    }

    /// 組織を取得する
    pub async fn get(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
    ) -> Result<Organization, ApiError> {
        let org = self.find_org(id).await?;
        self.ensure_member(actor, id).await?;
        Ok(org)
    }

    /// 組織名を変更する
    pub async fn update(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
        name: &str,
    ) -> Result<Organization, ApiError> {
        let org = self.find_org(id).await?;
        self.ensure_group_admin(actor, id).await?;

        let name = GroupName::new(name)?;
        let updated = org.with_name(name, self.clock.now());
        self.orgs.update(&updated).await?;
        Ok(updated)
    }

    /// 組織を削除する
    ///
    /// 部門・組織直下チーム・メンバーシップもまとめて削除される。
    pub async fn delete(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
    ) -> Result<(), ApiError> {
        self.find_org(id).await?;
        self.ensure_group_admin(actor, id).await?;

        self.orgs.delete(id).await?;
        Ok(())
    }

    /// 組織のメンバー一覧を取得する
    pub async fn list_members(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<OrganizationMember>, i64), ApiError> {
        self.find_org(id).await?;
        self.ensure_member(actor, id).await?;

        Ok(self.orgs.list_members(id, limit, offset).await?)
    }

    /// メンバーを追加またはロール変更する
    ///
    /// 最後の管理者を一般メンバーに降格することはできない。
    pub async fn upsert_member(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), ApiError> {
        self.find_org(id).await?;
        self.ensure_group_admin(actor, id).await?;

        // FK 違反を 500 にしないため、対象ユーザーの存在を先に確認する
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {user_id}")))?;

        if !role.is_admin() {
            self.ensure_not_last_admin(id, user_id).await?;
        }

        self.orgs.upsert_member(id, user_id, role).await?;
        Ok(())
    }

    /// メンバーを削除する
    ///
    /// 組織管理者は自分以外を削除できる。一般メンバーは自分のみ削除できる
    /// （脱退）。最後の管理者は削除できない。
    pub async fn remove_member(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), ApiError> {
        self.find_org(id).await?;

        if actor.user_id() != user_id {
            self.ensure_group_admin(actor, id).await?;
        } else {
            self.ensure_member(actor, id).await?;
        }

        self.ensure_not_last_admin(id, user_id).await?;

        self.orgs.remove_member(id, user_id).await?;
        Ok(())
    }

    /// 部門を作成する
    pub async fn create_department(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        name: &str,
    ) -> Result<Department, ApiError> {
        self.find_org(org_id).await?;
        self.ensure_group_admin(actor, org_id).await?;

        let name = GroupName::new(name)?;
        let dept = Department::new(org_id.clone(), name, self.clock.now());
        self.orgs.insert_department(&dept).await?;
        Ok(dept)
    }

    /// 組織の部門一覧を取得する
    pub async fn list_departments(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Department>, i64), ApiError> {
        self.find_org(org_id).await?;
        self.ensure_member(actor, org_id).await?;

        Ok(self.orgs.list_departments(org_id, limit, offset).await?)
    }

    /// 部門を取得する
    pub async fn get_department(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        dept_id: &DepartmentId,
    ) -> Result<Department, ApiError> {
        let dept = self.find_department_in(org_id, dept_id).await?;
        self.ensure_member(actor, org_id).await?;
        Ok(dept)
    }

    /// 部門名を変更する
    pub async fn update_department(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        dept_id: &DepartmentId,
        name: &str,
    ) -> Result<Department, ApiError> {
        let dept = self.find_department_in(org_id, dept_id).await?;
        self.ensure_group_admin(actor, org_id).await?;

        let name = GroupName::new(name)?;
        let updated = dept.with_name(name, self.clock.now());
        self.orgs.update_department(&updated).await?;
        Ok(updated)
    }

    /// 部門を削除する
    pub async fn delete_department(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        dept_id: &DepartmentId,
    ) -> Result<(), ApiError> {
        self.find_department_in(org_id, dept_id).await?;
        self.ensure_group_admin(actor, org_id).await?;

        self.orgs.delete_department(dept_id).await?;
        Ok(())
    }

    /// 組織直下チームを作成する
    pub async fn create_team(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        name: &str,
    ) -> Result<Team, ApiError> {
        self.find_org(org_id).await?;
        self.ensure_member(actor, org_id).await?;

        let name = GroupName::new(name)?;
        let team = Team::new_for_organization(name, org_id.clone(), self.clock.now());
        self.teams.insert(&team, actor.user_id()).await?;
        Ok(team)
    }

    /// 組織直下チーム一覧を取得する
    pub async fn list_teams(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), ApiError> {
        self.find_org(org_id).await?;
        self.ensure_member(actor, org_id).await?;

        Ok(self.teams.list_for_organization(org_id, limit, offset).await?)
    }

    /// 部門配下チームを作成する
    pub async fn create_department_team(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        dept_id: &DepartmentId,
        name: &str,
    ) -> Result<Team, ApiError> {
        self.find_department_in(org_id, dept_id).await?;
        self.ensure_member(actor, org_id).await?;

        let name = GroupName::new(name)?;
        let team = Team::new_for_department(
            name,
            org_id.clone(),
            dept_id.clone(),
            self.clock.now(),
        );
        self.teams.insert(&team, actor.user_id()).await?;
        Ok(team)
    }

    /// 部門配下チーム一覧を取得する
    pub async fn list_department_teams(
        &self,
        actor: &SessionData,
        org_id: &OrganizationId,
        dept_id: &DepartmentId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), ApiError> {
        self.find_department_in(org_id, dept_id).await?;
        self.ensure_member(actor, org_id).await?;

        Ok(self.teams.list_for_department(dept_id, limit, offset).await?)
    }

    // --- 内部ヘルパー ---

    async fn find_org(&self, id: &OrganizationId) -> Result<Organization, ApiError> {
        self.orgs
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("組織が見つかりません: {id}")))
    }

    /// 組織に属し、かつ指定の部門 ID を持つ部門を取得する
    ///
    /// 別組織の部門 ID を指定された場合も 404 を返す。
    async fn find_department_in(
        &self,
        org_id: &OrganizationId,
        dept_id: &DepartmentId,
    ) -> Result<Department, ApiError> {
        let dept = self
            .orgs
            .find_department(dept_id)
            .await?
            .filter(|d| d.organization_id() == org_id)
            .ok_or_else(|| ApiError::NotFound(format!("部門が見つかりません: {dept_id}")))?;
        Ok(dept)
    }

    async fn ensure_member(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
    ) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        self.orgs
            .find_member_role(id, actor.user_id())
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                ApiError::Forbidden("組織のメンバーではありません".to_string())
            })
    }

    /// 対象ユーザーが最後の組織管理者でないことを確認する
    async fn ensure_not_last_admin(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), ApiError> {
        let target_role = self.orgs.find_member_role(id, user_id).await?;
        if target_role.is_some_and(GroupRole::is_admin)
            && self.orgs.count_admins(id).await? <= 1
        {
            return Err(ApiError::Conflict(
                "最後の管理者を削除または降格することはできません".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_group_admin(
        &self,
        actor: &SessionData,
        id: &OrganizationId,
    ) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        let role = self.orgs.find_member_role(id, actor.user_id()).await?;
        match role {
            Some(role) if role.is_admin() => Ok(()),
            Some(_) => Err(ApiError::Forbidden(
                "組織の管理者権限が必要です".to_string(),
            )),
            None => Err(ApiError::Forbidden(
                "組織のメンバーではありません".to_string(),
            )),
        }
    }
}

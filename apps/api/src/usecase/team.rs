//! # チームユースケース
//!
//! チームの CRUD とメンバー管理を実装する。
//!
//! ## 認可ルール
//!
//! - 参照: チームメンバー。組織・部門スコープのチームは組織メンバーも可
//! - 変更（更新・削除・メンバー管理）: チーム管理者またはアプリ管理者
//! - 単独チームの作成: ログイン済みユーザー（ゲストも可）

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    org::GroupRole,
    team::{Team, TeamId},
    user::UserId,
    value_objects::GroupName,
};
use kaizenboard_infra::{
    repository::{OrganizationRepository, TeamMember, TeamRepository, UserRepository},
    session::SessionData,
};

use crate::error::ApiError;

/// チームユースケース
pub struct TeamUseCase {
    teams: Arc<dyn TeamRepository>,
    orgs:  Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl TeamUseCase {
    pub fn new(
        teams: Arc<dyn TeamRepository>,
        orgs: Arc<dyn OrganizationRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            teams,
            orgs,
            users,
            clock,
        }
    }

    /// 単独チームを作成する
    ///
    /// 作成者は自動的にチーム管理者として登録される。
    pub async fn create(&self, actor: &SessionData, name: &str) -> Result<Team, ApiError> {
        let name = GroupName::new(name)?;
        let team = Team::new_standalone(name, self.clock.now());
        self.teams.insert(&team, actor.user_id()).await?;
        Ok(team)
    }

    /// 自分が所属するチーム一覧を取得する
    pub async fn list_mine(
        &self,
        actor: &SessionData,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Team, GroupRole)>, i64), ApiError> {
        Ok(self.teams.list_for_user(actor.user_id(), limit, offset).await?)
    }

    /// チームを取得する
    pub async fn get(&self, actor: &SessionData, id: &TeamId) -> Result<Team, ApiError> {
        let team = self.find_team(id).await?;
        self.ensure_viewer(actor, &team).await?;
        Ok(team)
    }

    /// チーム名を変更する
    pub async fn update(
        &self,
        actor: &SessionData,
        id: &TeamId,
        name: &str,
    ) -> Result<Team, ApiError> {
        let team = self.find_team(id).await?;
        self.ensure_team_admin(actor, id).await?;

        let name = GroupName::new(name)?;
        let updated = team.with_name(name, self.clock.now());
        self.teams.update(&updated).await?;
        Ok(updated)
    }

    /// チームを削除する
    pub async fn delete(&self, actor: &SessionData, id: &TeamId) -> Result<(), ApiError> {
        self.find_team(id).await?;
        self.ensure_team_admin(actor, id).await?;

        self.teams.delete(id).await?;
        Ok(())
    }

    /// チームのメンバー一覧を取得する
    pub async fn list_members(
        &self,
        actor: &SessionData,
        id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TeamMember>, i64), ApiError> {
        let team = self.find_team(id).await?;
        self.ensure_viewer(actor, &team).await?;

        Ok(self.teams.list_members(id, limit, offset).await?)
    }

    /// メンバーを追加またはロール変更する
    pub async fn upsert_member(
        &self,
        actor: &SessionData,
        id: &TeamId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), ApiError> {
        self.find_team(id).await?;
        self.ensure_team_admin(actor, id).await?;

        // FK 違反を 500 にしないため、対象ユーザーの存在を先に確認する
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {user_id}")))?;

        self.teams.upsert_member(id, user_id, role).await?;
        Ok(())
    }

    /// メンバーを削除する
    ///
    /// チーム管理者は任意のメンバーを、一般メンバーは自分自身のみ削除できる。
    pub async fn remove_member(
        &self,
        actor: &SessionData,
        id: &TeamId,
        user_id: &UserId,
    ) -> Result<(), ApiError> {
        self.find_team(id).await?;

        if actor.user_id() != user_id {
            self.ensure_team_admin(actor, id).await?;
        } else {
            self.ensure_team_member(actor, id).await?;
        }

        self.teams.remove_member(id, user_id).await?;
        Ok(())
    }

    /// ユーザーがチームのメンバー（またはアプリ管理者）であることを確認する
    ///
    /// 他のユースケース（チェックイン等）からも参照する。
    pub async fn ensure_team_member(
        &self,
        actor: &SessionData,
        id: &TeamId,
    ) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        self.teams
            .find_member_role(id, actor.user_id())
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                ApiError::Forbidden("チームのメンバーではありません".to_string())
            })
    }

    // --- 内部ヘルパー ---

    async fn find_team(&self, id: &TeamId) -> Result<Team, ApiError> {
        self.teams
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("チームが見つかりません: {id}")))
    }

    /// 参照権限を確認する
    ///
    /// チームメンバーに加え、組織スコープのチームは組織メンバーにも
    /// 参照を許可する。
    async fn ensure_viewer(&self, actor: &SessionData, team: &Team) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        let is_team_member = self
            .teams
            .find_member_role(team.id(), actor.user_id())
            .await?
            .is_some();
        if is_team_member {
            return Ok(());
        }

        if let Some(org_id) = team.organization_id() {
            let is_org_member = self
                .orgs
                .find_member_role(org_id, actor.user_id())
                .await?
                .is_some();
            if is_org_member {
                return Ok(());
            }
        }

        Err(ApiError::Forbidden(
            "チームのメンバーではありません".to_string(),
        ))
    }

    async fn ensure_team_admin(
        &self,
        actor: &SessionData,
        id: &TeamId,
    ) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        let role = self.teams.find_member_role(id, actor.user_id()).await?;
        match role {
            Some(role) if role.is_admin() => Ok(()),
            Some(_) => Err(ApiError::Forbidden(
                "チームの管理者権限が必要です".to_string(),
            )),
            None => Err(ApiError::Forbidden(
                "チームのメンバーではありません".to_string(),
            )),
        }
    }
}

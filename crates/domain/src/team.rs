//! # チーム（エンティティ）
//!
//! コラボレーションセッション（ポーカー、レトロ等）の共有単位。
//!
//! ## 所属パターン
//!
//! | パターン | organization_id | department_id |
//! |---------|-----------------|---------------|
//! | 単独チーム | `None` | `None` |
//! | 組織直下チーム | `Some` | `None` |
//! | 部門配下チーム | `Some` | `Some` |
//!
//! `department_id` が `Some` のとき `organization_id` も必ず `Some` になる。
//! この不変条件はコンストラクタで保証する。

use chrono::{DateTime, Utc};

use crate::{
    org::{DepartmentId, OrganizationId},
    value_objects::GroupName,
};

define_uuid_id! {
    /// チーム ID
    pub struct TeamId;
}

/// チームの所属スコープ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    /// どのグループにも属さない
    Standalone,
    /// 組織直下
    Organization,
    /// 部門配下
    Department,
}

/// チーム（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    id:              TeamId,
    name:            GroupName,
    organization_id: Option<OrganizationId>,
    department_id:   Option<DepartmentId>,
    created_at:      DateTime<Utc>,
    updated_at:      DateTime<Utc>,
}

impl Team {
    /// 単独チームを新規作成する
    pub fn new_standalone(name: GroupName, now: DateTime<Utc>) -> Self {
        Self {
            id: TeamId::new(),
            name,
            organization_id: None,
            department_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 組織直下チームを新規作成する
    pub fn new_for_organization(
        name: GroupName,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TeamId::new(),
            name,
            organization_id: Some(organization_id),
            department_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 部門配下チームを新規作成する
    ///
    /// 部門は組織に属するため、組織 ID も同時に要求する。
    pub fn new_for_department(
        name: GroupName,
        organization_id: OrganizationId,
        department_id: DepartmentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TeamId::new(),
            name,
            organization_id: Some(organization_id),
            department_id: Some(department_id),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_db(
        id: TeamId,
        name: GroupName,
        organization_id: Option<OrganizationId>,
        department_id: Option<DepartmentId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            organization_id,
            department_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &GroupName {
        &self.name
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        self.organization_id.as_ref()
    }

    pub fn department_id(&self) -> Option<&DepartmentId> {
        self.department_id.as_ref()
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    pub fn scope(&self) -> TeamScope {
        match (&self.organization_id, &self.department_id) {
            (_, Some(_)) => TeamScope::Department,
            (Some(_), None) => TeamScope::Organization,
            (None, None) => TeamScope::Standalone,
        }
    }

    pub fn with_name(self, name: GroupName, now: DateTime<Utc>) -> Self {
        Self {
            name,
            updated_at: now,
            ..self
        }
    }
}

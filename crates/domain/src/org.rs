//! # 組織・部門（エンティティ）
//!
//! グループ階層の上位 2 レベルを表現する。
//!
//! ```text
//! Organization ─┬─ Department ─── Team
//!               └─ Team（部門に属さない組織直下チーム）
//! ```
//!
//! ## 設計方針
//!
//! - 部門は必ず 1 つの組織に属する
//! - メンバーシップ（誰がどのロールで所属するか）は関連テーブルで管理し、
//!   エンティティ本体には含めない

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::value_objects::GroupName;

define_uuid_id! {
    /// 組織 ID
    pub struct OrganizationId;
}

define_uuid_id! {
    /// 部門 ID
    pub struct DepartmentId;
}

/// グループ内ロール
///
/// 組織・チームのメンバーシップで共通に使用する。
/// `Admin` はそのグループの管理操作（更新・削除・メンバー管理）が可能。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupRole {
    Member,
    Admin,
}

impl GroupRole {
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

/// 組織（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    id:         OrganizationId,
    name:       GroupName,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: GroupName, now: DateTime<Utc>) -> Self {
        Self {
            id: OrganizationId::new(),
            name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_db(
        id: OrganizationId,
        name: GroupName,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &OrganizationId {
        &self.id
    }

    pub fn name(&self) -> &GroupName {
        &self.name
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    /// 名前を変更した新しいインスタンスを返す
    pub fn with_name(self, name: GroupName, now: DateTime<Utc>) -> Self {
        Self {
            name,
            updated_at: now,
            ..self
        }
    }
}

/// 部門（エンティティ）
///
/// 組織の下位グループ。チームをさらに束ねる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    id:              DepartmentId,
    organization_id: OrganizationId,
    name:            GroupName,
    created_at:      DateTime<Utc>,
    updated_at:      DateTime<Utc>,
}

impl Department {
    pub fn new(
        organization_id: OrganizationId,
        name: GroupName,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DepartmentId::new(),
            organization_id,
            name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_db(
        id: DepartmentId,
        organization_id: OrganizationId,
        name: GroupName,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            name,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &DepartmentId {
        &self.id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn name(&self) -> &GroupName {
        &self.name
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    pub fn with_name(self, name: GroupName, now: DateTime<Utc>) -> Self {
        Self {
            name,
            updated_at: now,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_組織の名前を変更できる() {
        let now = Utc::now();
        let org = Organization::new(GroupName::new("アクメ商事").unwrap(), now);
        let original_id = org.id().clone();

        let later = now + chrono::Duration::minutes(5);
        let renamed = org.with_name(GroupName::new("アクメ工業").unwrap(), later);

        assert_eq!(renamed.id(), &original_id);
        assert_eq!(renamed.name().as_str(), "アクメ工業");
        assert_eq!(renamed.updated_at(), &later);
    }

    #[test]
    fn test_部門は組織に属する() {
        let now = Utc::now();
        let org_id = OrganizationId::new();
        let dept = Department::new(org_id.clone(), GroupName::new("開発部").unwrap(), now);

        assert_eq!(dept.organization_id(), &org_id);
    }

    #[rstest]
    #[case(GroupRole::Member, "member", false)]
    #[case(GroupRole::Admin, "admin", true)]
    fn test_グループロールの文字列表現と権限(
        #[case] role: GroupRole,
        #[case] expected: &str,
        #[case] is_admin: bool,
    ) {
        assert_eq!(role.to_string(), expected);
        assert_eq!(expected.parse::<GroupRole>().unwrap(), role);
        assert_eq!(role.is_admin(), is_admin);
    }
}

//! # OrganizationRepository
//!
//! 組織・部門とそのメンバーシップの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - 組織の作成は「組織行の INSERT + 作成者を管理者として登録」を
//!   1 トランザクションで行う
//! - メンバー一覧は N+1 を避けるため users と JOIN して取得する
//! - 部門は組織の子リソースとしてこのリポジトリで扱う

use async_trait::async_trait;
use kaizenboard_domain::{
    org::{Department, DepartmentId, GroupRole, Organization, OrganizationId},
    user::UserId,
    value_objects::GroupName,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::{error::InfraError, repository::map_unique_violation};

/// 組織メンバー（一覧表示用）
#[derive(Debug, Clone)]
pub struct OrganizationMember {
    pub user_id: UserId,
    pub name:    String,
    pub email:   Option<String>,
    pub role:    GroupRole,
}

/// 組織リポジトリトレイト
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// 組織を保存し、作成者を管理者として登録する
    async fn insert(
        &self,
        org: &Organization,
        creator_id: &UserId,
    ) -> Result<(), InfraError>;

    /// ID で組織を検索する
    async fn find_by_id(&self, id: &OrganizationId)
    -> Result<Option<Organization>, InfraError>;

    /// ユーザーが所属する組織一覧を取得する
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Organization, GroupRole)>, i64), InfraError>;

    /// 組織を更新する
    async fn update(&self, org: &Organization) -> Result<(), InfraError>;

    /// 組織を削除する
    ///
    /// 部門・組織直下チーム・メンバーシップは DB のカスケードで削除される。
    async fn delete(&self, id: &OrganizationId) -> Result<(), InfraError>;

    /// 組織のメンバー一覧を取得する
    async fn list_members(
        &self,
        id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<OrganizationMember>, i64), InfraError>;

    /// メンバーを追加またはロール変更する
    async fn upsert_member(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), InfraError>;

    /// メンバーを削除する
    async fn remove_member(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), InfraError>;

    /// ユーザーの組織内ロールを取得する
    ///
    /// メンバーでなければ `None` を返す。
    async fn find_member_role(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<Option<GroupRole>, InfraError>;

    /// 組織の管理者数を取得する
    ///
    /// 最後の管理者の削除・降格を防ぐ判定に使用する。
    async fn count_admins(&self, id: &OrganizationId) -> Result<i64, InfraError>;

    /// 部門を保存する
    async fn insert_department(&self, dept: &Department) -> Result<(), InfraError>;

    /// ID で部門を検索する
    async fn find_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Option<Department>, InfraError>;

    /// 組織の部門一覧を取得する
    async fn list_departments(
        &self,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Department>, i64), InfraError>;

    /// 部門を更新する
    async fn update_department(&self, dept: &Department) -> Result<(), InfraError>;

    /// 部門を削除する
    ///
    /// 部門配下チームは DB のカスケードで削除される。
    async fn delete_department(&self, id: &DepartmentId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の OrganizationRepository
#[derive(Debug, Clone)]
pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_org_row(row: &PgRow) -> Result<Organization, InfraError> {
    Ok(Organization::from_db(
        OrganizationId::from_uuid(row.try_get("id")?),
        GroupName::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn map_dept_row(row: &PgRow) -> Result<Department, InfraError> {
    Ok(Department::from_db(
        DepartmentId::from_uuid(row.try_get("id")?),
        OrganizationId::from_uuid(row.try_get("organization_id")?),
        GroupName::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn parse_role(value: String) -> Result<GroupRole, InfraError> {
    value
        .parse::<GroupRole>()
        .map_err(|e| InfraError::unexpected(e.to_string()))
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn insert(
        &self,
        org: &Organization,
        creator_id: &UserId,
    ) -> Result<(), InfraError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(org.id().as_uuid())
        .bind(org.name().as_str())
        .bind(org.created_at())
        .bind(org.updated_at())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(org.id().as_uuid())
        .bind(creator_id.as_uuid())
        .bind(GroupRole::Admin.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, InfraError> {
        let row = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_org_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Organization, GroupRole)>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT o.id, o.name, o.created_at, o.updated_at, m.role
            FROM organizations o
            INNER JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.created_at
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut orgs = Vec::with_capacity(rows.len());
        for row in &rows {
            let org = map_org_row(row)?;
            let role = parse_role(row.try_get("role")?)?;
            orgs.push((org, role));
        }

        Ok((orgs, total))
    }

    async fn update(&self, org: &Organization) -> Result<(), InfraError> {
        sqlx::query("UPDATE organizations SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(org.id().as_uuid())
            .bind(org.name().as_str())
            .bind(org.updated_at())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: &OrganizationId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_members(
        &self,
        id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<OrganizationMember>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.name, u.email, m.role
            FROM organization_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY u.name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(OrganizationMember {
                user_id: UserId::from_uuid(row.try_get("user_id")?),
                name:    row.try_get("name")?,
                email:   row.try_get("email")?,
                role:    parse_role(row.try_get("role")?)?,
            });
        }

        Ok((members, total))
    }

    async fn upsert_member(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (organization_id, user_id)
            DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(role.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_member(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_member_role(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<Option<GroupRole>, InfraError> {
        let row = sqlx::query(
            "SELECT role FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(parse_role(row.try_get("role")?)?)),
            None => Ok(None),
        }
    }

    async fn count_admins(&self, id: &OrganizationId) -> Result<i64, InfraError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = $1 AND role = 'admin'",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn insert_department(&self, dept: &Department) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO departments (id, organization_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(dept.id().as_uuid())
        .bind(dept.organization_id().as_uuid())
        .bind(dept.name().as_str())
        .bind(dept.created_at())
        .bind(dept.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Department", dept.id().to_string()))?;

        Ok(())
    }

    async fn find_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Option<Department>, InfraError> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, name, created_at, updated_at
            FROM departments WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_dept_row).transpose()
    }

    async fn list_departments(
        &self,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Department>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM departments WHERE organization_id = $1",
        )
        .bind(org_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, name, created_at, updated_at
            FROM departments
            WHERE organization_id = $1
            ORDER BY created_at
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(org_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let depts = rows.iter().map(map_dept_row).collect::<Result<Vec<_>, _>>()?;

        Ok((depts, total))
    }

    async fn update_department(&self, dept: &Department) -> Result<(), InfraError> {
        sqlx::query("UPDATE departments SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(dept.id().as_uuid())
            .bind(dept.name().as_str())
            .bind(dept.updated_at())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_department(&self, id: &DepartmentId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! # TeamRepository
//!
//! チームとそのメンバーシップの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - チームの作成は「チーム行の INSERT + 作成者を管理者として登録」を
//!   1 トランザクションで行う
//! - 組織・部門スコープの一覧取得をそれぞれ提供する

use async_trait::async_trait;
use kaizenboard_domain::{
    org::{DepartmentId, GroupRole, OrganizationId},
    team::{Team, TeamId},
    user::UserId,
    value_objects::GroupName,
};
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::error::InfraError;

/// チームメンバー（一覧表示用）
#[derive(Debug, Clone)]
pub struct TeamMember {
    pub user_id: UserId,
    pub name:    String,
    pub email:   Option<String>,
    pub role:    GroupRole,
}

/// チームリポジトリトレイト
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// チームを保存し、作成者を管理者として登録する
    async fn insert(&self, team: &Team, creator_id: &UserId) -> Result<(), InfraError>;

    /// ID でチームを検索する
    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, InfraError>;

    /// ユーザーが所属するチーム一覧を取得する
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Team, GroupRole)>, i64), InfraError>;

    /// 組織直下のチーム一覧を取得する
    async fn list_for_organization(
        &self,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), InfraError>;

    /// 部門配下のチーム一覧を取得する
    async fn list_for_department(
        &self,
        dept_id: &DepartmentId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), InfraError>;

    /// チームを更新する
    async fn update(&self, team: &Team) -> Result<(), InfraError>;

    /// チームを削除する
    ///
    /// メンバーシップ・チェックインは DB のカスケードで削除される。
    async fn delete(&self, id: &TeamId) -> Result<(), InfraError>;

    /// チームのメンバー一覧を取得する
    async fn list_members(
        &self,
        id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TeamMember>, i64), InfraError>;

    /// メンバーを追加またはロール変更する
    async fn upsert_member(
        &self,
        id: &TeamId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), InfraError>;

    /// メンバーを削除する
    async fn remove_member(&self, id: &TeamId, user_id: &UserId) -> Result<(), InfraError>;

    /// ユーザーのチーム内ロールを取得する
    ///
    /// メンバーでなければ `None` を返す。
    async fn find_member_role(
        &self,
        id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<GroupRole>, InfraError>;
}

/// PostgreSQL 実装の TeamRepository
#[derive(Debug, Clone)]
pub struct PostgresTeamRepository {
    pool: PgPool,
}

impl PostgresTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, name, organization_id, department_id, created_at, updated_at";

fn map_row(row: &PgRow) -> Result<Team, InfraError> {
    Ok(Team::from_db(
        TeamId::from_uuid(row.try_get("id")?),
        GroupName::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get::<Option<uuid::Uuid>, _>("organization_id")?
            .map(OrganizationId::from_uuid),
        row.try_get::<Option<uuid::Uuid>, _>("department_id")?
            .map(DepartmentId::from_uuid),
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
impl TeamRepository for PostgresTeamRepository {
    async fn insert(&self, team: &Team, creator_id: &UserId) -> Result<(), InfraError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teams (id, name, organization_id, department_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(team.id().as_uuid())
        .bind(team.name().as_str())
        .bind(team.organization_id().map(OrganizationId::as_uuid))
        .bind(team.department_id().map(DepartmentId::as_uuid))
        .bind(team.created_at())
        .bind(team.updated_at())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(team.id().as_uuid())
        .bind(creator_id.as_uuid())
        .bind(GroupRole::Admin.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM teams WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Team, GroupRole)>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM team_members WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.organization_id, t.department_id,
                   t.created_at, t.updated_at, m.role
            FROM teams t
            INNER JOIN team_members m ON m.team_id = t.id
            WHERE m.user_id = $1
            ORDER BY t.created_at
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut teams = Vec::with_capacity(rows.len());
        for row in &rows {
            let team = map_row(row)?;
            let role = parse_role(row.try_get("role")?)?;
            teams.push((team, role));
        }

        Ok((teams, total))
    }

    async fn list_for_organization(
        &self,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM teams WHERE organization_id = $1 AND department_id IS NULL",
        )
        .bind(org_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM teams
            WHERE organization_id = $1 AND department_id IS NULL
            ORDER BY created_at
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(org_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let teams = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((teams, total))
    }

    async fn list_for_department(
        &self,
        dept_id: &DepartmentId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM teams WHERE department_id = $1",
        )
        .bind(dept_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM teams
            WHERE department_id = $1
            ORDER BY created_at
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(dept_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let teams = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;

        Ok((teams, total))
    }

    async fn update(&self, team: &Team) -> Result<(), InfraError> {
        sqlx::query("UPDATE teams SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(team.id().as_uuid())
            .bind(team.name().as_str())
            .bind(team.updated_at())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: &TeamId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_members(
        &self,
        id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TeamMember>, i64), InfraError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM team_members WHERE team_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.name, u.email, m.role
            FROM team_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.team_id = $1
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
            members.push(TeamMember {
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
        id: &TeamId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id, user_id)
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

    async fn remove_member(&self, id: &TeamId, user_id: &UserId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_member_role(
        &self,
        id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<GroupRole>, InfraError> {
        let row = sqlx::query(
            "SELECT role FROM team_members WHERE team_id = $1 AND user_id = $2",
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
}

//! # ハンドラテスト用のスタブとフィクスチャ
//!
//! リポジトリ・セッション・パスワード検証のインメモリ実装を提供する。
//! すべて `Mutex` で状態を持ち、複数リクエストにまたがるテストにも使える。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::body::Body;
use chrono::{DateTime, NaiveDate, Utc};
use kaizenboard_domain::{
    checkin::{Checkin, CheckinId},
    clock::{Clock, FixedClock},
    org::{Department, DepartmentId, GroupRole, Organization, OrganizationId},
    password::{PasswordHash, PasswordVerifyResult, PlainPassword},
    poker::{PokerGame, PokerGameId},
    retro::{Retro, RetroId},
    storyboard::{Storyboard, StoryboardId},
    subscription::{Subscription, SubscriptionId},
    team::{Team, TeamId},
    user::{Email, User, UserId, UserRole},
    value_objects::UserName,
};
use kaizenboard_infra::{
    InfraError,
    event_bus::{SessionChannel, SessionEvent, SessionEventBus},
    password::{PasswordChecker, PasswordHashService},
    repository::{
        ApplicationStats,
        CheckinRepository,
        CredentialsRepository,
        OrganizationMember,
        OrganizationRepository,
        PokerRepository,
        RetroRepository,
        StatsRepository,
        StoryboardRepository,
        SubscriptionRepository,
        TeamMember,
        TeamRepository,
        UserRepository,
    },
    session::{SessionData, SessionManager},
};
use uuid::Uuid;

// --- 時刻 ---

pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(fixed_now()))
}

// --- ユーザーフィクスチャ ---

pub fn registered_user(email: &str) -> User {
    User::new_registered(
        UserName::new("山田太郎").unwrap(),
        Email::new(email).unwrap(),
        fixed_now(),
    )
}

pub fn guest_user(name: &str) -> User {
    User::new_guest(UserName::new(name).unwrap(), fixed_now())
}

pub fn admin_user(email: &str) -> User {
    registered_user(email).promoted(fixed_now()).unwrap()
}

pub fn session_for(user: &User) -> SessionData {
    SessionData::new(
        user.id().clone(),
        user.email().map(|e| e.as_str().to_string()),
        user.name().as_str().to_string(),
        user.role(),
    )
}

// --- レスポンスボディ ---

pub async fn response_body<T: serde::de::DeserializeOwned>(
    response: axum::http::Response<Body>,
) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- セッション ---

/// インメモリのセッションマネージャ
pub struct StubSessionManager {
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl StubSessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 既知のセッション ID でセッションを登録する
    pub fn with_session(session_id: &str, data: SessionData) -> Self {
        let manager = Self::new();
        manager
            .sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), data);
        manager
    }
}

#[async_trait]
impl SessionManager for StubSessionManager {
    async fn create(&self, data: &SessionData) -> Result<String, InfraError> {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), data.clone());
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), InfraError> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), InfraError> {
        self.sessions
            .lock()
            .unwrap()
            .retain(|_, data| data.user_id() != user_id);
        Ok(())
    }

    async fn get_ttl(&self, session_id: &str) -> Result<Option<i64>, InfraError> {
        let exists = self.sessions.lock().unwrap().contains_key(session_id);
        Ok(exists.then_some(86400))
    }
}

// --- パスワード ---

/// Argon2 を迂回する高速なスタブ実装
///
/// `stub:{平文}` 形式の疑似ハッシュで一致判定する。
pub struct StubPasswordService;

impl StubPasswordService {
    pub fn hash_of(plain: &str) -> PasswordHash {
        PasswordHash::new(format!("stub:{plain}"))
    }
}

impl PasswordHashService for StubPasswordService {
    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError> {
        Ok(Self::hash_of(password.as_str()))
    }
}

impl PasswordChecker for StubPasswordService {
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError> {
        Ok(PasswordVerifyResult::from(
            hash.as_str() == format!("stub:{}", password.as_str()),
        ))
    }
}

// --- ユーザー・認証情報 ---

/// ユーザーと認証情報のインメモリストア
pub struct StubUserStore {
    users:       Mutex<Vec<User>>,
    credentials: Mutex<HashMap<UserId, PasswordHash>>,
}

impl StubUserStore {
    pub fn empty() -> Self {
        Self {
            users:       Mutex::new(Vec::new()),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users:       Mutex::new(users),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    /// 各ユーザーに同一パスワードの認証情報を付与する
    pub fn with_credentials(users: Vec<User>, password: &str) -> Self {
        let hash = StubPasswordService::hash_of(password);
        let credentials = users
            .iter()
            .map(|u| (u.id().clone(), hash.clone()))
            .collect();
        Self {
            users:       Mutex::new(users),
            credentials: Mutex::new(credentials),
        }
    }
}

#[async_trait]
impl UserRepository for StubUserStore {
    async fn insert(&self, user: &User) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = user.email() {
            if users.iter().any(|u| u.email() == Some(email)) {
                return Err(InfraError::conflict("User", email.as_str()));
            }
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id() == id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email() == Some(email))
            .cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), InfraError> {
        let users = self.users.lock().unwrap();
        let total = users.len() as i64;
        let page = users
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update(&self, user: &User) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if let Some(slot) = users.iter_mut().find(|u| u.id() == user.id()) {
            *slot = user.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<(), InfraError> {
        self.users.lock().unwrap().retain(|u| u.id() != id);
        self.credentials.lock().unwrap().remove(id);
        Ok(())
    }
}

#[async_trait]
impl CredentialsRepository for StubUserStore {
    async fn upsert(&self, user_id: &UserId, hash: &PasswordHash) -> Result<(), InfraError> {
        self.credentials
            .lock()
            .unwrap()
            .insert(user_id.clone(), hash.clone());
        Ok(())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PasswordHash>, InfraError> {
        Ok(self.credentials.lock().unwrap().get(user_id).cloned())
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), InfraError> {
        self.credentials.lock().unwrap().remove(user_id);
        Ok(())
    }
}

// --- 組織・部門 ---

/// 組織・部門・メンバーシップのインメモリストア
pub struct StubOrgStore {
    orgs:        Mutex<Vec<Organization>>,
    departments: Mutex<Vec<Department>>,
    members:     Mutex<Vec<(OrganizationId, UserId, GroupRole)>>,
}

impl StubOrgStore {
    pub fn empty() -> Self {
        Self {
            orgs:        Mutex::new(Vec::new()),
            departments: Mutex::new(Vec::new()),
            members:     Mutex::new(Vec::new()),
        }
    }

    pub fn with_org(org: Organization, members: Vec<(UserId, GroupRole)>) -> Self {
        let org_id = org.id().clone();
        let store = Self::empty();
        store.orgs.lock().unwrap().push(org);
        store.members.lock().unwrap().extend(
            members
                .into_iter()
                .map(|(user_id, role)| (org_id.clone(), user_id, role)),
        );
        store
    }

    pub fn add_department(&self, dept: Department) {
        self.departments.lock().unwrap().push(dept);
    }
}

#[async_trait]
impl OrganizationRepository for StubOrgStore {
    async fn insert(
        &self,
        org: &Organization,
        creator_id: &UserId,
    ) -> Result<(), InfraError> {
        self.orgs.lock().unwrap().push(org.clone());
        self.members.lock().unwrap().push((
            org.id().clone(),
            creator_id.clone(),
            GroupRole::Admin,
        ));
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, InfraError> {
        Ok(self.orgs.lock().unwrap().iter().find(|o| o.id() == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Organization, GroupRole)>, i64), InfraError> {
        let members = self.members.lock().unwrap();
        let orgs = self.orgs.lock().unwrap();
        let mine: Vec<(Organization, GroupRole)> = members
            .iter()
            .filter(|(_, u, _)| u == user_id)
            .filter_map(|(o, _, role)| {
                orgs.iter().find(|org| org.id() == o).map(|org| (org.clone(), *role))
            })
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, org: &Organization) -> Result<(), InfraError> {
        let mut orgs = self.orgs.lock().unwrap();
        if let Some(slot) = orgs.iter_mut().find(|o| o.id() == org.id()) {
            *slot = org.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &OrganizationId) -> Result<(), InfraError> {
        self.orgs.lock().unwrap().retain(|o| o.id() != id);
        self.members.lock().unwrap().retain(|(o, _, _)| o != id);
        self.departments
            .lock()
            .unwrap()
            .retain(|d| d.organization_id() != id);
        Ok(())
    }

    async fn list_members(
        &self,
        id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<OrganizationMember>, i64), InfraError> {
        let members = self.members.lock().unwrap();
        let mine: Vec<OrganizationMember> = members
            .iter()
            .filter(|(o, _, _)| o == id)
            .map(|(_, user_id, role)| OrganizationMember {
                user_id: user_id.clone(),
                name:    "テストユーザー".to_string(),
                email:   Some("user@example.com".to_string()),
                role:    *role,
            })
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn upsert_member(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), InfraError> {
        let mut members = self.members.lock().unwrap();
        if let Some(slot) = members
            .iter_mut()
            .find(|(o, u, _)| o == id && u == user_id)
        {
            slot.2 = role;
        } else {
            members.push((id.clone(), user_id.clone(), role));
        }
        Ok(())
    }

    async fn remove_member(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), InfraError> {
        self.members
            .lock()
            .unwrap()
            .retain(|(o, u, _)| !(o == id && u == user_id));
        Ok(())
    }

    async fn find_member_role(
        &self,
        id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<Option<GroupRole>, InfraError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|(o, u, _)| o == id && u == user_id)
            .map(|(_, _, role)| *role))
    }

    async fn count_admins(&self, id: &OrganizationId) -> Result<i64, InfraError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _, role)| o == id && role.is_admin())
            .count() as i64)
    }

    async fn insert_department(&self, dept: &Department) -> Result<(), InfraError> {
        self.departments.lock().unwrap().push(dept.clone());
        Ok(())
    }

    async fn find_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Option<Department>, InfraError> {
        Ok(self
            .departments
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id() == id)
            .cloned())
    }

    async fn list_departments(
        &self,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Department>, i64), InfraError> {
        let departments = self.departments.lock().unwrap();
        let mine: Vec<Department> = departments
            .iter()
            .filter(|d| d.organization_id() == org_id)
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_department(&self, dept: &Department) -> Result<(), InfraError> {
        let mut departments = self.departments.lock().unwrap();
        if let Some(slot) = departments.iter_mut().find(|d| d.id() == dept.id()) {
            *slot = dept.clone();
        }
        Ok(())
    }

    async fn delete_department(&self, id: &DepartmentId) -> Result<(), InfraError> {
        self.departments.lock().unwrap().retain(|d| d.id() != id);
        Ok(())
    }
}

// --- チーム ---

/// チームとメンバーシップのインメモリストア
pub struct StubTeamStore {
    teams:   Mutex<Vec<Team>>,
    members: Mutex<Vec<(TeamId, UserId, GroupRole)>>,
}

impl StubTeamStore {
    pub fn empty() -> Self {
        Self {
            teams:   Mutex::new(Vec::new()),
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn with_team(team: Team, members: Vec<(UserId, GroupRole)>) -> Self {
        let team_id = team.id().clone();
        let store = Self::empty();
        store.teams.lock().unwrap().push(team);
        store.members.lock().unwrap().extend(
            members
                .into_iter()
                .map(|(user_id, role)| (team_id.clone(), user_id, role)),
        );
        store
    }
}

#[async_trait]
impl TeamRepository for StubTeamStore {
    async fn insert(&self, team: &Team, creator_id: &UserId) -> Result<(), InfraError> {
        self.teams.lock().unwrap().push(team.clone());
        self.members.lock().unwrap().push((
            team.id().clone(),
            creator_id.clone(),
            GroupRole::Admin,
        ));
        Ok(())
    }

    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, InfraError> {
        Ok(self.teams.lock().unwrap().iter().find(|t| t.id() == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(Team, GroupRole)>, i64), InfraError> {
        let members = self.members.lock().unwrap();
        let teams = self.teams.lock().unwrap();
        let mine: Vec<(Team, GroupRole)> = members
            .iter()
            .filter(|(_, u, _)| u == user_id)
            .filter_map(|(t, _, role)| {
                teams.iter().find(|team| team.id() == t).map(|team| (team.clone(), *role))
            })
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_for_organization(
        &self,
        org_id: &OrganizationId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), InfraError> {
        let teams = self.teams.lock().unwrap();
        let mine: Vec<Team> = teams
            .iter()
            .filter(|t| t.organization_id() == Some(org_id) && t.department_id().is_none())
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_for_department(
        &self,
        dept_id: &DepartmentId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Team>, i64), InfraError> {
        let teams = self.teams.lock().unwrap();
        let mine: Vec<Team> = teams
            .iter()
            .filter(|t| t.department_id() == Some(dept_id))
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, team: &Team) -> Result<(), InfraError> {
        let mut teams = self.teams.lock().unwrap();
        if let Some(slot) = teams.iter_mut().find(|t| t.id() == team.id()) {
            *slot = team.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &TeamId) -> Result<(), InfraError> {
        self.teams.lock().unwrap().retain(|t| t.id() != id);
        self.members.lock().unwrap().retain(|(t, _, _)| t != id);
        Ok(())
    }

    async fn list_members(
        &self,
        id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TeamMember>, i64), InfraError> {
        let members = self.members.lock().unwrap();
        let mine: Vec<TeamMember> = members
            .iter()
            .filter(|(t, _, _)| t == id)
            .map(|(_, user_id, role)| TeamMember {
                user_id: user_id.clone(),
                name:    "テストユーザー".to_string(),
                email:   Some("user@example.com".to_string()),
                role:    *role,
            })
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn upsert_member(
        &self,
        id: &TeamId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), InfraError> {
        let mut members = self.members.lock().unwrap();
        if let Some(slot) = members
            .iter_mut()
            .find(|(t, u, _)| t == id && u == user_id)
        {
            slot.2 = role;
        } else {
            members.push((id.clone(), user_id.clone(), role));
        }
        Ok(())
    }

    async fn remove_member(&self, id: &TeamId, user_id: &UserId) -> Result<(), InfraError> {
        self.members
            .lock()
            .unwrap()
            .retain(|(t, u, _)| !(t == id && u == user_id));
        Ok(())
    }

    async fn find_member_role(
        &self,
        id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<GroupRole>, InfraError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|(t, u, _)| t == id && u == user_id)
            .map(|(_, _, role)| *role))
    }
}

// --- セッションエンティティ（ポーカー・レトロ・ストーリーボード） ---

/// ポーカーセッションのインメモリストア
pub struct StubPokerStore {
    games: Mutex<Vec<PokerGame>>,
}

impl StubPokerStore {
    pub fn empty() -> Self {
        Self {
            games: Mutex::new(Vec::new()),
        }
    }

    pub fn with_games(games: Vec<PokerGame>) -> Self {
        Self {
            games: Mutex::new(games),
        }
    }
}

#[async_trait]
impl PokerRepository for StubPokerStore {
    async fn insert(&self, game: &PokerGame) -> Result<(), InfraError> {
        self.games.lock().unwrap().push(game.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PokerGameId) -> Result<Option<PokerGame>, InfraError> {
        Ok(self.games.lock().unwrap().iter().find(|g| g.id() == id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), InfraError> {
        let games = self.games.lock().unwrap();
        let mine: Vec<PokerGame> = games
            .iter()
            .filter(|g| g.owner_id() == owner_id)
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PokerGame>, i64), InfraError> {
        let games = self.games.lock().unwrap();
        let mine: Vec<PokerGame> = games
            .iter()
            .filter(|g| g.team_id() == Some(team_id))
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, id: &PokerGameId) -> Result<(), InfraError> {
        self.games.lock().unwrap().retain(|g| g.id() != id);
        Ok(())
    }
}

/// レトロセッションのインメモリストア
pub struct StubRetroStore {
    retros: Mutex<Vec<Retro>>,
}

impl StubRetroStore {
    pub fn empty() -> Self {
        Self {
            retros: Mutex::new(Vec::new()),
        }
    }

    pub fn with_retros(retros: Vec<Retro>) -> Self {
        Self {
            retros: Mutex::new(retros),
        }
    }
}

#[async_trait]
impl RetroRepository for StubRetroStore {
    async fn insert(&self, retro: &Retro) -> Result<(), InfraError> {
        self.retros.lock().unwrap().push(retro.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &RetroId) -> Result<Option<Retro>, InfraError> {
        Ok(self.retros.lock().unwrap().iter().find(|r| r.id() == id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), InfraError> {
        let retros = self.retros.lock().unwrap();
        let mine: Vec<Retro> = retros
            .iter()
            .filter(|r| r.owner_id() == owner_id)
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Retro>, i64), InfraError> {
        let retros = self.retros.lock().unwrap();
        let mine: Vec<Retro> = retros
            .iter()
            .filter(|r| r.team_id() == Some(team_id))
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, retro: &Retro) -> Result<(), InfraError> {
        let mut retros = self.retros.lock().unwrap();
        if let Some(slot) = retros.iter_mut().find(|r| r.id() == retro.id()) {
            *slot = retro.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &RetroId) -> Result<(), InfraError> {
        self.retros.lock().unwrap().retain(|r| r.id() != id);
        Ok(())
    }
}

/// ストーリーボードのインメモリストア
pub struct StubStoryboardStore {
    boards: Mutex<Vec<Storyboard>>,
}

impl StubStoryboardStore {
    pub fn empty() -> Self {
        Self {
            boards: Mutex::new(Vec::new()),
        }
    }

    pub fn with_boards(boards: Vec<Storyboard>) -> Self {
        Self {
            boards: Mutex::new(boards),
        }
    }
}

#[async_trait]
impl StoryboardRepository for StubStoryboardStore {
    async fn insert(&self, board: &Storyboard) -> Result<(), InfraError> {
        self.boards.lock().unwrap().push(board.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &StoryboardId) -> Result<Option<Storyboard>, InfraError> {
        Ok(self.boards.lock().unwrap().iter().find(|b| b.id() == id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), InfraError> {
        let boards = self.boards.lock().unwrap();
        let mine: Vec<Storyboard> = boards
            .iter()
            .filter(|b| b.owner_id() == owner_id)
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_for_team(
        &self,
        team_id: &TeamId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Storyboard>, i64), InfraError> {
        let boards = self.boards.lock().unwrap();
        let mine: Vec<Storyboard> = boards
            .iter()
            .filter(|b| b.team_id() == Some(team_id))
            .cloned()
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, id: &StoryboardId) -> Result<(), InfraError> {
        self.boards.lock().unwrap().retain(|b| b.id() != id);
        Ok(())
    }
}

// --- チェックイン ---

/// チェックインのインメモリストア
///
/// (チーム, ユーザー, 日付) の一意制約を再現する。
pub struct StubCheckinStore {
    checkins: Mutex<Vec<Checkin>>,
}

impl StubCheckinStore {
    pub fn empty() -> Self {
        Self {
            checkins: Mutex::new(Vec::new()),
        }
    }

    pub fn with_checkins(checkins: Vec<Checkin>) -> Self {
        Self {
            checkins: Mutex::new(checkins),
        }
    }
}

#[async_trait]
impl CheckinRepository for StubCheckinStore {
    async fn insert(&self, checkin: &Checkin) -> Result<(), InfraError> {
        let mut checkins = self.checkins.lock().unwrap();
        let duplicate = checkins.iter().any(|c| {
            c.team_id() == checkin.team_id()
                && c.user_id() == checkin.user_id()
                && c.checkin_date() == checkin.checkin_date()
        });
        if duplicate {
            return Err(InfraError::conflict(
                "Checkin",
                checkin.checkin_date().to_string(),
            ));
        }
        checkins.push(checkin.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CheckinId) -> Result<Option<Checkin>, InfraError> {
        Ok(self
            .checkins
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned())
    }

    async fn list_for_team_on(
        &self,
        team_id: &TeamId,
        date: NaiveDate,
    ) -> Result<Vec<Checkin>, InfraError> {
        Ok(self
            .checkins
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.team_id() == team_id && c.checkin_date() == date)
            .cloned()
            .collect())
    }

    async fn update(&self, checkin: &Checkin) -> Result<(), InfraError> {
        let mut checkins = self.checkins.lock().unwrap();
        if let Some(slot) = checkins.iter_mut().find(|c| c.id() == checkin.id()) {
            *slot = checkin.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &CheckinId) -> Result<(), InfraError> {
        self.checkins.lock().unwrap().retain(|c| c.id() != id);
        Ok(())
    }
}

// --- サブスクリプション ---

/// サブスクリプションのインメモリストア
pub struct StubSubscriptionStore {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl StubSubscriptionStore {
    pub fn empty() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for StubSubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), InfraError> {
        self.subscriptions.lock().unwrap().push(subscription.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, InfraError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id() == id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, InfraError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Subscription>, i64), InfraError> {
        let subscriptions = self.subscriptions.lock().unwrap();
        let total = subscriptions.len() as i64;
        let page = subscriptions
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), InfraError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(slot) = subscriptions.iter_mut().find(|s| s.id() == subscription.id()) {
            *slot = subscription.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), InfraError> {
        self.subscriptions.lock().unwrap().retain(|s| s.id() != id);
        Ok(())
    }
}

// --- 集計 ---

/// 固定値を返す集計リポジトリ
pub struct StubStatsRepository;

#[async_trait]
impl StatsRepository for StubStatsRepository {
    async fn application_stats(&self) -> Result<ApplicationStats, InfraError> {
        Ok(ApplicationStats {
            registered_user_count: 12,
            guest_user_count:      3,
            organization_count:    2,
            department_count:      4,
            team_count:            7,
            poker_count:           20,
            retro_count:           15,
            storyboard_count:      5,
            checkin_count:         88,
            subscription_count:    6,
        })
    }
}

// --- イベント配信 ---

/// 配信されたイベントを記録するイベントバス
pub struct RecordingEventBus {
    published: Mutex<Vec<(SessionChannel, String, SessionEvent)>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<(SessionChannel, String, SessionEvent)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionEventBus for RecordingEventBus {
    async fn publish(
        &self,
        channel: SessionChannel,
        session_id: &str,
        event: &SessionEvent,
    ) -> Result<(), InfraError> {
        self.published
            .lock()
            .unwrap()
            .push((channel, session_id.to_string(), event.clone()));
        Ok(())
    }
}

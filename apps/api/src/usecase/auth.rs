//! # 認証ユースケース
//!
//! ユーザー登録・ゲスト作成・ログイン・ログアウトを実装する。
//!
//! ## タイミング攻撃対策
//!
//! 存在しないメールアドレスでのログイン試行でも、ダミーハッシュに対して
//! パスワード検証を実行する。検証の所要時間からメールアドレスの存在有無を
//! 推測されることを防ぐ。

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    password::{PasswordHash, PlainPassword},
    user::{Email, User},
    value_objects::UserName,
};
use kaizenboard_infra::{
    password::{PasswordChecker, PasswordHashService},
    repository::{CredentialsRepository, UserRepository},
    session::{SessionData, SessionManager},
};

use crate::error::ApiError;

/// タイミング攻撃対策用のダミーハッシュ
///
/// どのパスワードとも一致しない有効な Argon2id ハッシュ。
const DUMMY_HASH: &str = "$argon2id$v=19$m=65536,t=1,p=1$olntqw+EoVpwH4B1vUAI0A$5yCA1izLODgz8nQOInDGwbuQB/AS0sIQDwpmIilve5M";

/// 認証ユースケース
pub struct AuthUseCase {
    users:       Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialsRepository>,
    hasher:      Arc<dyn PasswordHashService>,
    checker:     Arc<dyn PasswordChecker>,
    sessions:    Arc<dyn SessionManager>,
    clock:       Arc<dyn Clock>,
}

impl AuthUseCase {
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialsRepository>,
        hasher: Arc<dyn PasswordHashService>,
        checker: Arc<dyn PasswordChecker>,
        sessions: Arc<dyn SessionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            credentials,
            hasher,
            checker,
            sessions,
            clock,
        }
    }

    /// ユーザーを登録し、セッションを作成する
    ///
    /// メールアドレスが既に使用されている場合は Conflict エラーを返す。
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), ApiError> {
        let name = UserName::new(name)?;
        let email = Email::new(email)?;
        let password = PlainPassword::parse(password)?;

        let now = self.clock.now();
        let user = User::new_registered(name, email, now);

        let hash = self.hasher.hash(&password)?;

        self.users.insert(&user).await.map_err(|e| {
            if e.as_conflict().is_some() {
                ApiError::Conflict("このメールアドレスは既に使用されています".to_string())
            } else {
                ApiError::Infra(e)
            }
        })?;
        self.credentials.upsert(user.id(), &hash).await?;

        let session_id = self.create_session(&user).await?;
        Ok((user, session_id))
    }

    /// ゲストユーザーを作成し、セッションを作成する
    ///
    /// ゲストは認証情報を持たず、セッションのみで識別される。
    pub async fn create_guest(&self, name: &str) -> Result<(User, String), ApiError> {
        let name = UserName::new(name)?;

        let now = self.clock.now();
        let user = User::new_guest(name, now);

        self.users.insert(&user).await?;

        let session_id = self.create_session(&user).await?;
        Ok((user, session_id))
    }

    /// ログインし、セッションを作成する
    ///
    /// 失敗理由（メールアドレス不明・パスワード不一致・削除済み）は
    /// 区別せず、一律 `AuthenticationFailed` を返す。
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), ApiError> {
        let email = Email::new(email).map_err(|_| ApiError::AuthenticationFailed)?;
        let password = PlainPassword::new(password);

        let user = self.users.find_by_email(&email).await?;

        let Some(user) = user else {
            // タイミング攻撃対策: ユーザーが存在しなくても検証を実行する
            let _ = self
                .checker
                .verify(&password, &PasswordHash::new(DUMMY_HASH));
            return Err(ApiError::AuthenticationFailed);
        };

        if !user.can_login() {
            let _ = self
                .checker
                .verify(&password, &PasswordHash::new(DUMMY_HASH));
            return Err(ApiError::AuthenticationFailed);
        }

        let hash = self
            .credentials
            .find_by_user_id(user.id())
            .await?
            .ok_or(ApiError::AuthenticationFailed)?;

        let result = self.checker.verify(&password, &hash)?;
        if !result.is_match() {
            return Err(ApiError::AuthenticationFailed);
        }

        let user = user.touched(self.clock.now());
        self.users.update(&user).await?;

        let session_id = self.create_session(&user).await?;
        Ok((user, session_id))
    }

    /// セッションを削除する（ログアウト）
    pub async fn logout(&self, session_id: &str) -> Result<(), ApiError> {
        self.sessions.delete(session_id).await?;
        Ok(())
    }

    /// セッションに対応するユーザーを取得する
    ///
    /// セッションは有効だがユーザーが削除済みの場合は 401 を返す。
    pub async fn current_user(&self, session: &SessionData) -> Result<User, ApiError> {
        self.users
            .find_by_id(session.user_id())
            .await?
            .ok_or(ApiError::Unauthorized)
    }

    async fn create_session(&self, user: &User) -> Result<String, ApiError> {
        let data = SessionData::new(
            user.id().clone(),
            user.email().map(|e| e.as_str().to_string()),
            user.name().as_str().to_string(),
            user.role(),
        );
        Ok(self.sessions.create(&data).await?)
    }
}

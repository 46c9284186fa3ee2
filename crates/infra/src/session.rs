//! # セッション管理
//!
//! Redis を使用したセッション管理を提供する。
//!
//! ## Redis キー設計
//!
//! | キー | 値 | TTL |
//! |-----|-----|-----|
//! | `session:{session_id}` | SessionData (JSON) | 86400秒（24時間） |
//! | `user_sessions:{user_id}` | セッション ID の SET | 86400秒（24時間） |
//!
//! `user_sessions` はユーザー削除時に全セッションを失効させるための
//! 逆引きインデックス。期限切れセッションの ID が残ることがあるが、
//! 削除時に存在しないキーを消しても害はない。
//!
//! ゲストユーザーもセッションのみで識別されるため、TTL 経過で
//! ゲストのアクセス手段は自然に失効する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kaizenboard_domain::user::{UserId, UserRole};
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::InfraError;

/// セッションの有効期限（秒）
/// 24時間 = 86400秒
const SESSION_TTL_SECONDS: u64 = 86400;

/// セッションデータ
///
/// Redis に JSON 形式で保存されるセッション情報。
/// ログイン・登録・ゲスト作成時に作成され、ログアウトまたは
/// TTL 経過で削除される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    user_id:    UserId,
    email:      Option<String>,
    name:       String,
    role:       UserRole,
    created_at: DateTime<Utc>,
}

impl SessionData {
    /// 新しいセッションデータを作成する
    pub fn new(
        user_id: UserId,
        email: Option<String>,
        name: String,
        role: UserRole,
    ) -> Self {
        Self {
            user_id,
            email,
            name,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// セッション管理トレイト
///
/// セッションの作成・取得・削除を行う。
/// 実装は Redis を使用する `RedisSessionManager` を参照。
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// セッションを作成し、セッション ID を返す
    ///
    /// # 戻り値
    ///
    /// 生成されたセッション ID（UUID v4）
    async fn create(&self, data: &SessionData) -> Result<String, InfraError>;

    /// セッションを取得する
    ///
    /// # 戻り値
    ///
    /// セッションが存在すれば `Some(SessionData)`、なければ `None`
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError>;

    /// セッションを削除する
    ///
    /// 存在しないセッションを削除しても成功とする。
    async fn delete(&self, session_id: &str) -> Result<(), InfraError>;

    /// ユーザーの全セッションを削除する
    ///
    /// アカウント削除時に、発行済みのセッションをすべて失効させる。
    async fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), InfraError>;

    /// セッションの TTL（残り秒数）を取得する（テスト用）
    async fn get_ttl(&self, session_id: &str) -> Result<Option<i64>, InfraError>;
}

/// Redis を使用したセッションマネージャ
pub struct RedisSessionManager {
    conn: ConnectionManager,
}

impl RedisSessionManager {
    /// 新しい RedisSessionManager を作成する
    ///
    /// # 引数
    ///
    /// - `redis_url`: Redis 接続 URL（例: `redis://localhost:6379`）
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// 既存の接続を共有して作成する
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// セッションキーを生成する
    fn session_key(session_id: &str) -> String {
        format!("session:{session_id}")
    }

    /// ユーザーのセッション ID 集合のキーを生成する
    fn user_sessions_key(user_id: &UserId) -> String {
        format!("user_sessions:{user_id}")
    }
}

#[async_trait]
impl SessionManager for RedisSessionManager {
    async fn create(&self, data: &SessionData) -> Result<String, InfraError> {
        // UUID v4 でセッション ID を生成（暗号論的に安全なランダム値）
        let session_id = Uuid::new_v4().to_string();
        let key = Self::session_key(&session_id);
        let json = serde_json::to_string(data)?;

        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(&key, json, SESSION_TTL_SECONDS).await?;

        let index_key = Self::user_sessions_key(data.user_id());
        let _: () = conn.sadd(&index_key, &session_id).await?;
        let _: () = conn.expire(&index_key, SESSION_TTL_SECONDS as i64).await?;

        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError> {
        let key = Self::session_key(session_id);
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(&key).await?;

        match result {
            Some(json) => {
                let data: SessionData = serde_json::from_str(&json)?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &str) -> Result<(), InfraError> {
        let key = Self::session_key(session_id);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&key).await?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), InfraError> {
        let index_key = Self::user_sessions_key(user_id);
        let mut conn = self.conn.clone();

        let session_ids: Vec<String> = conn.smembers(&index_key).await?;
        for session_id in &session_ids {
            let _: () = conn.del(Self::session_key(session_id)).await?;
        }
        let _: () = conn.del(&index_key).await?;

        Ok(())
    }

    async fn get_ttl(&self, session_id: &str) -> Result<Option<i64>, InfraError> {
        let key = Self::session_key(session_id);
        let mut conn = self.conn.clone();

        let ttl: i64 = conn.ttl(&key).await?;

        // TTL が -2 の場合はキーが存在しない、-1 の場合は TTL が設定されていない
        if ttl < 0 { Ok(None) } else { Ok(Some(ttl)) }
    }
}

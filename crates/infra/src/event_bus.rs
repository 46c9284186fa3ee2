//! # ライブセッションのイベント配信
//!
//! API 層からライブセッション（ポーカー、レトロ等の WebSocket 接続）へ
//! イベントを一方向に配信する。
//!
//! ## 設計方針
//!
//! - Redis の PUBLISH のみを使用する（配信は fire-and-forget）
//! - 購読側は WebSocket サーバーの責務であり、この層では扱わない
//! - セッション種別とセッション ID でチャンネルを分離する
//!
//! ## チャンネル設計
//!
//! | チャンネル | 例 |
//! |-----------|-----|
//! | `events:{session_type}:{session_id}` | `events:poker:0190-...` |

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use crate::InfraError;

/// 配信対象のライブセッション種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChannel {
    Poker,
    Retro,
    Storyboard,
}

impl SessionChannel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Poker => "poker",
            Self::Retro => "retro",
            Self::Storyboard => "storyboard",
        }
    }
}

/// ライブセッションに配信するイベント
///
/// `event_type` と `value` の解釈は WebSocket サーバー側に委ねる。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub event_type: String,
    pub user_id:    String,
    pub value:      serde_json::Value,
}

/// ライブセッションへのイベント配信トレイト
#[async_trait]
pub trait SessionEventBus: Send + Sync {
    /// イベントを配信する
    ///
    /// 購読者がいない場合も成功とする。
    async fn publish(
        &self,
        channel: SessionChannel,
        session_id: &str,
        event: &SessionEvent,
    ) -> Result<(), InfraError>;
}

/// Redis PUBLISH によるイベント配信の実装
pub struct RedisSessionEventBus {
    conn: ConnectionManager,
}

impl RedisSessionEventBus {
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// 既存の接続を共有して作成する
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn channel_key(channel: SessionChannel, session_id: &str) -> String {
        format!("events:{}:{}", channel.as_str(), session_id)
    }
}

#[async_trait]
impl SessionEventBus for RedisSessionEventBus {
    async fn publish(
        &self,
        channel: SessionChannel,
        session_id: &str,
        event: &SessionEvent,
    ) -> Result<(), InfraError> {
        let key = Self::channel_key(channel, session_id);
        let payload = serde_json::to_string(event)?;

        let mut conn = self.conn.clone();
        let _: () = redis::cmd("PUBLISH")
            .arg(&key)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        Ok(())
    }
}

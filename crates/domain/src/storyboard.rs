//! # ストーリーボード（エンティティ）
//!
//! ユーザーストーリーマッピングのセッションを表現する。
//!
//! ゴール・カラム・ストーリーカードのリアルタイム編集は WebSocket 層の
//! 責務であり、ここではセッションのメタデータのみを保持する。

use chrono::{DateTime, Utc};

use crate::{team::TeamId, user::UserId, value_objects::SessionTitle};

define_uuid_id! {
    /// ストーリーボードセッション ID
    pub struct StoryboardId;
}

/// ストーリーボードセッション（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storyboard {
    id:         StoryboardId,
    owner_id:   UserId,
    team_id:    Option<TeamId>,
    name:       SessionTitle,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Storyboard {
    pub fn new(
        owner_id: UserId,
        team_id: Option<TeamId>,
        name: SessionTitle,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StoryboardId::new(),
            owner_id,
            team_id,
            name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_db(
        id: StoryboardId,
        owner_id: UserId,
        team_id: Option<TeamId>,
        name: SessionTitle,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            team_id,
            name,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &StoryboardId {
        &self.id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn team_id(&self) -> Option<&TeamId> {
        self.team_id.as_ref()
    }

    pub fn name(&self) -> &SessionTitle {
        &self.name
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

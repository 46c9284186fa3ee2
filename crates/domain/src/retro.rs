//! # レトロスペクティブ（エンティティ）
//!
//! ふりかえりセッションを表現する。セッションはフェーズを順に進行する
//! 状態機械を持つ。
//!
//! ## フェーズ遷移
//!
//! ```text
//! Intro → Brainstorm → Group → Vote → Action → Done
//! ```
//!
//! 遷移は前方向に 1 段階ずつのみ許可する。`Done` は終端状態。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{DomainError, team::TeamId, user::UserId, value_objects::SessionTitle};

define_uuid_id! {
    /// レトロスペクティブセッション ID
    pub struct RetroId;
}

/// レトロスペクティブの進行フェーズ
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RetroPhase {
    /// 開始前の説明
    Intro,
    /// アイデア出し
    Brainstorm,
    /// アイデアのグルーピング
    Group,
    /// 投票
    Vote,
    /// アクションアイテムの決定
    Action,
    /// 完了
    Done,
}

impl RetroPhase {
    /// 次のフェーズを返す。`Done` は終端のため `None`。
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Intro => Some(Self::Brainstorm),
            Self::Brainstorm => Some(Self::Group),
            Self::Group => Some(Self::Vote),
            Self::Vote => Some(Self::Action),
            Self::Action => Some(Self::Done),
            Self::Done => None,
        }
    }
}

/// ブレインストーミング中の他者アイテムの見え方
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BrainstormVisibility {
    /// 全文表示
    Visible,
    /// 存在のみ表示（内容は伏せる）
    Concealed,
    /// 非表示
    Hidden,
}

/// レトロスペクティブのフォーマット
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RetroFormat {
    /// 「良かったこと / 改善したいこと / 疑問」
    WorkedImproveQuestion,
    /// 「Start / Stop / Continue」
    StartStopContinue,
    /// 「Mad / Sad / Glad」
    MadSadGlad,
}

/// レトロスペクティブセッション（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retro {
    id:         RetroId,
    owner_id:   UserId,
    team_id:    Option<TeamId>,
    name:       SessionTitle,
    format:     RetroFormat,
    phase:      RetroPhase,
    visibility: BrainstormVisibility,
    max_votes:  u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Retro {
    /// 最大投票数の上限
    const MAX_VOTES_LIMIT: u8 = 10;

    pub fn new(
        owner_id: UserId,
        team_id: Option<TeamId>,
        name: SessionTitle,
        format: RetroFormat,
        visibility: BrainstormVisibility,
        max_votes: u8,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if max_votes == 0 || max_votes > Self::MAX_VOTES_LIMIT {
            return Err(DomainError::Validation(format!(
                "最大投票数は 1 以上 {} 以下である必要があります",
                Self::MAX_VOTES_LIMIT
            )));
        }

        Ok(Self {
            id: RetroId::new(),
            owner_id,
            team_id,
            name,
            format,
            phase: RetroPhase::Intro,
            visibility,
            max_votes,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: RetroId,
        owner_id: UserId,
        team_id: Option<TeamId>,
        name: SessionTitle,
        format: RetroFormat,
        phase: RetroPhase,
        visibility: BrainstormVisibility,
        max_votes: u8,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            team_id,
            name,
            format,
            phase,
            visibility,
            max_votes,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &RetroId {
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

    pub fn format(&self) -> RetroFormat {
        self.format
    }

    pub fn phase(&self) -> RetroPhase {
        self.phase
    }

    pub fn visibility(&self) -> BrainstormVisibility {
        self.visibility
    }

    pub fn max_votes(&self) -> u8 {
        self.max_votes
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

    /// 次のフェーズに進めた新しいインスタンスを返す
    ///
    /// `Done` からの遷移はバリデーションエラーになる。
    pub fn advanced(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let Some(next) = self.phase.next() else {
            return Err(DomainError::Validation(
                "完了したレトロスペクティブは進行できません".to_string(),
            ));
        };

        Ok(Self {
            phase: next,
            updated_at: now,
            ..self
        })
    }
}

//! # ユーザー（エンティティ）
//!
//! KaizenBoard の利用者を表現する。ゲスト・登録ユーザー・管理者の
//! 3 種類のロールを持つ。
//!
//! ## 設計方針
//!
//! - ゲストユーザーはメールアドレスを持たない（`email: Option<Email>`）
//! - 状態遷移はイミュータブルに行う（`with_*` メソッドが新しいインスタンスを返す）
//! - DB から復元する場合は `from_db` を使用する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{DomainError, value_objects::UserName};

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}

/// メールアドレス（値オブジェクト）
///
/// PII のため Debug 出力はマスクされる。
///
/// # バリデーション
///
/// - `@` を含む
/// - 最大 254 文字（RFC 5321 の上限）
/// - 小文字に正規化して保持する
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        if value.len() > 254 {
            return Err(DomainError::Validation(
                "メールアドレスは 254 文字以内である必要があります".to_string(),
            ));
        }

        // 構文の厳密な検証は行わない。最低限の形式チェックのみ。
        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Email").field(&crate::REDACTED).finish()
    }
}

/// ユーザーロール
///
/// | ロール | 説明 |
/// |-------|------|
/// | `Guest` | 認証情報なしで作成された一時ユーザー |
/// | `Registered` | メールアドレスとパスワードで登録したユーザー |
/// | `Admin` | アプリケーション全体の管理者 |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    Guest,
    Registered,
    Admin,
}

/// ユーザーステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserStatus {
    Active,
    Deleted,
}

/// ユーザー（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id:             UserId,
    name:           UserName,
    email:          Option<Email>,
    role:           UserRole,
    status:         UserStatus,
    last_active_at: Option<DateTime<Utc>>,
    created_at:     DateTime<Utc>,
    updated_at:     DateTime<Utc>,
}

impl User {
    /// 登録ユーザーを新規作成する
    pub fn new_registered(name: UserName, email: Email, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            name,
            email: Some(email),
            role: UserRole::Registered,
            status: UserStatus::Active,
            last_active_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// ゲストユーザーを新規作成する
    ///
    /// ゲストはメールアドレスを持たず、セッションのみで識別される。
    pub fn new_guest(name: UserName, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            name,
            email: None,
            role: UserRole::Guest,
            status: UserStatus::Active,
            last_active_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// DB から取得したデータでユーザーを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: UserId,
        name: UserName,
        email: Option<Email>,
        role: UserRole,
        status: UserStatus,
        last_active_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            role,
            status,
            last_active_at,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn last_active_at(&self) -> Option<&DateTime<Utc>> {
        self.last_active_at.as_ref()
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_guest(&self) -> bool {
        self.role == UserRole::Guest
    }

    /// ログイン可能かどうか
    ///
    /// 削除済みユーザーとゲストはパスワードログインできない。
    pub fn can_login(&self) -> bool {
        self.status == UserStatus::Active && self.role != UserRole::Guest
    }

    /// プロフィールを更新した新しいインスタンスを返す
    pub fn with_profile(
        self,
        name: UserName,
        email: Option<Email>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            email,
            updated_at: now,
            ..self
        }
    }

    /// 最終アクティブ時刻を更新した新しいインスタンスを返す
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            last_active_at: Some(now),
            ..self
        }
    }

    /// 管理者に昇格した新しいインスタンスを返す
    ///
    /// ゲストユーザーは昇格できない（先に登録が必要）。
    pub fn promoted(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.role == UserRole::Guest {
            return Err(DomainError::Validation(
                "ゲストユーザーは管理者に昇格できません".to_string(),
            ));
        }

        Ok(Self {
            role: UserRole::Admin,
            updated_at: now,
            ..self
        })
    }

    /// 管理者権限を剥奪した新しいインスタンスを返す
    pub fn demoted(self, now: DateTime<Utc>) -> Self {
        Self {
            role: UserRole::Registered,
            updated_at: now,
            ..self
        }
    }

    /// 削除済みとしてマークした新しいインスタンスを返す
    pub fn deleted(self, now: DateTime<Utc>) -> Self {
        Self {
            status: UserStatus::Deleted,
            updated_at: now,
            ..self
        }
    }
}

//! # チェックイン（エンティティ）
//!
//! 非同期スタンドアップの日次報告を表現する。
//!
//! ## 不変条件
//!
//! - 同一チーム・同一ユーザー・同一日のチェックインは 1 件のみ
//!   （一意性は DB の複合一意制約で保証し、違反は競合エラーとして扱う）
//! - 各テキストフィールドは 1000 文字以内（空文字列は許容する）

use chrono::{DateTime, NaiveDate, Utc};

use crate::{DomainError, team::TeamId, user::UserId};

define_uuid_id! {
    /// チェックイン ID
    pub struct CheckinId;
}

/// チェックインの本文
///
/// 「昨日やったこと / 今日やること / ブロッカー / 相談したいこと」の
/// 4 項目と目標達成フラグを持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinContent {
    yesterday: String,
    today:     String,
    blockers:  String,
    discuss:   String,
    goals_met: bool,
}

impl CheckinContent {
    const MAX_FIELD_LENGTH: usize = 1000;

    pub fn new(
        yesterday: impl Into<String>,
        today: impl Into<String>,
        blockers: impl Into<String>,
        discuss: impl Into<String>,
        goals_met: bool,
    ) -> Result<Self, DomainError> {
        let yesterday = yesterday.into();
        let today = today.into();
        let blockers = blockers.into();
        let discuss = discuss.into();

        for (label, value) in [
            ("昨日やったこと", &yesterday),
            ("今日やること", &today),
            ("ブロッカー", &blockers),
            ("相談したいこと", &discuss),
        ] {
            if value.chars().count() > Self::MAX_FIELD_LENGTH {
                return Err(DomainError::Validation(format!(
                    "{label}は {} 文字以内である必要があります",
                    Self::MAX_FIELD_LENGTH
                )));
            }
        }

        Ok(Self {
            yesterday,
            today,
            blockers,
            discuss,
            goals_met,
        })
    }

    pub fn yesterday(&self) -> &str {
        &self.yesterday
    }

    pub fn today(&self) -> &str {
        &self.today
    }

    pub fn blockers(&self) -> &str {
        &self.blockers
    }

    pub fn discuss(&self) -> &str {
        &self.discuss
    }

    pub fn goals_met(&self) -> bool {
        self.goals_met
    }
}

/// チェックイン（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkin {
    id:           CheckinId,
    team_id:      TeamId,
    user_id:      UserId,
    checkin_date: NaiveDate,
    content:      CheckinContent,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

impl Checkin {
    pub fn new(
        team_id: TeamId,
        user_id: UserId,
        checkin_date: NaiveDate,
        content: CheckinContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CheckinId::new(),
            team_id,
            user_id,
            checkin_date,
            content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_db(
        id: CheckinId,
        team_id: TeamId,
        user_id: UserId,
        checkin_date: NaiveDate,
        content: CheckinContent,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            team_id,
            user_id,
            checkin_date,
            content,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &CheckinId {
        &self.id
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn checkin_date(&self) -> NaiveDate {
        self.checkin_date
    }

    pub fn content(&self) -> &CheckinContent {
        &self.content
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    /// 本人の投稿か
    pub fn is_authored_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// 本文を差し替えた新しいインスタンスを返す
    pub fn with_content(self, content: CheckinContent, now: DateTime<Utc>) -> Self {
        Self {
            content,
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

    fn content() -> CheckinContent {
        CheckinContent::new(
            "API のレビュー対応",
            "マイグレーションの作成",
            "",
            "リリース日程の確認",
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_チェックインを作成できる() {
        let team_id = TeamId::new();
        let user_id = UserId::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let checkin = Checkin::new(
            team_id.clone(),
            user_id.clone(),
            date,
            content(),
            Utc::now(),
        );

        assert_eq!(checkin.team_id(), &team_id);
        assert_eq!(checkin.checkin_date(), date);
        assert!(checkin.is_authored_by(&user_id));
        assert!(checkin.content().goals_met());
    }

    #[test]
    fn test_空フィールドは許容される() {
        assert!(CheckinContent::new("", "", "", "", false).is_ok());
    }

    #[rstest]
    #[case(1000, true)]
    #[case(1001, false)]
    fn test_フィールドは1000文字まで(#[case] length: usize, #[case] ok: bool) {
        let long = "あ".repeat(length);
        let result = CheckinContent::new(long, "", "", "", false);

        assert_eq!(result.is_ok(), ok);
    }

    #[test]
    fn test_本文を更新できる() {
        let now = Utc::now();
        let checkin = Checkin::new(
            TeamId::new(),
            UserId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            content(),
            now,
        );
        let original_id = checkin.id().clone();

        let updated_content =
            CheckinContent::new("別の作業", "次の作業", "CI が不安定", "", false).unwrap();
        let later = now + chrono::Duration::hours(2);
        let updated = checkin.with_content(updated_content, later);

        assert_eq!(updated.id(), &original_id);
        assert_eq!(updated.content().yesterday(), "別の作業");
        assert_eq!(updated.updated_at(), &later);
    }
}

//! # プランニングポーカー（エンティティ）
//!
//! ストーリーポイント見積もりセッションを表現する。
//!
//! ## 設計方針
//!
//! - ポイントスケール（許容されるカード値の集合）は作成時に確定する
//! - 平均値の丸めモードはセッションごとに設定可能
//! - ラウンドや投票のリアルタイム状態は WebSocket 層の責務であり、
//!   ここではセッションのメタデータのみを保持する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{DomainError, team::TeamId, user::UserId, value_objects::SessionTitle};

define_uuid_id! {
    /// プランニングポーカーセッション ID
    pub struct PokerGameId;
}

/// ポイントスケール（値オブジェクト）
///
/// 見積もりカードとして許容される値の集合。
///
/// # バリデーション
///
/// - 2 個以上 20 個以内
/// - 各値は空文字列ではなく 3 文字以内（"1", "13", "?", "☕" など）
/// - 重複なし
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointScale(Vec<String>);

impl PointScale {
    pub fn new(values: Vec<String>) -> Result<Self, DomainError> {
        if values.len() < 2 {
            return Err(DomainError::Validation(
                "ポイントスケールは 2 個以上の値が必要です".to_string(),
            ));
        }

        if values.len() > 20 {
            return Err(DomainError::Validation(
                "ポイントスケールは 20 個以内である必要があります".to_string(),
            ));
        }

        for value in &values {
            if value.is_empty() || value.chars().count() > 3 {
                return Err(DomainError::Validation(format!(
                    "ポイント値が不正です: {value:?}"
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for value in &values {
            if !seen.insert(value) {
                return Err(DomainError::Validation(format!(
                    "ポイント値が重複しています: {value}"
                )));
            }
        }

        Ok(Self(values))
    }

    /// フィボナッチ数列ベースの標準スケール
    pub fn standard() -> Self {
        Self(
            ["1", "2", "3", "5", "8", "13", "?"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// 値がこのスケールに含まれるか
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }
}

/// 平均ポイントの丸めモード
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoundingMode {
    Ceil,
    Round,
    Floor,
}

/// プランニングポーカーセッション（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokerGame {
    id:                  PokerGameId,
    owner_id:            UserId,
    team_id:             Option<TeamId>,
    name:                SessionTitle,
    point_scale:         PointScale,
    auto_finish_voting:  bool,
    rounding:            RoundingMode,
    created_at:          DateTime<Utc>,
    updated_at:          DateTime<Utc>,
}

impl PokerGame {
    pub fn new(
        owner_id: UserId,
        team_id: Option<TeamId>,
        name: SessionTitle,
        point_scale: PointScale,
        auto_finish_voting: bool,
        rounding: RoundingMode,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PokerGameId::new(),
            owner_id,
            team_id,
            name,
            point_scale,
            auto_finish_voting,
            rounding,
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: PokerGameId,
        owner_id: UserId,
        team_id: Option<TeamId>,
        name: SessionTitle,
        point_scale: PointScale,
        auto_finish_voting: bool,
        rounding: RoundingMode,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            team_id,
            name,
            point_scale,
            auto_finish_voting,
            rounding,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &PokerGameId {
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

    pub fn point_scale(&self) -> &PointScale {
        &self.point_scale
    }

    pub fn auto_finish_voting(&self) -> bool {
        self.auto_finish_voting
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    /// 指定ユーザーがこのセッションのオーナーか
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn scale(values: &[&str]) -> Result<PointScale, DomainError> {
        PointScale::new(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_標準スケールはフィボナッチ数列を含む() {
        let standard = PointScale::standard();

        assert!(standard.contains("1"));
        assert!(standard.contains("13"));
        assert!(standard.contains("?"));
        assert!(!standard.contains("100"));
    }

    #[rstest]
    #[case(&["1", "2", "3"], true)]
    #[case(&["XS", "S", "M", "L", "XL"], false)]
    fn test_カスタムスケールを作成できる(#[case] values: &[&str], #[case] _fib: bool) {
        assert!(scale(values).is_ok());
    }

    #[rstest]
    #[case(&[], "空")]
    #[case(&["1"], "1個のみ")]
    fn test_スケールは2個未満を拒否する(#[case] values: &[&str], #[case] _reason: &str) {
        assert!(scale(values).is_err());
    }

    #[test]
    fn test_スケールは重複値を拒否する() {
        assert!(scale(&["1", "2", "1"]).is_err());
    }

    #[test]
    fn test_スケールは長すぎる値を拒否する() {
        assert!(scale(&["1", "1000"]).is_err());
    }

    #[test]
    fn test_スケールは21個以上を拒否する() {
        let values: Vec<String> = (0..21).map(|i| i.to_string()).collect();
        assert!(PointScale::new(values).is_err());
    }

    #[test]
    fn test_オーナー判定() {
        let owner_id = UserId::new();
        let game = PokerGame::new(
            owner_id.clone(),
            None,
            SessionTitle::new("スプリント 42").unwrap(),
            PointScale::standard(),
            true,
            RoundingMode::Round,
            Utc::now(),
        );

        assert!(game.is_owned_by(&owner_id));
        assert!(!game.is_owned_by(&UserId::new()));
    }

    #[rstest]
    #[case(RoundingMode::Ceil, "ceil")]
    #[case(RoundingMode::Round, "round")]
    #[case(RoundingMode::Floor, "floor")]
    fn test_丸めモードの文字列表現(#[case] mode: RoundingMode, #[case] expected: &str) {
        assert_eq!(mode.to_string(), expected);
        assert_eq!(expected.parse::<RoundingMode>().unwrap(), mode);
    }
}

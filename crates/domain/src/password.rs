//! # パスワード関連の値オブジェクト
//!
//! ## 設計方針
//!
//! - 平文パスワードとハッシュを型レベルで区別し、取り違えを防ぐ
//! - ハッシュ化・検証のアルゴリズム（Argon2id）はインフラ層の責務
//! - 平文の Debug 出力はマスクする

use crate::DomainError;

/// 平文パスワード（値オブジェクト）
///
/// Debug 出力はマスクされる。Display は実装しない。
#[derive(Clone, PartialEq, Eq)]
pub struct PlainPassword(String);

impl PlainPassword {
    /// バリデーションなしで平文パスワードを保持する
    ///
    /// ログイン時の入力など、ポリシーチェックが不要な場面で使用する。
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// パスワードポリシーを検証して平文パスワードを作成する
    ///
    /// 登録・パスワード変更時に使用する。
    ///
    /// # ポリシー
    ///
    /// - 8 文字以上
    /// - 72 バイト以内（bcrypt 互換の上限に合わせる）
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        if value.chars().count() < 8 {
            return Err(DomainError::Validation(
                "パスワードは 8 文字以上である必要があります".to_string(),
            ));
        }

        if value.len() > 72 {
            return Err(DomainError::Validation(
                "パスワードは 72 バイト以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PlainPassword")
            .field(&crate::REDACTED)
            .finish()
    }
}

/// パスワードハッシュ（値オブジェクト）
///
/// Argon2id の PHC 形式文字列を保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// パスワード検証の結果
///
/// `bool` の取り違えを防ぐため専用の enum で表現する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
    Match,
    Mismatch,
}

impl PasswordVerifyResult {
    pub fn is_match(self) -> bool {
        self == Self::Match
    }

    pub fn is_mismatch(self) -> bool {
        self == Self::Mismatch
    }
}

impl From<bool> for PasswordVerifyResult {
    fn from(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_パスワードは8文字以上を受け入れる() {
        assert!(PlainPassword::parse("password123").is_ok());
    }

    #[rstest]
    #[case("", "空文字列")]
    #[case("short7?", "7文字")]
    fn test_パスワードは8文字未満を拒否する(#[case] input: &str, #[case] _reason: &str) {
        assert!(PlainPassword::parse(input).is_err());
    }

    #[test]
    fn test_パスワードは72バイト超を拒否する() {
        let long = "a".repeat(73);
        assert!(PlainPassword::parse(long).is_err());
    }

    #[test]
    fn test_平文パスワードのdebug出力はマスクされる() {
        let password = PlainPassword::new("secret-password");
        let debug = format!("{:?}", password);
        assert!(!debug.contains("secret-password"));
    }

    #[rstest]
    #[case(true, PasswordVerifyResult::Match)]
    #[case(false, PasswordVerifyResult::Mismatch)]
    fn test_検証結果はboolから変換できる(
        #[case] input: bool,
        #[case] expected: PasswordVerifyResult,
    ) {
        assert_eq!(PasswordVerifyResult::from(input), expected);
        assert_eq!(expected.is_match(), input);
    }
}

//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`UserName`] | `String` | ユーザー表示名（PII） |
//! | [`GroupName`] | `String` | 組織・部門・チームの名前 |
//! | [`SessionTitle`] | `String` | ポーカー・レトロ・ストーリーボードの名前 |

define_validated_string! {
    /// ユーザー表示名（値オブジェクト）
    ///
    /// PII（個人識別情報）のため、Debug 出力はマスクされる。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 100 文字
    pub struct UserName {
        label: "ユーザー名",
        max_length: 100,
        pii: true,
    }
}

define_validated_string! {
    /// グループ名（値オブジェクト）
    ///
    /// 組織・部門・チームの名前を表現する。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 100 文字
    pub struct GroupName {
        label: "グループ名",
        max_length: 100,
    }
}

define_validated_string! {
    /// セッション名（値オブジェクト）
    ///
    /// プランニングポーカー・レトロスペクティブ・ストーリーボードの
    /// 名前を表現する。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 200 文字
    pub struct SessionTitle {
        label: "セッション名",
        max_length: 200,
    }
}

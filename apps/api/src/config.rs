//! # API サーバー設定
//!
//! 環境変数から API サーバーの設定を読み込む。

use std::env;

/// API サーバーの設定
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// バインドアドレス
    pub host:          String,
    /// ポート番号
    pub port:          u16,
    /// データベース接続 URL
    pub database_url:  String,
    /// Redis 接続 URL
    pub redis_url:     String,
    /// セッション Cookie に Secure 属性を付与するか
    ///
    /// 本番環境（HTTPS）では `true` にする。ローカル開発では `false`。
    pub cookie_secure: bool,
}

impl ApiConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host:          env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port:          env::var("API_PORT")
                .expect("API_PORT が設定されていません")
                .parse()
                .expect("API_PORT は有効なポート番号である必要があります"),
            database_url:  env::var("DATABASE_URL")
                .expect("DATABASE_URL が設定されていません"),
            redis_url:     env::var("REDIS_URL").expect("REDIS_URL が設定されていません"),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }
}

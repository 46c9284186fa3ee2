//! # KaizenBoard API サーバー
//!
//! チームコラボレーションアプリ KaizenBoard の HTTP API。
//!
//! ## 役割
//!
//! - **認証**: セッション Cookie によるユーザー登録・ログイン・ゲスト参加
//! - **グループ管理**: 組織・部門・チームの CRUD とメンバー管理
//! - **セッション**: プランニングポーカー・レトロスペクティブ・
//!   ストーリーボードの作成とライブイベント配信
//! - **チェックイン**: チームのデイリーチェックイン
//! - **管理者**: 統計・ユーザー管理・サブスクリプション管理
//!
//! ## 構成
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Frontend   │─────│  API サーバー │─────│  PostgreSQL  │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │
//!                      ┌──────┴───────┐
//!                      │    Redis     │ セッション / Pub/Sub
//!                      └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `API_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `API_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `REDIS_URL` | **Yes** | Redis 接続 URL |
//! | `COOKIE_SECURE` | No | セッション Cookie の Secure 属性（デフォルト: `false`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境
//! cargo run -p kaizenboard-api
//!
//! # 本番環境
//! API_PORT=3000 DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!     COOKIE_SECURE=true cargo run -p kaizenboard-api --release
//! ```

mod config;
mod error;
mod handler;
#[cfg(test)]
mod test_utils;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post, put},
};
use config::ApiConfig;
use handler::{
    admin, auth, checkin,
    health::{self, ReadinessState},
    organization, poker, retro, storyboard, subscription, team, user,
};
use kaizenboard_domain::clock::{Clock, SystemClock};
use kaizenboard_infra::{
    db,
    event_bus::{RedisSessionEventBus, SessionEventBus},
    password::{
        Argon2PasswordChecker, Argon2PasswordHashService, PasswordChecker, PasswordHashService,
    },
    repository::{
        CheckinRepository, CredentialsRepository, OrganizationRepository, PokerRepository,
        PostgresCheckinRepository, PostgresCredentialsRepository, PostgresOrganizationRepository,
        PostgresPokerRepository, PostgresRetroRepository, PostgresStatsRepository,
        PostgresStoryboardRepository, PostgresSubscriptionRepository, PostgresTeamRepository,
        PostgresUserRepository, RetroRepository, StatsRepository, StoryboardRepository,
        SubscriptionRepository, TeamRepository, UserRepository,
    },
    session::{RedisSessionManager, SessionManager},
};
use redis::aio::ConnectionManager;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usecase::{
    AdminUseCase, AuthUseCase, CheckinUseCase, OrganizationUseCase, PokerUseCase, RetroUseCase,
    StoryboardUseCase, SubscriptionUseCase, TeamUseCase, UserUseCase,
};

/// API サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kaizenboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 設定読み込み
    let config = ApiConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "KaizenBoard API サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成し、マイグレーションを適用する
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("データベース接続に失敗しました");
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションの適用に失敗しました");
    tracing::info!("データベースに接続しました");

    // Redis 接続（セッションストアとイベント配信で共有）
    let redis_client =
        redis::Client::open(config.redis_url.as_str()).expect("Redis URL が不正です");
    let redis_conn = ConnectionManager::new(redis_client)
        .await
        .expect("Redis 接続に失敗しました");
    tracing::info!("Redis に接続しました");

    // 具象型で保持し、各 State 注入時に必要なトレイトオブジェクトへ coerce する
    let session_manager: Arc<dyn SessionManager> =
        Arc::new(RedisSessionManager::from_connection(redis_conn.clone()));
    let event_bus: Arc<dyn SessionEventBus> =
        Arc::new(RedisSessionEventBus::from_connection(redis_conn.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // リポジトリ（接続プールを共有）
    let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool.clone()));
    let credentials: Arc<dyn CredentialsRepository> =
        Arc::new(PostgresCredentialsRepository::new(pool.clone()));
    let orgs: Arc<dyn OrganizationRepository> =
        Arc::new(PostgresOrganizationRepository::new(pool.clone()));
    let teams: Arc<dyn TeamRepository> = Arc::new(PostgresTeamRepository::new(pool.clone()));
    let pokers: Arc<dyn PokerRepository> = Arc::new(PostgresPokerRepository::new(pool.clone()));
    let retros: Arc<dyn RetroRepository> = Arc::new(PostgresRetroRepository::new(pool.clone()));
    let boards: Arc<dyn StoryboardRepository> =
        Arc::new(PostgresStoryboardRepository::new(pool.clone()));
    let checkins: Arc<dyn CheckinRepository> =
        Arc::new(PostgresCheckinRepository::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let stats: Arc<dyn StatsRepository> = Arc::new(PostgresStatsRepository::new(pool.clone()));

    // パスワードサービス
    let hasher: Arc<dyn PasswordHashService> = Arc::new(Argon2PasswordHashService::new());
    let checker: Arc<dyn PasswordChecker> = Arc::new(Argon2PasswordChecker::new());

    // 認証 API の State
    let auth_state = Arc::new(auth::AuthState {
        usecase:         AuthUseCase::new(
            users.clone(),
            credentials.clone(),
            hasher,
            checker,
            session_manager.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
        cookie_secure:   config.cookie_secure,
    });

    // ユーザー API の State
    let user_state = Arc::new(user::UserState {
        usecase:         UserUseCase::new(
            users.clone(),
            session_manager.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });

    // 組織 API の State
    let organization_state = Arc::new(organization::OrganizationState {
        usecase:         OrganizationUseCase::new(
            orgs.clone(),
            teams.clone(),
            users.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });

    // チーム API の State（チーム配下のセッション一覧用にセッション系ユースケースも持つ）
    let team_state = Arc::new(team::TeamState {
        usecase:         TeamUseCase::new(
            teams.clone(),
            orgs.clone(),
            users.clone(),
            clock.clone(),
        ),
        poker:           PokerUseCase::new(
            pokers.clone(),
            teams.clone(),
            event_bus.clone(),
            clock.clone(),
        ),
        retro:           RetroUseCase::new(
            retros.clone(),
            teams.clone(),
            event_bus.clone(),
            clock.clone(),
        ),
        storyboard:      StoryboardUseCase::new(
            boards.clone(),
            teams.clone(),
            event_bus.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });

    // セッション API（ポーカー / レトロ / ストーリーボード）の State
    let poker_state = Arc::new(poker::PokerState {
        usecase:         PokerUseCase::new(
            pokers,
            teams.clone(),
            event_bus.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });
    let retro_state = Arc::new(retro::RetroState {
        usecase:         RetroUseCase::new(
            retros,
            teams.clone(),
            event_bus.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });
    let storyboard_state = Arc::new(storyboard::StoryboardState {
        usecase:         StoryboardUseCase::new(
            boards,
            teams.clone(),
            event_bus,
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });

    // チェックイン API の State
    let checkin_state = Arc::new(checkin::CheckinState {
        usecase:         CheckinUseCase::new(checkins, teams, clock.clone()),
        session_manager: session_manager.clone(),
    });

    // サブスクリプション API の State
    let subscription_state = Arc::new(subscription::SubscriptionState {
        usecase:         SubscriptionUseCase::new(
            subscriptions.clone(),
            users.clone(),
            clock.clone(),
        ),
        session_manager: session_manager.clone(),
    });

    // 管理者 API の State
    let admin_state = Arc::new(admin::AdminState {
        usecase:         AdminUseCase::new(stats, users.clone(), clock.clone()),
        subscriptions:   SubscriptionUseCase::new(subscriptions, users, clock),
        session_manager,
    });

    // ヘルスチェック API の State
    let readiness_state = Arc::new(ReadinessState {
        pool,
        redis_conn,
    });

    // ルーター構築
    let app = Router::new()
        // ヘルスチェック API
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .with_state(readiness_state)
        // 認証 API
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/guest", post(auth::create_guest))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/session", get(auth::get_session))
        .with_state(auth_state)
        // ユーザー API
        .route(
            "/api/v1/users/{id}",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        .with_state(user_state)
        // 組織 API
        .route(
            "/api/v1/organizations",
            post(organization::create_organization).get(organization::list_organizations),
        )
        .route(
            "/api/v1/organizations/{id}",
            get(organization::get_organization)
                .put(organization::update_organization)
                .delete(organization::delete_organization),
        )
        .route(
            "/api/v1/organizations/{id}/members",
            get(organization::list_members).post(organization::add_member),
        )
        .route(
            "/api/v1/organizations/{id}/members/{user_id}",
            put(organization::update_member).delete(organization::remove_member),
        )
        .route(
            "/api/v1/organizations/{id}/departments",
            post(organization::create_department).get(organization::list_departments),
        )
        .route(
            "/api/v1/organizations/{id}/departments/{dept_id}",
            get(organization::get_department)
                .put(organization::update_department)
                .delete(organization::delete_department),
        )
        .route(
            "/api/v1/organizations/{id}/teams",
            post(organization::create_team).get(organization::list_teams),
        )
        .route(
            "/api/v1/organizations/{id}/departments/{dept_id}/teams",
            post(organization::create_department_team).get(organization::list_department_teams),
        )
        .with_state(organization_state)
        // チーム API
        .route(
            "/api/v1/teams",
            post(team::create_team).get(team::list_teams),
        )
        .route(
            "/api/v1/teams/{id}",
            get(team::get_team)
                .put(team::update_team)
                .delete(team::delete_team),
        )
        .route(
            "/api/v1/teams/{id}/members",
            get(team::list_members).post(team::add_member),
        )
        .route(
            "/api/v1/teams/{id}/members/{user_id}",
            put(team::update_member).delete(team::remove_member),
        )
        .route("/api/v1/teams/{id}/poker", get(team::list_team_poker))
        .route("/api/v1/teams/{id}/retros", get(team::list_team_retros))
        .route(
            "/api/v1/teams/{id}/storyboards",
            get(team::list_team_storyboards),
        )
        .with_state(team_state)
        // チェックイン API
        .route(
            "/api/v1/teams/{id}/checkins",
            post(checkin::create_checkin).get(checkin::list_checkins),
        )
        .route(
            "/api/v1/teams/{id}/checkins/{checkin_id}",
            get(checkin::get_checkin)
                .put(checkin::update_checkin)
                .delete(checkin::delete_checkin),
        )
        .with_state(checkin_state)
        // プランニングポーカー API
        .route(
            "/api/v1/poker",
            post(poker::create_poker).get(poker::list_poker),
        )
        .route(
            "/api/v1/poker/{id}",
            get(poker::get_poker).delete(poker::delete_poker),
        )
        .route("/api/v1/poker/{id}/events", post(poker::publish_poker_event))
        .with_state(poker_state)
        // レトロスペクティブ API
        .route(
            "/api/v1/retros",
            post(retro::create_retro).get(retro::list_retros),
        )
        .route(
            "/api/v1/retros/{id}",
            get(retro::get_retro).delete(retro::delete_retro),
        )
        .route("/api/v1/retros/{id}/advance", post(retro::advance_retro))
        .route("/api/v1/retros/{id}/events", post(retro::publish_retro_event))
        .with_state(retro_state)
        // ストーリーボード API
        .route(
            "/api/v1/storyboards",
            post(storyboard::create_storyboard).get(storyboard::list_storyboards),
        )
        .route(
            "/api/v1/storyboards/{id}",
            get(storyboard::get_storyboard).delete(storyboard::delete_storyboard),
        )
        .route(
            "/api/v1/storyboards/{id}/events",
            post(storyboard::publish_storyboard_event),
        )
        .with_state(storyboard_state)
        // サブスクリプション API
        .route(
            "/api/v1/subscriptions/me",
            get(subscription::get_my_subscription),
        )
        .with_state(subscription_state)
        // 管理者 API
        .route("/api/v1/admin/stats", get(admin::get_stats))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route(
            "/api/v1/admin/users/{id}/promote",
            post(admin::promote_user),
        )
        .route("/api/v1/admin/users/{id}/demote", post(admin::demote_user))
        .route(
            "/api/v1/admin/subscriptions",
            get(admin::list_subscriptions).post(admin::create_subscription),
        )
        .route(
            "/api/v1/admin/subscriptions/{id}",
            get(admin::get_subscription)
                .put(admin::update_subscription)
                .delete(admin::delete_subscription),
        )
        .with_state(admin_state)
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("KaizenBoard API サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

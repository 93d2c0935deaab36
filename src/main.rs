use std::{net::SocketAddr, sync::Arc};

use axum::http::{HeaderValue, Method};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rainbow_comments::{
    config::Config,
    routes,
    services::{CommentService, Database, SmtpMailer},
    state::AppState,
    utils::clock::SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    let filter = tracing_subscriber::EnvFilter::new(&config.log_level);
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting Rainbow-Comments service...");

    // 初始化数据库连接
    let db = match Database::new(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(anyhow::anyhow!("Database initialization failed"));
        }
    };
    db.verify_connection().await?;

    let clock = Arc::new(SystemClock);

    // 注册内容语言
    let languages = CommentService::new(db.clone(), clock.clone());
    for locale in &config.content_languages {
        let id = languages.register_language(locale).await?;
        info!("Content language {} registered with id {}", locale, id);
    }

    let mailer = Arc::new(SmtpMailer::new(&config)?);
    let app_state = Arc::new(AppState::build(config.clone(), db, mailer, clock)?);

    info!(
        "Comments: anonymous access {}, moderation {}",
        config.anonymous_access_enabled, config.moderation_enabled
    );

    // 配置 CORS
    let origins = config
        .cors_allowed_origins
        .split(',')
        .map(|origin| origin.trim().parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(origins);

    let app = routes::app(app_state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // 启动主服务器
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

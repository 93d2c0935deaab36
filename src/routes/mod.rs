pub mod comments;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

/// 构建应用路由
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/comments", comments::router())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "Rainbow-Comments is running!"
}

pub mod rpc;

use axum::{routing::get, Router};

use crate::app_state::AppState;

/// 所有路由（统一入口）
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(rpc::rpc_routes())
}

async fn root_handler() -> &'static str {
    "diagd XML-RPC service"
}

async fn health_handler() -> &'static str {
    "OK"
}

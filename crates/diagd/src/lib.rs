/// diagd - 诊断服务
///
/// 通过 XML-RPC 对外提供认证后的诊断接口

pub mod api;
pub mod app_state;
pub mod config;
pub mod services;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app_state::AppState;

/// 构建应用路由
pub fn build_router(state: AppState) -> Router {
    api::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 在给定监听器上运行服务，直到关闭信号触发
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("👋 diagd 已停止");
    Ok(())
}

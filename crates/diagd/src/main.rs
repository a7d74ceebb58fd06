/// diagd - 诊断服务主程序

use diagd::{app_state::AppState, config};
use std::net::SocketAddr;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level))
        )
        .init();

    info!("🚀 启动 diagd 诊断服务...");

    // 加载配置
    let cfg = config::Config::from_env()?;
    info!("✅ 配置加载成功");
    info!("   版本: {}", cfg.version);
    info!("   认证失败延迟: {:?}", cfg.auth_failure_delay);

    // 创建应用状态
    let app_state = AppState::new(&cfg);

    // Ctrl-C 与 TERM 请求共用同一个关闭信号
    let shutdown = app_state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，准备关闭");
            shutdown.cancel();
        }
    });

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("🎯 服务器监听在 http://{}{}", addr, common::models::constants::RPC_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    diagd::serve(listener, app_state).await
}

/// 应用全局状态

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::services::DiagnoseService;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 诊断服务
    pub diagnose_service: Arc<DiagnoseService>,
    /// 关闭信号（TERM 请求或 Ctrl-C 触发）
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(cfg: &Config) -> Self {
        let shutdown = CancellationToken::new();
        let diagnose_service = DiagnoseService::new(
            cfg.preshared_key.clone(),
            cfg.version.clone(),
            cfg.auth_failure_delay,
            shutdown.clone(),
        );
        Self {
            diagnose_service: Arc::new(diagnose_service),
            shutdown,
        }
    }

    /// 获取诊断服务
    pub fn diagnose_service(&self) -> Arc<DiagnoseService> {
        self.diagnose_service.clone()
    }
}

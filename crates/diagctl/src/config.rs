/// 配置管理

use common::models::constants;
use common::DiagConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub preshared_key: String,
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint = std::env::var("DIAG_ENDPOINT").unwrap_or_else(|_| {
            format!("http://127.0.0.1:{}{}", constants::DEFAULT_RPC_PORT, constants::RPC_PATH)
        });

        let preshared_key = std::env::var("DIAG_PSK")
            .map_err(|_| anyhow::anyhow!("必须设置 DIAG_PSK"))?;

        let request_timeout = match std::env::var("DIAG_TIMEOUT_SECS") {
            Ok(secs) => Some(Duration::from_secs(secs.parse()?)),
            Err(_) => None,
        };

        Ok(Self {
            endpoint,
            preshared_key,
            request_timeout,
        })
    }

    /// 转换为会话配置，同时校验端点与密钥
    pub fn to_diag_config(&self) -> anyhow::Result<DiagConfig> {
        let config = DiagConfig::new(&self.endpoint, self.preshared_key.clone())?;
        Ok(match self.request_timeout {
            Some(timeout) => config.with_request_timeout(timeout),
            None => config,
        })
    }
}

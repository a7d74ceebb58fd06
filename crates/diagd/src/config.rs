/// 配置管理

use common::models::constants;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub preshared_key: String,
    pub version: String,
    pub auth_failure_delay: Duration,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let port = std::env::var("DIAGD_PORT")
            .unwrap_or_else(|_| constants::DEFAULT_RPC_PORT.to_string())
            .parse()?;

        let preshared_key = std::env::var("DIAGD_PSK")
            .map_err(|_| anyhow::anyhow!("必须设置 DIAGD_PSK"))?;
        if preshared_key.is_empty() {
            anyhow::bail!("DIAGD_PSK 不能为空");
        }

        let version = std::env::var("DIAGD_VERSION")
            .unwrap_or_else(|_| format!("diagd {}", env!("CARGO_PKG_VERSION")));

        let auth_failure_delay = std::env::var("DIAGD_AUTH_FAILURE_DELAY_SECS")
            .unwrap_or_else(|_| constants::DEFAULT_AUTH_FAILURE_DELAY.to_string())
            .parse()
            .map(Duration::from_secs)?;

        Ok(Self {
            port,
            preshared_key,
            version,
            auth_failure_delay,
        })
    }
}

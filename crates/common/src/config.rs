/// 诊断会话配置
///
/// 端点与预共享密钥通过构造参数注入，不使用进程级全局变量

use reqwest::Url;
use std::time::Duration;

use crate::diag_rpc::PresharedKey;
use crate::errors::{Error, Result};
use crate::models::constants;

#[derive(Debug, Clone)]
pub struct DiagConfig {
    /// 诊断服务端点，例如 `http://127.0.0.1:5164/RPC2`
    pub endpoint: Url,
    pub preshared_key: PresharedKey,
    /// 传输层请求超时；None 表示不限时
    pub request_timeout: Option<Duration>,
}

impl DiagConfig {
    pub fn new(endpoint: &str, preshared_key: impl Into<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("无效的端点地址 {}: {}", endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "端点必须使用 http 或 https: {}",
                endpoint
            )));
        }

        let preshared_key = PresharedKey::new(preshared_key);
        if preshared_key.is_empty() {
            return Err(Error::Config("预共享密钥不能为空".to_string()));
        }

        Ok(Self {
            endpoint,
            preshared_key,
            request_timeout: None,
        })
    }

    /// 按主机和端口拼出默认路径的端点
    pub fn from_host(
        host: &str,
        port: u16,
        preshared_key: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            &format!("http://{}:{}{}", host, port, constants::RPC_PATH),
            preshared_key,
        )
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

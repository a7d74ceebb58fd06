/// 诊断服务
///
/// 实现 `diagnose` 方法：预共享密钥换令牌，令牌校验后返回诊断信息

use chrono::{DateTime, Utc};
use common::diag_rpc::{fault_codes, DiagError, WireCall, XmlRpcValue};
use common::models::{constants, ArgType, FunctionCode};
use common::utils::{generate_token, mask_secret};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct DiagnoseService {
    preshared_key: String,
    /// 进程生命周期内有效的令牌
    token: String,
    version: String,
    auth_failure_delay: Duration,
    started_at: DateTime<Utc>,
    started: Instant,
    requests_served: AtomicU64,
    shutdown: CancellationToken,
}

impl DiagnoseService {
    pub fn new(
        preshared_key: impl Into<String>,
        version: impl Into<String>,
        auth_failure_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            preshared_key: preshared_key.into(),
            token: generate_token(),
            version: version.into(),
            auth_failure_delay,
            started_at: Utc::now(),
            started: Instant::now(),
            requests_served: AtomicU64::new(0),
            shutdown,
        }
    }

    /// 处理一次 XML-RPC 调用，fault 以 `DiagError::Protocol` 返回
    pub async fn handle(&self, method: &str, params: &[XmlRpcValue]) -> Result<XmlRpcValue, DiagError> {
        self.requests_served.fetch_add(1, Ordering::Relaxed);

        if method != constants::DIAGNOSE_METHOD {
            return Err(DiagError::protocol_fault(
                fault_codes::MALFORMED_REQUEST,
                format!("方法不存在: {}", method),
            ));
        }

        let call = WireCall::from_params(params)
            .map_err(|e| DiagError::protocol_fault(fault_codes::MALFORMED_REQUEST, e.to_string()))?;
        info!("📨 [收到诊断请求] {}", describe(&call));

        let function = FunctionCode::from_code(call.function)
            .ok_or_else(|| DiagError::unknown_function(call.function))?;

        if function.is_authenticate() {
            return if call.credential == self.preshared_key {
                info!("🔑 预共享密钥校验通过，签发令牌");
                Ok(XmlRpcValue::String(self.token.clone()))
            } else {
                self.reject("预共享密钥错误").await
            };
        }

        if call.credential != self.token {
            return self.reject("令牌无效").await;
        }

        match function {
            FunctionCode::Version => Ok(XmlRpcValue::String(self.version.clone())),
            FunctionCode::Params => Ok(XmlRpcValue::String(describe(&call))),
            FunctionCode::Status => Ok(XmlRpcValue::from("running")),
            FunctionCode::Dashboard => Ok(XmlRpcValue::from_json(&self.dashboard())),
            FunctionCode::Terminate => {
                warn!("🛑 收到 TERM 请求，准备关闭");
                self.shutdown.cancel();
                Ok(XmlRpcValue::from("diagd shutting down"))
            }
            other => Err(DiagError::unknown_function(other.code())),
        }
    }

    /// 仪表盘摘要
    pub fn dashboard(&self) -> serde_json::Value {
        json!({
            "status": "ok",
            "version": self.version,
            "started_at": self.started_at.to_rfc3339(),
            "uptime_secs": self.started.elapsed().as_secs(),
            "requests_served": self.requests_served.load(Ordering::Relaxed),
        })
    }

    /// 凭证错误时先等待惩罚延迟再返回 fault
    async fn reject(&self, reason: &str) -> Result<XmlRpcValue, DiagError> {
        warn!("❌ {}，延迟 {:?} 后拒绝", reason, self.auth_failure_delay);
        if !self.auth_failure_delay.is_zero() {
            tokio::time::sleep(self.auth_failure_delay).await;
        }
        Err(DiagError::credential_rejected("Synchronization Error"))
    }
}

/// 请求的日志描述，凭证已遮蔽
fn describe(call: &WireCall) -> String {
    let func = FunctionCode::from_code(call.function)
        .map(|f| f.as_str())
        .unwrap_or("NONE");
    let type_name = |code: i32| ArgType::from_code(code).map(|t| t.as_str()).unwrap_or("?");
    format!(
        "Func={},P2={},P3Type={},P3={},P4Type={},P4={},Auth={}",
        func,
        call.reserved.int_a,
        type_name(call.reserved.int_b),
        call.reserved.text_a,
        type_name(call.reserved.int_c),
        call.reserved.text_b,
        mask_secret(&call.credential),
    )
}

/// 诊断 RPC 客户端
///
/// 只负责编组参数、发送调用、解释结果；不持有会话状态，不重试

use tracing::{debug, warn};

use super::codec::XmlRpcValue;
use super::message::{AuthToken, Credential, DiagnosticRequest, PresharedKey, ReservedArgs};
use super::transport::{DiagTransport, HttpTransport};
use super::types::DiagnosticResult;
use super::DiagError;
use crate::config::DiagConfig;
use crate::models::{constants, FunctionCode};

/// 诊断 RPC 客户端
pub struct DiagClient<T = HttpTransport> {
    transport: T,
}

impl DiagClient<HttpTransport> {
    /// 连接配置中的诊断端点
    pub fn connect(config: &DiagConfig) -> Result<Self, DiagError> {
        Ok(Self::with_transport(HttpTransport::connect(config)?))
    }
}

impl<T: DiagTransport> DiagClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// 发起一次诊断调用
    ///
    /// 参数校验失败时返回 `InvalidArgument`，不会触达传输层
    pub async fn invoke(
        &self,
        function: FunctionCode,
        reserved: ReservedArgs,
        credential: Credential,
    ) -> Result<DiagnosticResult, DiagError> {
        let request = DiagnosticRequest::new(function, reserved, credential)?;
        self.send(&request).await
    }

    /// 发送已构造的请求
    pub async fn send(&self, request: &DiagnosticRequest) -> Result<DiagnosticResult, DiagError> {
        let function = request.function();
        debug!(
            "📤 [诊断请求] function={}, credential={}",
            function,
            request.credential().masked()
        );

        let value = self
            .transport
            .call(constants::DIAGNOSE_METHOD, request.to_wire().to_params())
            .await
            .inspect_err(|e| warn!("❌ [诊断失败] function={}, error={}", function, e))?;

        check_legacy_rejection(&value)?;
        let result = DiagnosticResult::from_value(function, value)?;
        debug!("📥 [诊断成功] function={}", function);
        Ok(result)
    }

    /// 用预共享密钥换取令牌
    pub async fn authenticate(&self, key: &PresharedKey) -> Result<AuthToken, DiagError> {
        let request = DiagnosticRequest::authenticate(key)?;
        self.send(&request)
            .await?
            .into_token()
            .ok_or_else(|| DiagError::malformed_response("认证响应不是令牌"))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// 旧版服务用带内字符串表示拒绝，统一转换为协议 fault
fn check_legacy_rejection(value: &XmlRpcValue) -> Result<(), DiagError> {
    match value.as_str() {
        Some(constants::LEGACY_CREDENTIAL_REJECTED) => {
            Err(DiagError::credential_rejected(constants::LEGACY_CREDENTIAL_REJECTED))
        }
        Some(constants::LEGACY_UNKNOWN_REQUEST) => Err(DiagError::protocol_fault(
            super::error::fault_codes::UNKNOWN_FUNCTION,
            constants::LEGACY_UNKNOWN_REQUEST,
        )),
        _ => Ok(()),
    }
}

/// 认证握手与诊断会话
///
/// 状态机：Unauthenticated -> Authenticated -> Completed；
/// 认证失败进入 Failed；诊断调用遇到协议 fault 回到 Unauthenticated 并丢弃令牌

use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::client::DiagClient;
use super::message::{AuthToken, DiagnosticRequest, PresharedKey};
use super::transport::{DiagTransport, HttpTransport};
use super::types::DiagnosticResult;
use super::DiagError;
use crate::config::DiagConfig;
use crate::models::FunctionCode;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Completed,
    Failed,
}

/// 会话失败所在阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStage {
    /// 发出任何调用之前的检查
    Preflight,
    Authentication,
    Diagnostic {
        /// 在请求序列中的位置（从 0 开始）
        index: usize,
        function: FunctionCode,
    },
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preflight => write!(f, "预检"),
            Self::Authentication => write!(f, "认证"),
            Self::Diagnostic { index, function } => {
                write!(f, "第 {} 个诊断调用 {}", index + 1, function)
            }
        }
    }
}

/// 会话失败
///
/// 携带失败阶段、原始错误以及失败前已完成的结果
#[derive(Debug, Error)]
#[error("诊断会话在{stage}阶段失败: {source}")]
pub struct SessionError {
    pub stage: SessionStage,
    pub source: DiagError,
    pub completed: Vec<DiagnosticResult>,
    pub final_state: SessionState,
}

impl SessionError {
    pub fn is_authentication_failure(&self) -> bool {
        self.stage == SessionStage::Authentication
    }

    /// 失败的诊断功能
    pub fn failed_function(&self) -> Option<FunctionCode> {
        match self.stage {
            SessionStage::Diagnostic { function, .. } => Some(function),
            _ => None,
        }
    }
}

/// 诊断会话
///
/// 持有一个客户端（即会话期间的连接），会话结束时随之释放
pub struct DiagSession<T = HttpTransport> {
    client: DiagClient<T>,
    preshared_key: PresharedKey,
    state: SessionState,
    token: Option<AuthToken>,
}

impl DiagSession<HttpTransport> {
    /// 按配置建立连接并创建会话
    pub fn connect(config: &DiagConfig) -> Result<Self, DiagError> {
        Ok(Self::new(
            DiagClient::connect(config)?,
            config.preshared_key.clone(),
        ))
    }
}

impl<T: DiagTransport> DiagSession<T> {
    pub fn new(client: DiagClient<T>, preshared_key: PresharedKey) -> Self {
        Self {
            client,
            preshared_key,
            state: SessionState::Unauthenticated,
            token: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// 用预共享密钥换取令牌
    pub async fn authenticate(&mut self) -> Result<(), DiagError> {
        if self.state != SessionState::Unauthenticated {
            return Err(DiagError::invalid_argument(format!(
                "当前状态 {:?} 不允许认证",
                self.state
            )));
        }

        match self.client.authenticate(&self.preshared_key).await {
            Ok(token) => {
                info!("🔑 认证成功");
                self.token = Some(token);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(e) => {
                warn!("❌ 认证失败: {}", e);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// 使用当前令牌发起一次诊断调用
    pub async fn call(&mut self, function: FunctionCode) -> Result<DiagnosticResult, DiagError> {
        let token = match (&self.state, &self.token) {
            (SessionState::Authenticated, Some(token)) => token,
            _ => {
                return Err(DiagError::invalid_argument(format!(
                    "会话未认证（{:?}），不能调用 {}",
                    self.state, function
                )));
            }
        };

        let request = match DiagnosticRequest::diagnostic(function, token) {
            Ok(request) => request,
            Err(e) => {
                // 令牌无法原样转发，会话无法继续
                self.token = None;
                self.state = SessionState::Failed;
                return Err(e);
            }
        };
        match self.client.send(&request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                // 令牌可能已失效，丢弃后由调用方决定是否重新开始会话
                self.token = None;
                self.state = if e.is_protocol_fault() {
                    SessionState::Unauthenticated
                } else {
                    SessionState::Failed
                };
                Err(e)
            }
        }
    }

    /// 完整会话：认证一次，然后按顺序执行全部诊断调用
    ///
    /// 任一调用失败即中止剩余调用
    pub async fn run(
        mut self,
        functions: &[FunctionCode],
    ) -> Result<Vec<DiagnosticResult>, SessionError> {
        if let Some(index) = functions.iter().position(|f| f.is_authenticate()) {
            return Err(SessionError {
                stage: SessionStage::Preflight,
                source: DiagError::invalid_argument(format!(
                    "第 {} 个请求为 AUTH，认证由会话自动完成",
                    index + 1
                )),
                completed: Vec::new(),
                final_state: SessionState::Failed,
            });
        }

        if let Err(e) = self.authenticate().await {
            return Err(SessionError {
                stage: SessionStage::Authentication,
                source: e,
                completed: Vec::new(),
                final_state: self.state,
            });
        }

        let mut results = Vec::with_capacity(functions.len());
        for (index, &function) in functions.iter().enumerate() {
            match self.call(function).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(
                        "诊断会话中止: 第 {} 个调用 {} 失败，剩余 {} 个未执行",
                        index + 1,
                        function,
                        functions.len() - index - 1
                    );
                    return Err(SessionError {
                        stage: SessionStage::Diagnostic { index, function },
                        source: e,
                        completed: results,
                        final_state: self.state,
                    });
                }
            }
        }

        self.state = SessionState::Completed;
        self.token = None;
        debug!("✅ 诊断会话完成，共 {} 个结果", results.len());
        Ok(results)
    }
}

/// 按配置执行一次完整会话
pub async fn run_session(
    config: &DiagConfig,
    functions: &[FunctionCode],
) -> Result<Vec<DiagnosticResult>, SessionError> {
    let session = DiagSession::connect(config).map_err(|e| SessionError {
        stage: SessionStage::Preflight,
        source: e,
        completed: Vec::new(),
        final_state: SessionState::Failed,
    })?;
    info!("🎯 诊断会话开始: endpoint={}, functions={}", config.endpoint, functions.len());
    session.run(functions).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag_rpc::codec::XmlRpcValue;
    use crate::diag_rpc::error::{fault_codes, FaultKind};
    use crate::diag_rpc::testing::StubTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn session(stub: &Arc<StubTransport>, psk: &str) -> DiagSession<Arc<StubTransport>> {
        DiagSession::new(DiagClient::with_transport(stub.clone()), PresharedKey::new(psk))
    }

    #[tokio::test]
    async fn test_version_then_dashboard() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));

        let results = session(&stub, "psk")
            .run(&[FunctionCode::Version, FunctionCode::Dashboard])
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                DiagnosticResult::Version("v1.0.0".to_string()),
                DiagnosticResult::Dashboard(json!({"status": "ok"})),
            ]
        );
        assert_eq!(stub.calls(), vec![2, 1, 13]);
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));
        let functions = [
            FunctionCode::Status,
            FunctionCode::Dashboard,
            FunctionCode::Version,
            FunctionCode::Params,
            FunctionCode::Status,
        ];

        let results = session(&stub, "psk").run(&functions).await.unwrap();

        assert_eq!(results.len(), functions.len());
        let observed: Vec<FunctionCode> = results.iter().map(|r| r.function()).collect();
        assert_eq!(observed, functions);
    }

    #[tokio::test]
    async fn test_unencodable_key_fails_without_traffic() {
        let stub = Arc::new(StubTransport::new("a\u{1}b", "tok"));

        let err = session(&stub, "a\u{1}b")
            .run(&[FunctionCode::Version])
            .await
            .unwrap_err();

        assert_eq!(err.stage, SessionStage::Authentication);
        assert!(err.source.is_invalid_argument());
        assert_eq!(err.final_state, SessionState::Failed);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unencodable_token_stops_session() {
        let stub = Arc::new(StubTransport::new("psk", "tok\u{1}"));

        let err = session(&stub, "psk")
            .run(&[FunctionCode::Version, FunctionCode::Dashboard])
            .await
            .unwrap_err();

        assert_eq!(err.failed_function(), Some(FunctionCode::Version));
        assert!(err.source.is_invalid_argument());
        assert_eq!(err.final_state, SessionState::Failed);
        assert_eq!(stub.diagnostic_call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_with_line_breaks_forwarded_unchanged() {
        let stub = Arc::new(StubTransport::new("psk", "tok\r\nline2\rend"));

        let results = session(&stub, "psk").run(&[FunctionCode::Version]).await.unwrap();

        assert_eq!(results, vec![DiagnosticResult::Version("v1.0.0".to_string())]);
        assert_eq!(stub.calls(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_empty_request_list_still_authenticates() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));
        let results = session(&stub, "psk").run(&[]).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(stub.calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_invalid_key_gates_all_diagnostics() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));

        let err = session(&stub, "wrong")
            .run(&[FunctionCode::Version, FunctionCode::Dashboard])
            .await
            .unwrap_err();

        assert!(err.is_authentication_failure());
        assert!(err.source.is_protocol_fault());
        assert_eq!(err.final_state, SessionState::Failed);
        assert!(err.completed.is_empty());
        assert_eq!(stub.diagnostic_call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_authentication() {
        let stub = Arc::new(StubTransport::new("psk", "tok").unreachable());

        let err = session(&stub, "psk").run(&[FunctionCode::Version]).await.unwrap_err();

        assert!(err.is_authentication_failure());
        assert!(err.source.is_transport());
        assert_eq!(stub.diagnostic_call_count(), 0);
    }

    #[tokio::test]
    async fn test_second_of_three_faults() {
        let stub = Arc::new(
            StubTransport::new("psk", "tok")
                .with_fault(FunctionCode::Dashboard, fault_codes::UNKNOWN_FUNCTION, "not here"),
        );

        let err = session(&stub, "psk")
            .run(&[FunctionCode::Version, FunctionCode::Dashboard, FunctionCode::Status])
            .await
            .unwrap_err();

        assert_eq!(
            err.stage,
            SessionStage::Diagnostic {
                index: 1,
                function: FunctionCode::Dashboard
            }
        );
        assert_eq!(err.failed_function(), Some(FunctionCode::Dashboard));
        assert_eq!(err.completed, vec![DiagnosticResult::Version("v1.0.0".to_string())]);
        assert_eq!(err.source.fault_kind(), Some(FaultKind::UnknownFunction));
        // 第三个调用从未发出
        assert_eq!(stub.calls(), vec![2, 1, 13]);
    }

    #[tokio::test]
    async fn test_protocol_fault_drops_token() {
        let stub = Arc::new(
            StubTransport::new("psk", "tok")
                .with_fault(FunctionCode::Version, fault_codes::CREDENTIAL_REJECTED, "expired"),
        );
        let mut session = session(&stub, "psk");

        session.authenticate().await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);

        let err = session.call(FunctionCode::Version).await.unwrap_err();
        assert!(err.is_protocol_fault());
        assert_eq!(session.state(), SessionState::Unauthenticated);

        // 令牌已丢弃，不允许继续调用，也不会自动重新认证
        let err = session.call(FunctionCode::Dashboard).await.unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(stub.calls(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_reauthenticate_after_protocol_fault() {
        let stub = Arc::new(StubTransport::new("psk", "tok").with_fault(
            FunctionCode::Status,
            fault_codes::CREDENTIAL_REJECTED,
            "expired",
        ));
        let mut session = session(&stub, "psk");
        session.authenticate().await.unwrap();
        session.call(FunctionCode::Status).await.unwrap_err();
        assert_eq!(session.state(), SessionState::Unauthenticated);

        // 从 Unauthenticated 可以手动重新认证
        session.authenticate().await.unwrap();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_transport_error_during_diagnostic_fails_session() {
        let stub = Arc::new(StubTransport::new("psk", "tok").with_transport_error(FunctionCode::Dashboard));

        let err = session(&stub, "psk")
            .run(&[FunctionCode::Version, FunctionCode::Dashboard, FunctionCode::Status])
            .await
            .unwrap_err();

        assert!(err.source.is_transport());
        assert_eq!(err.final_state, SessionState::Failed);
        assert_eq!(err.failed_function(), Some(FunctionCode::Dashboard));
        assert_eq!(err.completed.len(), 1);
        assert_eq!(stub.calls(), vec![2, 1, 13]);
    }

    #[tokio::test]
    async fn test_call_before_authentication_is_rejected() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));
        let mut session = session(&stub, "psk");

        let err = session.call(FunctionCode::Version).await.unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_in_request_list_is_rejected_up_front() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));

        let err = session(&stub, "psk")
            .run(&[FunctionCode::Version, FunctionCode::Authenticate])
            .await
            .unwrap_err();

        assert_eq!(err.stage, SessionStage::Preflight);
        assert!(err.source.is_invalid_argument());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_sessions_are_identical() {
        let stub = Arc::new(StubTransport::new("psk", "tok"));
        let functions = [FunctionCode::Version, FunctionCode::Dashboard];

        let first = session(&stub, "psk").run(&functions).await.unwrap();
        let second = session(&stub, "psk").run(&functions).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let good = Arc::new(StubTransport::new("psk", "tok"));
        let bad = Arc::new(StubTransport::new("psk", "tok"));

        let (ok, failed) = tokio::join!(
            session(&good, "psk").run(&[FunctionCode::Version]),
            session(&bad, "nope").run(&[FunctionCode::Version]),
        );

        assert_eq!(ok.unwrap().len(), 1);
        assert!(failed.unwrap_err().is_authentication_failure());

        // 失败的会话不影响之后的新会话
        let again = session(&bad, "psk").run(&[FunctionCode::Version]).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_token_forwarded_unchanged() {
        let token = " tok with spaces & <xml> ";
        let stub = Arc::new(
            StubTransport::new("psk", token)
                .with_value(FunctionCode::Version, XmlRpcValue::from("v2")),
        );

        let results = session(&stub, "psk").run(&[FunctionCode::Version]).await.unwrap();
        assert_eq!(results[0].as_version(), Some("v2"));
    }
}

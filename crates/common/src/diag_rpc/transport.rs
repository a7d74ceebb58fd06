/// 诊断 RPC 传输层
///
/// 对客户端而言传输是不透明的 call(method, params) -> result | fault

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::sync::Arc;
use tracing::{debug, warn};

use super::codec::{self, MethodResponse, XmlRpcValue};
use super::DiagError;
use crate::config::DiagConfig;

/// RPC 传输接口
#[async_trait]
pub trait DiagTransport: Send + Sync {
    /// 发出一次调用并等待结果；服务端 fault 以 `DiagError::Protocol` 返回
    async fn call(&self, method: &str, params: Vec<XmlRpcValue>) -> Result<XmlRpcValue, DiagError>;
}

#[async_trait]
impl<T: DiagTransport + ?Sized> DiagTransport for Arc<T> {
    async fn call(&self, method: &str, params: Vec<XmlRpcValue>) -> Result<XmlRpcValue, DiagError> {
        (**self).call(method, params).await
    }
}

/// 基于 HTTP POST 的 XML-RPC 传输
///
/// 持有的 HTTP 客户端即会话期间的连接，随传输一起释放
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn connect(config: &DiagConfig) -> Result<Self, DiagError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| DiagError::transport(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl DiagTransport for HttpTransport {
    async fn call(&self, method: &str, params: Vec<XmlRpcValue>) -> Result<XmlRpcValue, DiagError> {
        let body = codec::encode_call(method, &params);
        debug!("📤 POST {} method={}", self.endpoint, method);

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .header(USER_AGENT, concat!("diag-rpc/", env!("CARGO_PKG_VERSION")))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("诊断端点返回 HTTP {}", status);
            return Err(DiagError::transport(format!("HTTP 状态异常: {}", status)));
        }

        let text = response.text().await?;
        match codec::decode_response(&text)? {
            MethodResponse::Success(value) => Ok(value),
            MethodResponse::Fault { code, message } => {
                debug!("📥 收到 fault: code={}, message={}", code, message);
                Err(DiagError::protocol_fault(code, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        let cfg = DiagConfig::new(&format!("{}/RPC2", server.uri()), "psk").unwrap();
        HttpTransport::connect(&cfg).unwrap()
    }

    #[tokio::test]
    async fn test_success_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/RPC2"))
            .and(header("content-type", "text/xml"))
            .and(body_string_contains("<methodName>diagnose</methodName>"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(codec::encode_response(&XmlRpcValue::from("v1.0.0"))),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server);
        let result = transport.call("diagnose", vec![XmlRpcValue::Int(1)]).await;
        assert_eq!(result.unwrap(), XmlRpcValue::from("v1.0.0"));
    }

    #[tokio::test]
    async fn test_fault_is_protocol_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/RPC2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(codec::encode_fault(1, "bad key")),
            )
            .mount(&mock_server)
            .await;

        let err = transport_for(&mock_server)
            .call("diagnose", vec![])
            .await
            .unwrap_err();
        assert_eq!(err, DiagError::protocol_fault(1, "bad key"));
    }

    #[tokio::test]
    async fn test_http_error_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/RPC2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let err = transport_for(&mock_server)
            .call("diagnose", vec![])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/RPC2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let err = transport_for(&mock_server)
            .call("diagnose", vec![])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // 绑定后立即释放端口，保证没有监听者
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let cfg = DiagConfig::from_host("127.0.0.1", port, "psk").unwrap();
        let err = HttpTransport::connect(&cfg)
            .unwrap()
            .call("diagnose", vec![])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}

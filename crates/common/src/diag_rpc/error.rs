/// 诊断 RPC 错误定义

use std::fmt;
use thiserror::Error;

/// 服务端 fault 码
pub mod fault_codes {
    /// 凭证（预共享密钥或令牌）被拒绝
    pub const CREDENTIAL_REJECTED: i32 = 1;

    /// 功能码未识别或不受支持
    pub const UNKNOWN_FUNCTION: i32 = 2;

    /// 请求格式错误（方法名、参数个数或类型不符）
    pub const MALFORMED_REQUEST: i32 = 3;
}

/// 协议 fault 的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    CredentialRejected,
    UnknownFunction,
    MalformedRequest,
    Other,
}

impl FaultKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            fault_codes::CREDENTIAL_REJECTED => Self::CredentialRejected,
            fault_codes::UNKNOWN_FUNCTION => Self::UnknownFunction,
            fault_codes::MALFORMED_REQUEST => Self::MalformedRequest,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialRejected => "CREDENTIAL_REJECTED",
            Self::UnknownFunction => "UNKNOWN_FUNCTION",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 诊断 RPC 错误
///
/// - `Transport`：端点不可达、连接中断、HTTP 错误或响应格式错误
/// - `Protocol`：服务端明确拒绝请求（凭证错误、未知功能码）
/// - `InvalidArgument`：调用方参数错误，发生在任何网络调用之前
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagError {
    #[error("传输错误: {0}")]
    Transport(String),

    #[error("协议错误: [{code}] {message}")]
    Protocol { code: i32, message: String },

    #[error("无效参数: {0}")]
    InvalidArgument(String),
}

impl DiagError {
    /// 传输错误
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// 响应格式错误
    pub fn malformed_response(err: impl fmt::Display) -> Self {
        Self::Transport(format!("响应格式错误: {}", err))
    }

    /// 请求报文格式错误，服务端以 fault 返回
    pub fn malformed_request(err: impl fmt::Display) -> Self {
        Self::protocol_fault(
            fault_codes::MALFORMED_REQUEST,
            format!("请求格式错误: {}", err),
        )
    }

    /// 协议 fault
    pub fn protocol_fault(code: i32, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// 凭证被拒
    pub fn credential_rejected(message: impl Into<String>) -> Self {
        Self::protocol_fault(fault_codes::CREDENTIAL_REJECTED, message)
    }

    /// 功能不受支持
    pub fn unknown_function(code: i32) -> Self {
        Self::protocol_fault(
            fault_codes::UNKNOWN_FUNCTION,
            format!("未知的诊断功能: {}", code),
        )
    }

    /// 参数错误
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_protocol_fault(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// 协议 fault 的分类，其他错误返回 None
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Protocol { code, .. } => Some(FaultKind::from_code(*code)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DiagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("请求超时: {}", err))
        } else if err.is_connect() {
            Self::transport(format!("无法连接诊断端点: {}", err))
        } else {
            Self::transport(err.to_string())
        }
    }
}

impl From<DiagError> for crate::Error {
    fn from(err: DiagError) -> Self {
        match err {
            DiagError::Transport(message) => crate::Error::Network(message),
            DiagError::InvalidArgument(message) => crate::Error::InvalidArgument(message),
            DiagError::Protocol { code, message } if code == fault_codes::CREDENTIAL_REJECTED => {
                crate::Error::Authentication(message)
            }
            other => crate::Error::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_is_distinguishable() {
        let transport = DiagError::transport("connection reset");
        let fault = DiagError::credential_rejected("bad key");
        let invalid = DiagError::invalid_argument("empty credential");

        assert!(transport.is_transport() && !transport.is_protocol_fault());
        assert!(fault.is_protocol_fault() && !fault.is_transport());
        assert!(invalid.is_invalid_argument());
        assert_eq!(fault.fault_kind(), Some(FaultKind::CredentialRejected));
        assert_eq!(transport.fault_kind(), None);
    }

    #[test]
    fn test_unknown_fault_code() {
        let fault = DiagError::protocol_fault(42, "boom");
        assert_eq!(fault.fault_kind(), Some(FaultKind::Other));
        assert_eq!(fault.to_string(), "协议错误: [42] boom");
    }

    #[test]
    fn test_into_common_error() {
        let err: crate::Error = DiagError::credential_rejected("bad key").into();
        assert!(matches!(err, crate::Error::Authentication(_)));

        let err: crate::Error = DiagError::transport("down").into();
        assert!(matches!(err, crate::Error::Network(_)));

        let err: crate::Error = DiagError::unknown_function(6).into();
        assert!(matches!(err, crate::Error::Protocol(_)));
    }
}

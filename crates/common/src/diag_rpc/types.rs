/// 诊断结果类型
///
/// 结果形状随功能码变化，按功能码打标签，不强求统一结构

use std::fmt;

use super::codec::XmlRpcValue;
use super::message::AuthToken;
use super::DiagError;
use crate::models::FunctionCode;

/// 诊断结果
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticResult {
    /// 认证调用签发的令牌
    Token(AuthToken),
    /// 服务版本字符串
    Version(String),
    /// 仪表盘摘要
    Dashboard(serde_json::Value),
    /// 其他返回字符串的功能
    Text {
        function: FunctionCode,
        value: String,
    },
}

impl DiagnosticResult {
    /// 按请求的功能码解释服务端返回值
    pub fn from_value(function: FunctionCode, value: XmlRpcValue) -> Result<Self, DiagError> {
        match function {
            FunctionCode::Authenticate => match value {
                XmlRpcValue::String(token) if token.is_empty() => {
                    Err(DiagError::credential_rejected("服务端签发了空令牌"))
                }
                XmlRpcValue::String(token) => Ok(Self::Token(AuthToken::new(token))),
                other => Err(unexpected_shape(function, &other)),
            },
            FunctionCode::Version => match value {
                XmlRpcValue::String(version) => Ok(Self::Version(version)),
                other => Err(unexpected_shape(function, &other)),
            },
            FunctionCode::Dashboard => Ok(Self::Dashboard(dashboard_json(value))),
            _ => {
                let value = match value {
                    XmlRpcValue::String(s) => s,
                    other => other.to_json().to_string(),
                };
                Ok(Self::Text { function, value })
            }
        }
    }

    /// 结果对应的功能码
    pub fn function(&self) -> FunctionCode {
        match self {
            Self::Token(_) => FunctionCode::Authenticate,
            Self::Version(_) => FunctionCode::Version,
            Self::Dashboard(_) => FunctionCode::Dashboard,
            Self::Text { function, .. } => *function,
        }
    }

    pub fn as_version(&self) -> Option<&str> {
        match self {
            Self::Version(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dashboard(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Dashboard(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_token(self) -> Option<AuthToken> {
        match self {
            Self::Token(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for DiagnosticResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => write!(f, "{:?}", token),
            Self::Version(version) => write!(f, "{}", version),
            Self::Dashboard(dashboard) => write!(f, "{}", dashboard),
            Self::Text { value, .. } => write!(f, "{}", value),
        }
    }
}

/// struct/array 直接转换；字符串若是 JSON 文本则解析，否则原样保留
fn dashboard_json(value: XmlRpcValue) -> serde_json::Value {
    match value {
        XmlRpcValue::String(text) => serde_json::from_str(&text)
            .unwrap_or(serde_json::Value::String(text)),
        other => other.to_json(),
    }
}

fn unexpected_shape(function: FunctionCode, value: &XmlRpcValue) -> DiagError {
    DiagError::malformed_response(format!(
        "{} 应返回 string，实际为 {}",
        function.as_str(),
        value.type_name()
    ))
}

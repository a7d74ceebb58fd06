/// 诊断 RPC 请求定义

use std::fmt;

use super::codec::{is_xml_char, XmlRpcValue};
use super::DiagError;
use crate::models::{constants, FunctionCode};
use crate::utils::mask_secret;

/// 预共享密钥
///
/// 每个会话只在认证调用中使用一次
#[derive(Clone, PartialEq, Eq)]
pub struct PresharedKey(String);

impl PresharedKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PresharedKey({})", mask_secret(&self.0))
    }
}

/// 授权令牌
///
/// 由服务端签发的不透明字符串，原样转发，不解析、不持久化
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken({})", mask_secret(&self.0))
    }
}

/// 凭证槽位内容
///
/// 认证调用只能携带预共享密钥，其余调用只能携带令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    PresharedKey(PresharedKey),
    Token(AuthToken),
}

impl Credential {
    pub fn preshared_key(key: impl Into<String>) -> Self {
        Self::PresharedKey(PresharedKey::new(key))
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(AuthToken::new(token))
    }

    /// 线上发送的原始字符串
    pub fn as_wire(&self) -> &str {
        match self {
            Self::PresharedKey(key) => key.expose(),
            Self::Token(token) => token.as_str(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_wire().is_empty()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::PresharedKey(_) => "psk",
            Self::Token(_) => "token",
        }
    }

    /// 日志中可显示的形式
    pub fn masked(&self) -> String {
        format!("{}:{}", self.kind(), mask_secret(self.as_wire()))
    }
}

impl From<PresharedKey> for Credential {
    fn from(key: PresharedKey) -> Self {
        Self::PresharedKey(key)
    }
}

impl From<AuthToken> for Credential {
    fn from(token: AuthToken) -> Self {
        Self::Token(token)
    }
}

/// 协议规定的填充参数
///
/// 按线上顺序排列（int, int, string, int, string），客户端不赋予任何含义，默认全零/空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedArgs {
    pub int_a: i32,
    pub int_b: i32,
    pub text_a: String,
    pub int_c: i32,
    pub text_b: String,
}

/// 线上调用的 7 元组：function, int_a, int_b, text_a, int_c, text_b, credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCall {
    pub function: i32,
    pub reserved: ReservedArgs,
    pub credential: String,
}

impl WireCall {
    /// 转换为 XML-RPC 参数列表
    pub fn to_params(&self) -> Vec<XmlRpcValue> {
        vec![
            XmlRpcValue::Int(self.function),
            XmlRpcValue::Int(self.reserved.int_a),
            XmlRpcValue::Int(self.reserved.int_b),
            XmlRpcValue::String(self.reserved.text_a.clone()),
            XmlRpcValue::Int(self.reserved.int_c),
            XmlRpcValue::String(self.reserved.text_b.clone()),
            XmlRpcValue::String(self.credential.clone()),
        ]
    }

    /// 从 XML-RPC 参数列表解析，要求严格的 iiisiss 形状
    pub fn from_params(params: &[XmlRpcValue]) -> Result<Self, DiagError> {
        if params.len() != constants::DIAGNOSE_PARAM_COUNT {
            return Err(DiagError::invalid_argument(format!(
                "参数个数应为 {}，实际 {}",
                constants::DIAGNOSE_PARAM_COUNT,
                params.len()
            )));
        }

        let int_at = |i: usize| {
            params[i].as_i32().ok_or_else(|| {
                DiagError::invalid_argument(format!(
                    "第 {} 个参数应为 int，实际为 {}",
                    i + 1,
                    params[i].type_name()
                ))
            })
        };
        let str_at = |i: usize| {
            params[i].as_str().map(str::to_string).ok_or_else(|| {
                DiagError::invalid_argument(format!(
                    "第 {} 个参数应为 string，实际为 {}",
                    i + 1,
                    params[i].type_name()
                ))
            })
        };

        Ok(Self {
            function: int_at(0)?,
            reserved: ReservedArgs {
                int_a: int_at(1)?,
                int_b: int_at(2)?,
                text_a: str_at(3)?,
                int_c: int_at(4)?,
                text_b: str_at(5)?,
            },
            credential: str_at(6)?,
        })
    }
}

/// 诊断请求
///
/// 构造时校验凭证非空，且凭证种类与功能码匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRequest {
    function: FunctionCode,
    reserved: ReservedArgs,
    credential: Credential,
}

impl DiagnosticRequest {
    pub fn new(
        function: FunctionCode,
        reserved: ReservedArgs,
        credential: Credential,
    ) -> Result<Self, DiagError> {
        if credential.is_empty() {
            return Err(DiagError::invalid_argument(format!(
                "{} 调用的凭证为空",
                function.as_str()
            )));
        }

        if !credential.as_wire().chars().all(is_xml_char) {
            return Err(DiagError::invalid_argument(format!(
                "{} 调用的凭证包含无法编码的控制字符",
                function.as_str()
            )));
        }
        if !reserved.text_a.chars().chain(reserved.text_b.chars()).all(is_xml_char) {
            return Err(DiagError::invalid_argument("保留参数包含无法编码的控制字符"));
        }

        match (&credential, function.is_authenticate()) {
            (Credential::PresharedKey(_), false) => {
                return Err(DiagError::invalid_argument(format!(
                    "{} 调用必须使用令牌，不能发送预共享密钥",
                    function.as_str()
                )));
            }
            (Credential::Token(_), true) => {
                return Err(DiagError::invalid_argument(
                    "认证调用必须使用预共享密钥",
                ));
            }
            _ => {}
        }

        Ok(Self {
            function,
            reserved,
            credential,
        })
    }

    /// 认证请求
    pub fn authenticate(key: &PresharedKey) -> Result<Self, DiagError> {
        Self::new(
            FunctionCode::Authenticate,
            ReservedArgs::default(),
            Credential::PresharedKey(key.clone()),
        )
    }

    /// 携带令牌的诊断请求
    pub fn diagnostic(function: FunctionCode, token: &AuthToken) -> Result<Self, DiagError> {
        Self::new(function, ReservedArgs::default(), Credential::Token(token.clone()))
    }

    pub fn function(&self) -> FunctionCode {
        self.function
    }

    pub fn reserved(&self) -> &ReservedArgs {
        &self.reserved
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn to_wire(&self) -> WireCall {
        WireCall {
            function: self.function.code(),
            reserved: self.reserved.clone(),
            credential: self.credential.as_wire().to_string(),
        }
    }
}

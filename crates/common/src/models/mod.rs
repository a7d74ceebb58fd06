/// 共享数据模型
///
/// 定义客户端与诊断服务共享的功能码、参数类型和常量

use std::fmt;
use std::str::FromStr;

use crate::diag_rpc::DiagError;

/// 诊断功能码
///
/// 取值由诊断服务定义，客户端只能从中选择，不能自造
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    Version = 1,
    Authenticate = 2,
    Params = 3,
    Status = 4,
    Terminate = 5,
    SharedMemory = 6,
    ImageRoot = 7,
    Credentials = 8,
    AuthUserName = 9,
    AuthFirstName = 10,
    AuthLastName = 11,
    AuthLevel = 12,
    Dashboard = 13,
}

impl FunctionCode {
    /// 服务端识别的全部功能码
    pub const ALL: [FunctionCode; 13] = [
        Self::Version,
        Self::Authenticate,
        Self::Params,
        Self::Status,
        Self::Terminate,
        Self::SharedMemory,
        Self::ImageRoot,
        Self::Credentials,
        Self::AuthUserName,
        Self::AuthFirstName,
        Self::AuthLastName,
        Self::AuthLevel,
        Self::Dashboard,
    ];

    /// 线上整数码
    pub fn code(self) -> i32 {
        self as i32
    }

    /// 从整数码解析，未识别返回 None
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.code() == code)
    }

    /// 服务端日志中使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version => "VERSION",
            Self::Authenticate => "AUTH",
            Self::Params => "PARMS",
            Self::Status => "STATUS",
            Self::Terminate => "TERM",
            Self::SharedMemory => "GETSHM",
            Self::ImageRoot => "GETIMGROOT",
            Self::Credentials => "GETCRED",
            Self::AuthUserName => "GETUSERNAME",
            Self::AuthFirstName => "GETFIRSTNAME",
            Self::AuthLastName => "GETLASTNAME",
            Self::AuthLevel => "GETLEVEL",
            Self::Dashboard => "GETDASHBOARD",
        }
    }

    /// 命令行中使用的短名称
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Authenticate => "auth",
            Self::Params => "params",
            Self::Status => "status",
            Self::Terminate => "term",
            Self::SharedMemory => "shm",
            Self::ImageRoot => "img-root",
            Self::Credentials => "cred",
            Self::AuthUserName => "user-name",
            Self::AuthFirstName => "first-name",
            Self::AuthLastName => "last-name",
            Self::AuthLevel => "level",
            Self::Dashboard => "dashboard",
        }
    }

    pub fn is_authenticate(self) -> bool {
        self == Self::Authenticate
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.code())
    }
}

impl TryFrom<i32> for FunctionCode {
    type Error = DiagError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
            .ok_or_else(|| DiagError::invalid_argument(format!("未识别的功能码: {}", code)))
    }
}

impl FromStr for FunctionCode {
    type Err = DiagError;

    /// 接受整数码、服务端名称或短名称（不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return Self::try_from(code);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s) || f.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DiagError::invalid_argument(format!("未识别的诊断功能: {}", s)))
    }
}

/// 保留参数的类型标记
///
/// 服务端只在日志中使用，客户端一律发送 None
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    None = 0,
    Int = 1,
    String = 2,
    Float = 3,
    Bool = 4,
}

impl ArgType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Int),
            2 => Some(Self::String),
            3 => Some(Self::Float),
            4 => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Int => "INT",
            Self::String => "STRING",
            Self::Float => "FLOAT",
            Self::Bool => "BOOL",
        }
    }
}

/// 常量定义
pub mod constants {
    /// 默认诊断服务端口
    pub const DEFAULT_RPC_PORT: u16 = 5164;

    /// 诊断服务 HTTP 路径
    pub const RPC_PATH: &str = "/RPC2";

    /// 诊断方法名
    pub const DIAGNOSE_METHOD: &str = "diagnose";

    /// 每次调用的参数个数（iiisiss）
    pub const DIAGNOSE_PARAM_COUNT: usize = 7;

    /// 凭证被拒时旧版服务返回的带内字符串
    pub const LEGACY_CREDENTIAL_REJECTED: &str = "Synchronization Error!!";

    /// 功能码不受支持时旧版服务返回的带内字符串
    pub const LEGACY_UNKNOWN_REQUEST: &str = "Unknown Request";

    /// 默认认证失败惩罚延迟（秒）
    pub const DEFAULT_AUTH_FAILURE_DELAY: u64 = 10;
}

/// Diag RPC - 公共库
///
/// 提供诊断客户端、认证握手、参考服务端共享的类型、错误处理、工具函数等

pub mod config;
pub mod errors;
pub mod models;
pub mod utils;
pub mod diag_rpc;

// 重新导出常用类型
pub use config::DiagConfig;
pub use errors::{Error, Result};
pub use models::FunctionCode;
pub use diag_rpc::{
    AuthToken, Credential, DiagClient, DiagError, DiagSession, DiagnosticRequest,
    DiagnosticResult, PresharedKey, ReservedArgs, SessionError, SessionStage, SessionState,
};

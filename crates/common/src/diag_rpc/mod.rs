/// 诊断 RPC 模块
///
/// 预共享密钥换取令牌，再用令牌调用诊断功能

pub mod codec;
pub mod error;
pub mod message;
pub mod types;
pub mod transport;
pub mod client;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::DiagClient;
pub use codec::{MethodResponse, XmlRpcValue};
pub use error::{fault_codes, DiagError, FaultKind};
pub use message::{AuthToken, Credential, DiagnosticRequest, PresharedKey, ReservedArgs, WireCall};
pub use session::{run_session, DiagSession, SessionError, SessionStage, SessionState};
pub use transport::{DiagTransport, HttpTransport};
pub use types::DiagnosticResult;

/// XML-RPC 接口

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Router,
};
use common::diag_rpc::{codec, fault_codes, DiagError};
use common::models::constants;
use tracing::{debug, warn};

use crate::app_state::AppState;

/// RPC 路由
pub fn rpc_routes() -> Router<AppState> {
    Router::new().route(constants::RPC_PATH, post(handle_rpc))
}

/// 处理一次 XML-RPC 请求
///
/// 协议错误以 fault 报文返回，HTTP 状态码始终为 200
pub async fn handle_rpc(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let xml = match codec::decode_call(&body) {
        Ok((method, params)) => {
            debug!("📥 收到 RPC 调用: method={}, params={}", method, params.len());
            match state.diagnose_service().handle(&method, &params).await {
                Ok(value) => codec::encode_response(&value),
                Err(e) => fault_response(e),
            }
        }
        Err(e) => {
            warn!("⚠️ 无法解析请求报文: {}", e);
            fault_response(e)
        }
    };

    ([(header::CONTENT_TYPE, "text/xml")], xml)
}

fn fault_response(err: DiagError) -> String {
    match err {
        DiagError::Protocol { code, message } => codec::encode_fault(code, &message),
        other => codec::encode_fault(fault_codes::MALFORMED_REQUEST, &other.to_string()),
    }
}

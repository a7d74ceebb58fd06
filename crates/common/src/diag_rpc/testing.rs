/// 测试用的桩传输：模拟诊断服务并记录每次调用

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::codec::XmlRpcValue;
use super::error::fault_codes;
use super::message::WireCall;
use super::transport::DiagTransport;
use super::DiagError;
use crate::models::FunctionCode;

pub struct StubTransport {
    psk: String,
    token: String,
    values: HashMap<i32, XmlRpcValue>,
    faults: HashMap<i32, (i32, String)>,
    unreachable: bool,
    broken: HashSet<i32>,
    calls: Mutex<Vec<i32>>,
}

impl StubTransport {
    pub fn new(psk: &str, token: &str) -> Self {
        Self {
            psk: psk.to_string(),
            token: token.to_string(),
            values: HashMap::new(),
            faults: HashMap::new(),
            unreachable: false,
            broken: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_value(mut self, function: FunctionCode, value: XmlRpcValue) -> Self {
        self.values.insert(function.code(), value);
        self
    }

    pub fn with_fault(mut self, function: FunctionCode, code: i32, message: &str) -> Self {
        self.faults.insert(function.code(), (code, message.to_string()));
        self
    }

    /// 指定功能的调用在传输层失败（连接中断）
    pub fn with_transport_error(mut self, function: FunctionCode) -> Self {
        self.broken.insert(function.code());
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// 已观察到的功能码（按调用顺序）
    pub fn calls(&self) -> Vec<i32> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// 认证以外的调用次数
    pub fn diagnostic_call_count(&self) -> usize {
        self.calls()
            .into_iter()
            .filter(|c| *c != FunctionCode::Authenticate.code())
            .count()
    }

    fn default_value(function: i32) -> XmlRpcValue {
        match FunctionCode::from_code(function) {
            Some(FunctionCode::Version) => XmlRpcValue::from("v1.0.0"),
            Some(FunctionCode::Dashboard) => {
                let mut members = BTreeMap::new();
                members.insert("status".to_string(), XmlRpcValue::from("ok"));
                XmlRpcValue::Struct(members)
            }
            Some(other) => XmlRpcValue::String(format!("{}-result", other.short_name())),
            None => XmlRpcValue::from("Unknown Request"),
        }
    }
}

#[async_trait]
impl DiagTransport for StubTransport {
    async fn call(&self, _method: &str, params: Vec<XmlRpcValue>) -> Result<XmlRpcValue, DiagError> {
        let call = WireCall::from_params(&params)
            .map_err(|e| DiagError::protocol_fault(fault_codes::MALFORMED_REQUEST, e.to_string()))?;
        self.calls.lock().unwrap().push(call.function);

        if self.unreachable || self.broken.contains(&call.function) {
            return Err(DiagError::transport("connection refused"));
        }

        if call.function == FunctionCode::Authenticate.code() {
            return if call.credential == self.psk {
                Ok(XmlRpcValue::String(self.token.clone()))
            } else {
                Err(DiagError::credential_rejected("Synchronization Error"))
            };
        }

        if call.credential != self.token {
            return Err(DiagError::credential_rejected("Synchronization Error"));
        }

        if let Some((code, message)) = self.faults.get(&call.function) {
            return Err(DiagError::protocol_fault(*code, message.clone()));
        }

        Ok(self
            .values
            .get(&call.function)
            .cloned()
            .unwrap_or_else(|| Self::default_value(call.function)))
    }
}

/// XML-RPC 编解码
///
/// 仅支持 `diagnose` 方法用到的值类型：int / boolean / string / double / array / struct

use roxmltree::{Document, Node};
use std::collections::BTreeMap;

use super::DiagError;

/// XML-RPC 值
#[derive(Debug, Clone, PartialEq)]
pub enum XmlRpcValue {
    Int(i32),
    Boolean(bool),
    String(String),
    Double(f64),
    Array(Vec<XmlRpcValue>),
    Struct(BTreeMap<String, XmlRpcValue>),
}

impl XmlRpcValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// 类型名称（用于错误信息）
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
            Self::Double(_) => "double",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
        }
    }

    /// 转换为 JSON 值
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Boolean(b) => serde_json::Value::from(*b),
            Self::String(s) => serde_json::Value::from(s.as_str()),
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.to_json()).collect())
            }
            Self::Struct(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// 从 JSON 值构造；null 映射为空字符串，超出 i32 的整数映射为 double
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::String(String::new()),
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(i) => Self::Int(i),
                None => Self::Double(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(members) => Self::Struct(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Self::Int(i) => out.push_str(&format!("<i4>{}</i4>", i)),
            Self::Boolean(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
            Self::String(s) => out.push_str(&format!("<string>{}</string>", escape(s))),
            Self::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
            Self::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Self::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str(&format!("<member><name>{}</name>", escape(name)));
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
        }
        out.push_str("</value>");
    }
}

impl From<i32> for XmlRpcValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for XmlRpcValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for XmlRpcValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for XmlRpcValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// 方法响应
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(XmlRpcValue),
    Fault { code: i32, message: String },
}

/// 编码 methodCall
pub fn encode_call(method: &str, params: &[XmlRpcValue]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    xml.push_str(&format!("<methodName>{}</methodName><params>", escape(method)));
    for param in params {
        xml.push_str("<param>");
        param.write_xml(&mut xml);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>\n");
    xml
}

/// 编码成功响应
pub fn encode_response(value: &XmlRpcValue) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodResponse><params><param>");
    value.write_xml(&mut xml);
    xml.push_str("</param></params></methodResponse>\n");
    xml
}

/// 编码 fault 响应
pub fn encode_fault(code: i32, message: &str) -> String {
    let mut members = BTreeMap::new();
    members.insert("faultCode".to_string(), XmlRpcValue::Int(code));
    members.insert("faultString".to_string(), XmlRpcValue::String(message.to_string()));

    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodResponse><fault>");
    XmlRpcValue::Struct(members).write_xml(&mut xml);
    xml.push_str("</fault></methodResponse>\n");
    xml
}

/// 解码 methodCall，返回方法名与参数
///
/// 报文错误以 MALFORMED_REQUEST fault 返回
pub fn decode_call(xml: &str) -> Result<(String, Vec<XmlRpcValue>), DiagError> {
    parse_call(xml).map_err(|e| DiagError::malformed_request(e.0))
}

/// 解码 methodResponse
///
/// 报文错误属于传输错误
pub fn decode_response(xml: &str) -> Result<MethodResponse, DiagError> {
    parse_response(xml).map_err(|e| DiagError::malformed_response(e.0))
}

/// 报文结构错误，由调用方决定归入哪类错误
struct Malformed(String);

impl Malformed {
    fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

impl From<roxmltree::Error> for Malformed {
    fn from(err: roxmltree::Error) -> Self {
        Self::new(err)
    }
}

fn parse_call(xml: &str) -> Result<(String, Vec<XmlRpcValue>), Malformed> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    expect_tag(root, "methodCall")?;

    let method = child(root, "methodName")
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Malformed::new("缺少 methodName"))?;

    let params = match child(root, "params") {
        Some(params) => decode_params(params)?,
        None => Vec::new(),
    };

    Ok((method, params))
}

fn parse_response(xml: &str) -> Result<MethodResponse, Malformed> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    expect_tag(root, "methodResponse")?;

    if let Some(fault) = child(root, "fault") {
        let value = child(fault, "value")
            .ok_or_else(|| Malformed::new("fault 缺少 value"))
            .and_then(decode_value)?;
        let XmlRpcValue::Struct(members) = value else {
            return Err(Malformed::new("fault 不是 struct"));
        };
        let code = members
            .get("faultCode")
            .and_then(XmlRpcValue::as_i32)
            .ok_or_else(|| Malformed::new("fault 缺少 faultCode"))?;
        let message = members
            .get("faultString")
            .and_then(XmlRpcValue::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(MethodResponse::Fault { code, message });
    }

    let params = child(root, "params")
        .ok_or_else(|| Malformed::new("响应缺少 params"))
        .and_then(decode_params)?;

    match <[XmlRpcValue; 1]>::try_from(params) {
        Ok([value]) => Ok(MethodResponse::Success(value)),
        Err(params) => Err(Malformed::new(format!(
            "响应应包含 1 个返回值，实际 {} 个",
            params.len()
        ))),
    }
}

fn decode_params(params: Node<'_, '_>) -> Result<Vec<XmlRpcValue>, Malformed> {
    elements(params)
        .filter(|n| n.has_tag_name("param"))
        .map(|param| {
            child(param, "value")
                .ok_or_else(|| Malformed::new("param 缺少 value"))
                .and_then(decode_value)
        })
        .collect()
}

fn decode_value(value: Node<'_, '_>) -> Result<XmlRpcValue, Malformed> {
    // 没有类型标签的 <value> 按字符串处理
    let Some(typed) = elements(value).next() else {
        return Ok(XmlRpcValue::String(text_of(value)));
    };

    let text = text_of(typed);
    match typed.tag_name().name() {
        "i4" | "int" => text
            .trim()
            .parse()
            .map(XmlRpcValue::Int)
            .map_err(|e| Malformed::new(format!("非法整数 {:?}: {}", text, e))),
        "boolean" => match text.trim() {
            "1" => Ok(XmlRpcValue::Boolean(true)),
            "0" => Ok(XmlRpcValue::Boolean(false)),
            other => Err(Malformed::new(format!("非法布尔值: {:?}", other))),
        },
        "string" => Ok(XmlRpcValue::String(text)),
        "double" => text
            .trim()
            .parse()
            .map(XmlRpcValue::Double)
            .map_err(|e| Malformed::new(format!("非法浮点数 {:?}: {}", text, e))),
        "array" => {
            let data = child(typed, "data")
                .ok_or_else(|| Malformed::new("array 缺少 data"))?;
            elements(data)
                .filter(|n| n.has_tag_name("value"))
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(XmlRpcValue::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in elements(typed).filter(|n| n.has_tag_name("member")) {
                let name = child(member, "name")
                    .map(text_of)
                    .ok_or_else(|| Malformed::new("member 缺少 name"))?;
                let value = child(member, "value")
                    .ok_or_else(|| Malformed::new("member 缺少 value"))
                    .and_then(decode_value)?;
                members.insert(name, value);
            }
            Ok(XmlRpcValue::Struct(members))
        }
        other => Err(Malformed::new(format!(
            "不支持的 XML-RPC 类型: {}",
            other
        ))),
    }
}

fn expect_tag(node: Node<'_, '_>, tag: &str) -> Result<(), Malformed> {
    if node.has_tag_name(tag) {
        Ok(())
    } else {
        Err(Malformed::new(format!(
            "根元素应为 {}，实际为 {}",
            tag,
            node.tag_name().name()
        )))
    }
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.has_tag_name(tag))
}

fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            // 字符引用不参与换行规范化，空白按原样往返
            '\r' => out.push_str("&#13;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

/// XML 1.0 能承载的字符
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

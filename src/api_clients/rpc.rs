use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::constants::JSONRPC_VERSION;

/// One JSON-RPC 2.0 request envelope.
///
/// `params` is omitted from the wire entirely when empty; the backend
/// rejects an empty `params` object, so this is a compatibility
/// requirement, not cosmetics.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Build an envelope for `method`. The id defaults to a freshly
    /// generated opaque token; callers supplying their own id must not
    /// reuse it across concurrent calls.
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            id: id.unwrap_or_else(generate_request_id),
            params: params.filter(|p| !is_empty_params(p)),
        }
    }
}

/// Generate an opaque request id, unique per in-flight call.
pub fn generate_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Build the `tools/call` params object: `{name}` plus `arguments` only
/// when there are any arguments to send.
pub fn tool_call_params(name: &str, arguments: Option<Value>) -> Value {
    let mut params = serde_json::Map::new();
    params.insert("name".to_string(), Value::String(name.to_string()));
    if let Some(args) = arguments {
        if !is_empty_params(&args) {
            params.insert("arguments".to_string(), args);
        }
    }
    Value::Object(params)
}

fn is_empty_params(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

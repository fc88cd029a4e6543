// In: src/bridge/protocol.rs

//! The JSON-RPC style envelope exchanged with the host widget.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// An incoming command. `params` defaults to `null` when omitted.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// **CONTRACT:** Exactly one of `result` and `error` is present.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serializes the response. A response is always representable as JSON,
    /// so this falls back to a fixed error envelope rather than failing.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(
                r#"{{"jsonrpc":"{}","id":null,"error":"response serialization failed: {}"}}"#,
                JSONRPC_VERSION,
                err.to_string().replace('"', "'")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_params_default_to_null() {
        let request: Request = serde_json::from_str(r#"{"id": 4, "method": "clear"}"#).unwrap();
        assert_eq!(request.id, Some(json!(4)));
        assert!(request.params.is_null());
        assert_eq!(request.jsonrpc, None);
    }

    #[test]
    fn test_response_omits_the_unused_half() {
        let ok = serde_json::to_value(Response::success(Some(json!(1)), json!({"atoms": 3}))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": {"atoms": 3}}));

        let err = serde_json::to_value(Response::failure(None, "boom")).unwrap();
        assert_eq!(err, json!({"jsonrpc": "2.0", "id": null, "error": "boom"}));
    }
}

//! JSON-RPC field extraction and message classification (§4.1).
//!
//! Pure functions over a parsed `serde_json::Value`, total on any input —
//! no error cases. Grounded on
//! `examples/original_source/src/mcp_proxy/correlation.py`: that module
//! insulates the rest of the codebase from the MCP SDK's typed message
//! union by pattern-matching on `JSONRPCRequest`/`JSONRPCResponse`/
//! `JSONRPCNotification`/`JSONRPCError`. This crate has no typed union
//! (the parser is out of scope, §1) so classification instead looks at
//! which of `method`/`id`/`result`/`error` keys are present, which is
//! exactly the JSON-RPC 2.0 wire-level discriminant.

use crate::model::JsonRpcId;
use serde_json::Value;

fn id_value(message: &Value) -> Option<JsonRpcId> {
    match message.get("id")? {
        Value::String(s) => Some(JsonRpcId::String(s.clone())),
        Value::Number(n) => n.as_i64().map(JsonRpcId::Number),
        _ => None,
    }
}

/// True iff `message` has both a `method` and an `id` — a JSON-RPC
/// request.
pub fn is_request(message: &Value) -> bool {
    message.get("method").is_some() && message.get("id").is_some()
}

/// True iff `message` has an `id` but no `method` — a JSON-RPC response
/// (`result`) or error (`error`). Both count, per §4.1.
pub fn is_response(message: &Value) -> bool {
    message.get("id").is_some()
        && message.get("method").is_none()
        && (message.get("result").is_some() || message.get("error").is_some())
}

/// True iff `message` has a `method` but no `id` — a JSON-RPC
/// notification.
pub fn is_notification(message: &Value) -> bool {
    message.get("method").is_some() && message.get("id").is_none()
}

/// Extract the JSON-RPC `id` field.
///
/// Present for requests, responses, and errors; absent for
/// notifications.
pub fn extract_jsonrpc_id(message: &Value) -> Option<JsonRpcId> {
    if is_request(message) || is_response(message) {
        id_value(message)
    } else {
        None
    }
}

/// Extract the JSON-RPC `method` field.
///
/// Present for requests and notifications; absent for responses and
/// errors.
pub fn extract_method(message: &Value) -> Option<String> {
    if is_request(message) || is_notification(message) {
        message
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_request() {
        let m = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
        assert!(is_request(&m));
        assert!(!is_response(&m));
        assert!(!is_notification(&m));
        assert_eq!(extract_jsonrpc_id(&m), Some(JsonRpcId::Number(1)));
        assert_eq!(extract_method(&m), Some("tools/list".to_string()));
    }

    #[test]
    fn classifies_success_response() {
        let m = json!({"jsonrpc": "2.0", "id": 1, "result": {}});
        assert!(is_response(&m));
        assert!(!is_request(&m));
        assert_eq!(extract_jsonrpc_id(&m), Some(JsonRpcId::Number(1)));
        assert_eq!(extract_method(&m), None);
    }

    #[test]
    fn classifies_error_response() {
        let m = json!({"jsonrpc": "2.0", "id": "abc", "error": {"code": -1, "message": "x"}});
        assert!(is_response(&m));
        assert_eq!(
            extract_jsonrpc_id(&m),
            Some(JsonRpcId::String("abc".to_string()))
        );
    }

    #[test]
    fn classifies_notification() {
        let m = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(is_notification(&m));
        assert_eq!(extract_jsonrpc_id(&m), None);
        assert_eq!(
            extract_method(&m),
            Some("notifications/initialized".to_string())
        );
    }

    #[test]
    fn numeric_and_string_ids_are_distinct_values() {
        let num = json!({"jsonrpc": "2.0", "id": 1, "method": "x"});
        let str_id = json!({"jsonrpc": "2.0", "id": "1", "method": "x"});
        assert_ne!(extract_jsonrpc_id(&num), extract_jsonrpc_id(&str_id));
    }
}

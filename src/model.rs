//! Core data model: the envelope every JSON-RPC message is wrapped in as
//! it crosses the proxy (§3), plus the small enums that tag it.
//!
//! Grounded on `examples/original_source/src/mcp_proxy/models.py`, ported
//! to idiomatic Rust: the Python `StrEnum`s become `#[serde(rename_all =
//! "snake_case")]` enums, and the dataclass-style envelope becomes a
//! plain `Serialize`/`Deserialize` struct (session persistence round-
//! trips it directly, per §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Direction of a proxied message relative to the MCP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Message flowing from the MCP client to the server.
    ClientToServer,
    /// Message flowing from the MCP server to the client.
    ServerToClient,
}

/// MCP transport type in use for a proxy session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Standard input/output transport.
    Stdio,
    /// Server-Sent Events transport (protocol slot only — see Non-goals).
    Sse,
    /// Streamable HTTP transport (protocol slot only — see Non-goals).
    StreamableHttp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Sse => write!(f, "sse"),
            Self::StreamableHttp => write!(f, "streamable_http"),
        }
    }
}

/// Operating mode for the intercept engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptMode {
    /// Messages flow through without being held for inspection.
    Passthrough,
    /// Messages are held for external inspection before forwarding.
    Intercept,
}

/// Action taken on a held message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptAction {
    /// Forward the message to its destination unchanged.
    Forward,
    /// Forward the message with the caller's modifications applied.
    Modify,
    /// Discard the message without forwarding.
    Drop,
}

/// A JSON-RPC `id`, kept as its own type (rather than a bare
/// `serde_json::Value`) so it can live as a `HashMap` key in the
/// correlation map and so that a numeric id and a string id holding the
/// same digits are never considered equal — §4.4's tie-break note:
/// "If a request and its response have different `jsonrpc_id` types...
/// they do not correlate."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// Integer id, the common case for MCP clients.
    Number(i64),
    /// String id.
    String(String),
}

impl std::fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// One JSON-RPC message as it traverses the proxy (§3 "Message envelope").
///
/// Field names diverge from their Rust identifiers on the wire
/// (`id` → `proxy_id`, `raw` → `payload`, `original_raw` →
/// `original_payload`) to match the persisted session schema of §4.5,
/// grounded on `examples/original_source/src/mcp_proxy/session_store.py`'s
/// `to_proxy_session` serialization, which uses those exact keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyMessage {
    /// Proxy-assigned unique id (UUID v4). Identity within a session.
    #[serde(rename = "proxy_id")]
    pub id: String,

    /// Monotonic non-negative sequence number, unique within a session,
    /// assigned by the pipeline's shared counter at capture time.
    pub sequence: u64,

    /// UTC instant of capture at the proxy.
    pub timestamp: DateTime<Utc>,

    /// Which way the message is flowing.
    pub direction: Direction,

    /// Transport this session is using.
    pub transport: TransportKind,

    /// The JSON-RPC message itself, opaque to the envelope.
    #[serde(rename = "payload")]
    pub raw: Value,

    /// Extracted `id` field: present for requests, responses, and
    /// errors; absent for notifications.
    pub jsonrpc_id: Option<JsonRpcId>,

    /// Extracted `method` field: present for requests and
    /// notifications; absent for responses and errors.
    pub method: Option<String>,

    /// Proxy-id of the request this response matches, if any.
    pub correlated_id: Option<String>,

    /// True iff the message was rewritten (via intercept) before being
    /// forwarded.
    pub modified: bool,

    /// Pre-modification snapshot of `raw`; present iff `modified`.
    #[serde(rename = "original_payload", skip_serializing_if = "Option::is_none")]
    pub original_raw: Option<Value>,
}

impl ProxyMessage {
    /// Whether this envelope was ever held in intercept mode and
    /// rewritten rather than simply forwarded or dropped.
    pub fn was_modified(&self) -> bool {
        self.modified && self.original_raw.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonrpc_id_number_and_string_are_distinct() {
        let n = JsonRpcId::Number(1);
        let s = JsonRpcId::String("1".to_string());
        assert_ne!(n, s);
    }

    #[test]
    fn transport_kind_display() {
        assert_eq!(TransportKind::Stdio.to_string(), "stdio");
        assert_eq!(TransportKind::StreamableHttp.to_string(), "streamable_http");
    }

    #[test]
    fn serde_round_trip_preserves_all_fields() {
        let msg = ProxyMessage {
            id: "abc".to_string(),
            sequence: 3,
            timestamp: Utc::now(),
            direction: Direction::ClientToServer,
            transport: TransportKind::Stdio,
            raw: serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
            jsonrpc_id: Some(JsonRpcId::Number(1)),
            method: Some("tools/list".to_string()),
            correlated_id: None,
            modified: false,
            original_raw: None,
        };

        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: ProxyMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, msg.id);
        assert_eq!(decoded.sequence, msg.sequence);
        assert_eq!(decoded.jsonrpc_id, msg.jsonrpc_id);
        assert_eq!(decoded.raw, msg.raw);
    }
}

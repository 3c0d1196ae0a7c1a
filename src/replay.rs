//! Replay engine: re-sends a captured session's client-to-server
//! messages against a live adapter (§4.6).
//!
//! Grounded on `examples/original_source/src/mcp_proxy/replay.py`:
//! `ReplayResult`/`ReplaySessionResult` map directly, `_send_handshake`'s
//! `_HANDSHAKE_ID = "__handshake__"` sentinel and best-effort wait are
//! kept verbatim, and `_read_response`'s loop-until-matching-id is
//! reproduced with a `tokio::time::timeout` wrapping the whole read loop
//! rather than per-iteration, matching `asyncio.wait_for` wrapping the
//! entire `_read_response` call in the source.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::correlation;
use crate::error::ProxyResult;
use crate::model::{Direction, JsonRpcId, ProxyMessage};
use crate::session::PersistedSession;
use crate::transport::TransportAdapter;

/// Sentinel id for the synthetic `initialize` handshake request, kept
/// from the source this is grounded on so replayed sessions captured
/// before this crate existed still read the same way.
const HANDSHAKE_ID: &str = "__handshake__";

/// Client identity sent in the synthetic handshake's `clientInfo`.
const HANDSHAKE_CLIENT_NAME: &str = "mcp-proxy-replay";
const HANDSHAKE_CLIENT_VERSION: &str = "0.1.0";

/// Outcome of replaying a single message (§4.6's `ReplayResult`).
///
/// Grounded on `examples/original_source/src/mcp_proxy/replay.py`'s
/// `ReplayResult` dataclass: one bad message never aborts the replay, so
/// a write failure or timeout is a value on this struct, not a
/// propagated error (§7 "Replay errors are values, not exceptions").
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    /// The original captured envelope that was replayed.
    pub original_request: ProxyMessage,
    /// The payload actually sent (= `original_request.raw` at replay
    /// time, which may differ from a pre-intercept `original_raw`).
    pub sent: Value,
    /// The response received, if one was expected and arrived in time.
    pub response: Option<Value>,
    /// Failure description: a write failure or a timeout. `None` on
    /// success (including notifications, which expect no response).
    pub error: Option<String>,
    /// Wall-clock time from send to result, in milliseconds.
    pub elapsed_ms: u64,
}

impl ReplayResult {
    /// Whether this result records a per-message timeout (not a hard
    /// adapter failure).
    pub fn timed_out(&self) -> bool {
        self.error
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains("timeout"))
    }
}

/// Outcome of replaying an entire session (§4.6's `ReplaySessionResult`).
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySessionResult {
    /// Session id that was replayed.
    pub session_id: String,
    /// Whether a synthetic handshake was sent before the captured
    /// messages.
    pub handshake_sent: bool,
    /// Server command line the replay targeted, for stdio sessions.
    pub target_command: Option<String>,
    /// Server URL the replay targeted, for network transports.
    pub target_url: Option<String>,
    /// Per-message results, in replay order.
    pub results: Vec<ReplayResult>,
}

impl ReplaySessionResult {
    /// Number of messages that expected a response but timed out.
    pub fn timeout_count(&self) -> usize {
        self.results.iter().filter(|r| r.timed_out()).count()
    }
}

/// Replay every client-to-server message of `session` against `adapter`.
///
/// Server-to-client messages captured in the session are not replayed —
/// they were produced by the original server, not sent by the client
/// (§4.6). If `auto_handshake` is true and the session's first
/// client-to-server message is not already an `initialize` request, a
/// synthetic handshake is sent first (best effort: its response is
/// awaited but a timeout there does not abort the replay).
///
/// Never fails outright: a write failure or a missing response is
/// recorded per-message in the returned [`ReplayResult`] and replay
/// continues with the next captured message (§7).
pub async fn replay_messages(
    session: &PersistedSession,
    adapter: &dyn TransportAdapter,
    timeout: Duration,
    auto_handshake: bool,
) -> ProxyResult<ReplaySessionResult> {
    let client_messages: Vec<&ProxyMessage> = session
        .messages
        .iter()
        .filter(|m| m.direction == Direction::ClientToServer)
        .collect();

    let needs_handshake = auto_handshake
        && !client_messages
            .first()
            .is_some_and(|m| m.method.as_deref() == Some("initialize"));

    let mut results = Vec::with_capacity(client_messages.len());

    if needs_handshake {
        send_handshake(adapter, timeout).await;
    }

    for message in client_messages {
        results.push(replay_single(adapter, message, timeout).await);
    }

    Ok(ReplaySessionResult {
        session_id: session.id.clone(),
        handshake_sent: needs_handshake,
        target_command: session.server_command.clone(),
        target_url: session.server_url.clone(),
        results,
    })
}

async fn send_handshake(adapter: &dyn TransportAdapter, timeout: Duration) {
    let handshake = serde_json::json!({
        "jsonrpc": "2.0",
        "id": HANDSHAKE_ID,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": HANDSHAKE_CLIENT_NAME,
                "version": HANDSHAKE_CLIENT_VERSION,
            },
        },
    });

    if let Err(err) = adapter.write(handshake).await {
        warn!(%err, "failed to send synthetic handshake, continuing replay anyway");
        return;
    }

    match tokio::time::timeout(
        timeout,
        read_response(adapter, &JsonRpcId::String(HANDSHAKE_ID.to_string())),
    )
    .await
    {
        Ok(Ok(_)) => {
            let notification = serde_json::json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized",
            });
            if let Err(err) = adapter.write(notification).await {
                warn!(%err, "failed to send notifications/initialized after handshake");
            }
        }
        Ok(Err(err)) => {
            warn!(%err, "handshake response read failed, continuing replay anyway");
        }
        Err(_) => {
            debug!("handshake response timed out, continuing replay anyway");
        }
    }
}

async fn replay_single(
    adapter: &dyn TransportAdapter,
    message: &ProxyMessage,
    timeout: Duration,
) -> ReplayResult {
    let start = Instant::now();
    let sent = message.raw.clone();

    if let Err(err) = adapter.write(sent.clone()).await {
        return ReplayResult {
            original_request: message.clone(),
            sent,
            response: None,
            error: Some(format!("Write failed: {err}")),
            elapsed_ms: elapsed_ms(start),
        };
    }

    let Some(expected_id) = message.jsonrpc_id.clone() else {
        // Notifications have no id and expect no response.
        return ReplayResult {
            original_request: message.clone(),
            sent,
            response: None,
            error: None,
            elapsed_ms: elapsed_ms(start),
        };
    };

    match tokio::time::timeout(timeout, read_response(adapter, &expected_id)).await {
        Ok(Ok(response)) => ReplayResult {
            original_request: message.clone(),
            sent,
            response: Some(response),
            error: None,
            elapsed_ms: elapsed_ms(start),
        },
        Ok(Err(err)) => ReplayResult {
            original_request: message.clone(),
            sent,
            response: None,
            error: Some(format!("Read failed: {err}")),
            elapsed_ms: elapsed_ms(start),
        },
        Err(_) => ReplayResult {
            original_request: message.clone(),
            sent,
            response: None,
            error: Some(format!("Timeout after {}s", timeout.as_secs_f64())),
            elapsed_ms: elapsed_ms(start),
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Read frames until one whose `id` matches `expected_id`, discarding
/// anything else (notifications, responses to earlier in-flight
/// requests that outran this one).
async fn read_response(
    adapter: &dyn TransportAdapter,
    expected_id: &JsonRpcId,
) -> crate::error::TransportResult<Value> {
    loop {
        let frame = adapter.read().await?;
        if correlation::is_response(&frame) {
            if let Some(id) = correlation::extract_jsonrpc_id(&frame) {
                if &id == expected_id {
                    return Ok(frame);
                }
            }
        }
    }
}

//! The bidirectional forwarding pipeline (§5).
//!
//! Grounded on `examples/original_source/src/mcp_proxy/pipeline.py`:
//! `PipelineSession` becomes [`PipelineShared`], `run_pipeline`'s
//! `asyncio.TaskGroup` becomes a `tokio::spawn` + `tokio::select!` pair
//! (§5 "Structured concurrency" — if either forward loop ends, the other
//! is aborted rather than left running against a half-closed pipe), and
//! `_forward_loop`'s shared `itertools.count()` sequence plus
//! `correlation_map: dict[str|int, str]` become an `AtomicU64` and a
//! `parking_lot::Mutex<HashMap<JsonRpcId, String>>` respectively.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::correlation;
use crate::error::{ProxyError, ProxyResult};
use crate::intercept::InterceptEngine;
use crate::model::{Direction, InterceptAction, JsonRpcId, ProxyMessage, TransportKind};
use crate::session::SessionStore;
use crate::transport::TransportAdapter;

/// Callbacks fired as messages move through the pipeline.
///
/// All methods are synchronous no-ops by default — a caller overrides
/// only the ones it cares about (logging to a UI, driving a test
/// assertion, streaming to a websocket). Grounded on `PipelineSession`'s
/// `on_message`/`on_held`/`on_forwarded` constructor callbacks, collapsed
/// into one trait so a pipeline run takes a single `Arc<dyn
/// PipelineObserver>` instead of three separate closures.
pub trait PipelineObserver: Send + Sync {
    /// A message was captured, before any intercept decision.
    fn on_message(&self, _message: &ProxyMessage) {}
    /// A message is being held for external release.
    fn on_held(&self, _message: &ProxyMessage) {}
    /// A message was written to its destination (or dropped; check
    /// `message.raw` is unreachable for drops since none is written —
    /// drops are not reported through this callback).
    fn on_forwarded(&self, _message: &ProxyMessage) {}
}

/// Default observer: does nothing. Used when a caller has no need to
/// watch the pipeline (e.g. `replay` builds its own loop, not this one).
#[derive(Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// State shared between the two forward loops of one proxied session.
pub struct PipelineShared {
    session: Arc<SessionStore>,
    intercept: Arc<InterceptEngine>,
    observer: Arc<dyn PipelineObserver>,
    transport: TransportKind,
    sequence: AtomicU64,
    /// Maps a request's `jsonrpc_id` to its proxy-assigned envelope id,
    /// so the matching response — from either direction, since a
    /// server can initiate requests of its own — can set
    /// `correlated_id`. Shared across both forward loops. Entries are
    /// removed once the matching response is seen — if either side
    /// reuses an id before the first response arrives, the second
    /// request silently overwrites the first mapping (§9: id reuse
    /// during an open intercept window is undefined; this crate
    /// resolves it as "most recent wins").
    correlation_map: Mutex<HashMap<JsonRpcId, String>>,
}

impl PipelineShared {
    /// Build shared pipeline state for one session.
    pub fn new(
        session: Arc<SessionStore>,
        intercept: Arc<InterceptEngine>,
        observer: Arc<dyn PipelineObserver>,
        transport: TransportKind,
    ) -> Self {
        Self {
            session,
            intercept,
            observer,
            transport,
            sequence: AtomicU64::new(0),
            correlation_map: Mutex::new(HashMap::new()),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn wrap(&self, raw: serde_json::Value, direction: Direction) -> ProxyMessage {
        let jsonrpc_id = correlation::extract_jsonrpc_id(&raw);
        let method = correlation::extract_method(&raw);
        let proxy_id = Uuid::new_v4().to_string();

        let correlated_id = if correlation::is_request(&raw) {
            if let Some(id) = &jsonrpc_id {
                self.correlation_map
                    .lock()
                    .insert(id.clone(), proxy_id.clone());
            }
            None
        } else if correlation::is_response(&raw) {
            jsonrpc_id
                .as_ref()
                .and_then(|id| self.correlation_map.lock().remove(id))
        } else {
            None
        };

        ProxyMessage {
            id: proxy_id,
            sequence: self.next_sequence(),
            timestamp: chrono::Utc::now(),
            direction,
            transport: self.transport,
            raw,
            jsonrpc_id,
            method,
            correlated_id,
            modified: false,
            original_raw: None,
        }
    }
}

/// Run the bidirectional pipeline until either side closes.
///
/// Spawns one forward loop per direction and races them: whichever
/// finishes first (cleanly via [`crate::error::TransportError::Closed`],
/// or with an error) causes the other to be aborted, matching the
/// `asyncio.TaskGroup` semantics of the source this is grounded on — one
/// side failing tears down the whole session rather than leaving a
/// dangling half-pipeline.
///
/// # Errors
///
/// Returns the first non-`Closed` error encountered by either loop. A
/// clean shutdown (both sides closing) returns `Ok(())`.
pub async fn run_pipeline(
    client: Arc<dyn TransportAdapter>,
    server: Arc<dyn TransportAdapter>,
    shared: Arc<PipelineShared>,
) -> ProxyResult<()> {
    let c2s_shared = shared.clone();
    let c2s_client = client.clone();
    let c2s_server = server.clone();
    let c2s = tokio::spawn(async move {
        forward_loop(
            Direction::ClientToServer,
            c2s_client,
            c2s_server,
            c2s_shared,
        )
        .await
    });

    let s2c_shared = shared.clone();
    let s2c_client = client.clone();
    let s2c_server = server.clone();
    let s2c = tokio::spawn(async move {
        forward_loop(
            Direction::ServerToClient,
            s2c_server,
            s2c_client,
            s2c_shared,
        )
        .await
    });

    let result = tokio::select! {
        res = c2s => {
            s2c.abort();
            res
        }
        res = s2c => {
            c2s.abort();
            res
        }
    };

    let _ = client.close().await;
    let _ = server.close().await;

    match result {
        Ok(inner) => match inner {
            Ok(()) => Ok(()),
            Err(err) if err.is_closed() => Ok(()),
            Err(err) => Err(err),
        },
        Err(join_err) if join_err.is_cancelled() => Ok(()),
        Err(join_err) => Err(ProxyError::session(format!(
            "forward loop task panicked: {join_err}"
        ))),
    }
}

async fn forward_loop(
    direction: Direction,
    source: Arc<dyn TransportAdapter>,
    dest: Arc<dyn TransportAdapter>,
    shared: Arc<PipelineShared>,
) -> ProxyResult<()> {
    loop {
        let raw = source.read().await?;
        let mut message = shared.wrap(raw, direction);
        shared.session.append(message.clone());
        shared.observer.on_message(&message);

        if shared.intercept.should_hold(&message) {
            let ticket = shared.intercept.hold(message.clone());
            shared.observer.on_held(&message);
            let decision = ticket.wait().await?;

            match decision.action {
                InterceptAction::Forward => {}
                InterceptAction::Modify => {
                    let replacement = decision.modified_raw.ok_or_else(|| {
                        ProxyError::intercept("modify decision missing replacement payload")
                    })?;
                    message.original_raw = Some(message.raw.clone());
                    message.raw = replacement;
                    message.modified = true;
                }
                InterceptAction::Drop => {
                    info!(id = %message.id, "dropped message per intercept decision");
                    continue;
                }
            }
        }

        if let Err(err) = dest.write(message.raw.clone()).await {
            if !matches!(err, crate::error::TransportError::Closed) {
                warn!(id = %message.id, %err, "failed to forward message");
            }
            return Err(err.into());
        }
        shared.observer.on_forwarded(&message);
    }
}

//! Intercept engine: holds messages for external inspection and releases
//! them with a decision (§4.3).
//!
//! Grounded on `examples/original_source/src/mcp_proxy/intercept.py`'s
//! `InterceptEngine`, but the rendezvous is reshaped for Rust: the Python
//! original stores a `HeldMessage` with an `asyncio.Event` and has
//! `release()` mutate `action`/`modified_raw` fields on it before setting
//! the event — two callers racing `release()` would both appear to
//! succeed. Here `hold()` returns a [`Held`] ticket wrapping a
//! `tokio::sync::oneshot::Receiver`, and `release()` sends the decision
//! through the matching `Sender`, consuming it — a second `release()` for
//! the same id finds nothing to send to and fails. This is "shared
//! mutable flags with polling" (§9, flagged against) replaced by a
//! single-use channel, per the redesign note on rendezvous coordination.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{ProxyError, ProxyResult};
use crate::model::{InterceptAction, InterceptMode, ProxyMessage};

/// The decision an external caller attaches when releasing a held
/// message.
#[derive(Debug, Clone)]
pub struct ReleaseDecision {
    /// What to do with the message.
    pub action: InterceptAction,
    /// Replacement payload, required iff `action` is
    /// [`InterceptAction::Modify`].
    pub modified_raw: Option<serde_json::Value>,
}

impl ReleaseDecision {
    /// Forward the message unchanged.
    pub fn forward() -> Self {
        Self {
            action: InterceptAction::Forward,
            modified_raw: None,
        }
    }

    /// Forward the message with `raw` substituted.
    pub fn modify(raw: serde_json::Value) -> Self {
        Self {
            action: InterceptAction::Modify,
            modified_raw: Some(raw),
        }
    }

    /// Discard the message.
    pub fn drop_message() -> Self {
        Self {
            action: InterceptAction::Drop,
            modified_raw: None,
        }
    }
}

/// A message currently held, as seen by an external caller inspecting
/// the queue (`get_held`, §4.3).
#[derive(Debug, Clone)]
pub struct HeldEntry {
    /// The held message itself.
    pub message: ProxyMessage,
}

/// Ticket returned to the pipeline's forward loop when it holds a
/// message. Awaiting `wait()` suspends until `release()` is called for
/// this message's id, or the engine is dropped (peer hangs up).
pub struct Held {
    rx: oneshot::Receiver<ReleaseDecision>,
}

impl Held {
    /// Suspend until this message's release decision arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Intercept`] if the engine was dropped
    /// (e.g. proxy shutdown) before a decision was made.
    pub async fn wait(self) -> ProxyResult<ReleaseDecision> {
        self.rx
            .await
            .map_err(|_| ProxyError::intercept("intercept engine dropped before release"))
    }
}

struct HeldSlot {
    entry: HeldEntry,
    sender: oneshot::Sender<ReleaseDecision>,
}

/// Coordinates held messages between the pipeline's forward loops and an
/// external controller (a CLI prompt, a UI, a test harness).
///
/// Internal state is guarded by a `parking_lot::Mutex` held only across
/// synchronous bookkeeping (insert/remove from the held map) — never
/// across an `.await`, per the locking discipline grounded on
/// `turbomcp-transport::child_process`'s comment on `std::sync::Mutex`
/// usage.
pub struct InterceptEngine {
    mode: Mutex<InterceptMode>,
    held: Mutex<HashMap<String, HeldSlot>>,
}

impl InterceptEngine {
    /// Create an engine starting in the given mode.
    pub fn new(mode: InterceptMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Current operating mode.
    pub fn mode(&self) -> InterceptMode {
        *self.mode.lock()
    }

    /// Switch modes. Switching to [`InterceptMode::Passthrough`] drains
    /// every currently held message with [`ReleaseDecision::forward`],
    /// matching `set_mode`'s draining behavior in the source this is
    /// grounded on.
    pub fn set_mode(&self, mode: InterceptMode) {
        *self.mode.lock() = mode;
        if mode == InterceptMode::Passthrough {
            let mut held = self.held.lock();
            for (_, slot) in held.drain() {
                let _ = slot.sender.send(ReleaseDecision::forward());
            }
        }
    }

    /// Whether a message should be held given the current mode.
    ///
    /// Mode-only (§4.3): every envelope, requests and responses alike,
    /// is held while the engine is in [`InterceptMode::Intercept`].
    pub fn should_hold(&self, _message: &ProxyMessage) -> bool {
        self.mode() == InterceptMode::Intercept
    }

    /// Hold `message`, returning a ticket the caller awaits for the
    /// release decision.
    pub fn hold(&self, message: ProxyMessage) -> Held {
        let (tx, rx) = oneshot::channel();
        let entry = HeldEntry {
            message: message.clone(),
        };
        self.held.lock().insert(
            message.id.clone(),
            HeldSlot {
                entry,
                sender: tx,
            },
        );
        Held { rx }
    }

    /// Release a held message by its proxy-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Intercept`] if no message with that id is
    /// currently held (already released, or never held).
    pub fn release(&self, id: &str, decision: ReleaseDecision) -> ProxyResult<()> {
        let slot = self
            .held
            .lock()
            .remove(id)
            .ok_or_else(|| ProxyError::intercept(format!("no message held with id {id}")))?;
        slot.sender
            .send(decision)
            .map_err(|_| ProxyError::intercept("held message's forward loop is gone"))
    }

    /// Snapshot of currently held messages, oldest first is not
    /// guaranteed (backed by a hash map); callers that need ordering
    /// should sort by `message.sequence`.
    pub fn get_held(&self) -> Vec<HeldEntry> {
        self.held.lock().values().map(|s| s.entry.clone()).collect()
    }

    /// Whether a specific id is currently held.
    pub fn is_held(&self, id: &str) -> bool {
        self.held.lock().contains_key(id)
    }
}

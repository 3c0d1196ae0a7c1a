//! Transport adapter contract (§4.2).
//!
//! The pipeline depends only on this trait — never on a concrete
//! transport. Grounded on `turbomcp-transport::core::Transport` (the
//! `#[async_trait]` object-safe trait, `TransportError`/`TransportResult`
//! naming), narrowed to the three operations the design calls for:
//! `read`, `write`, `close`. Everything else `Transport` in the teacher
//! crate carries (capabilities, metrics, state machine, event emitter) is
//! orthogonal to a MITM pipeline and is left out — see `DESIGN.md`.
//!
//! Two concrete implementations exist: [`stdio_server`] (proxy acts as
//! client to the real server) and [`stdio_client`] (proxy acts as server
//! to the real client). SSE and streamable-HTTP are a protocol slot only
//! (`TransportKind::Sse` / `TransportKind::StreamableHttp` exist in the
//! data model) — no client is implemented, per spec Non-goals.

pub mod stdio_client;
pub mod stdio_server;

use crate::error::TransportResult;
use async_trait::async_trait;
use serde_json::Value;

pub use stdio_client::StdioClientAdapter;
pub use stdio_server::{StdioServerAdapter, StdioServerConfig};

/// Uniform interface a pipeline forward loop reads from and writes to.
///
/// All three operations suspend the caller's logical task without
/// blocking an OS thread (§5 "Suspension points"). `close` is idempotent
/// — safe to call any number of times (§8 "Adapter idempotence").
#[async_trait]
pub trait TransportAdapter: Send + Sync + std::fmt::Debug {
    /// Read the next inbound JSON-RPC message.
    ///
    /// Returns messages in the order received from the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`](crate::error::TransportError::Closed)
    /// once the peer is gone or `close` has been called — including
    /// waking a `read` that was already suspended when `close` fires.
    async fn read(&self) -> TransportResult<Value>;

    /// Enqueue a message for the peer.
    ///
    /// Delivery order matches call order.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`](crate::error::TransportError::Closed)
    /// after `close`.
    async fn write(&self, message: Value) -> TransportResult<()>;

    /// Release all resources held by this adapter. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`](crate::error::TransportError) if the
    /// underlying resource (subprocess, stream) failed to shut down
    /// cleanly; the adapter is considered closed regardless.
    async fn close(&self) -> TransportResult<()>;
}

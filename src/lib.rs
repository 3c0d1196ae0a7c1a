//! mcp-mitm-proxy: an interactive man-in-the-middle proxy for the Model
//! Context Protocol (MCP).
//!
//! The proxy sits between an MCP client and an MCP server, speaking
//! JSON-RPC 2.0 to both, while capturing every message that crosses it,
//! optionally pausing traffic for inspection/modification/drop, and
//! persisting the capture as a session file that can later be replayed
//! against a fresh server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   read/write   ┌──────────────────────────┐   read/write   ┌──────────┐
//! │  client  │◄──────────────►│   bidirectional pipeline  │◄──────────────►│  server  │
//! └──────────┘   (adapter)    │  capture · intercept      │    (adapter)    └──────────┘
//!                             │  correlate · persist       │
//!                             └──────────────────────────┘
//! ```
//!
//! The six components, leaves first:
//!
//! - [`correlation`] — pure JSON-RPC message classification.
//! - [`transport`] — the adapter contract the pipeline depends on, plus
//!   the two stdio implementations.
//! - [`session`] — the append-only capture log and its JSON persistence.
//! - [`intercept`] — the hold/release rendezvous.
//! - [`pipeline`] — the two concurrent forward loops.
//! - [`replay`] — out-of-band re-injection of a captured session.
//!
//! The CLI surface (`proxy`, `inspect`, `export`, `replay`) lives in
//! [`cli`] behind the `cli` feature, matching the optional-binary layout
//! of the crate this one is descended from.

pub mod config;
pub mod correlation;
pub mod error;
pub mod intercept;
pub mod model;
pub mod pipeline;
pub mod replay;
pub mod session;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{ProxyError, ProxyResult};

/// Crate version, as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude of the types most call sites need.
pub mod prelude {
    pub use crate::config::{ProxyTarget, ReplayConfig, RunConfig};
    pub use crate::error::{ProxyError, ProxyResult};
    pub use crate::intercept::{InterceptEngine, ReleaseDecision};
    pub use crate::model::{
        Direction, InterceptAction, InterceptMode, JsonRpcId, ProxyMessage, TransportKind,
    };
    pub use crate::pipeline::{run_pipeline, NoopObserver, PipelineObserver, PipelineShared};
    pub use crate::replay::{replay_messages, ReplayResult, ReplaySessionResult};
    pub use crate::session::{summarize, PersistedSession, SessionStore, SessionSummary};
    pub use crate::transport::{StdioClientAdapter, StdioServerAdapter, TransportAdapter};
}

//! Error types for mcp-mitm-proxy
//!
//! Two-tier hierarchy: `TransportError` for the adapter layer (§4.2 of the
//! design), `ProxyError` for everything above it (session, intercept,
//! replay, pipeline, CLI). `ProxyError` wraps `TransportError` so a failed
//! adapter call can surface all the way up to a CLI exit code without
//! losing context.

use thiserror::Error;

/// Result type for transport adapter operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors produced by a transport adapter's `read`/`write`/`close`.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The adapter has been shut down, or the peer disconnected.
    ///
    /// The distinguished error of §4.2: `read`/`write` fail with this
    /// after `close()`, and a suspended `read` wakes with this when
    /// `close()` is called concurrently.
    #[error("transport closed")]
    Closed,

    /// Underlying I/O failure (subprocess spawn, pipe write, ...).
    #[error("io error: {0}")]
    Io(String),

    /// A frame could not be encoded/decoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The adapter was misconfigured (e.g. empty command, unimplemented
    /// transport such as SSE/streamable-HTTP — protocol slot only).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for proxy-level operations.
pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

/// Main error type for everything above the transport adapter layer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    /// A transport adapter call failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session capture/persistence error.
    #[error("session error: {message}")]
    Session {
        /// Human-readable description.
        message: String,
    },

    /// Intercept engine misuse (e.g. releasing a held message twice, or
    /// releasing an id that is not currently held).
    #[error("intercept error: {message}")]
    Intercept {
        /// Human-readable description.
        message: String,
    },

    /// Replay engine error not captured in a per-message `ReplayResult`.
    #[error("replay error: {message}")]
    Replay {
        /// Human-readable description.
        message: String,
    },

    /// Invalid configuration (bad CLI args, missing required field).
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable description.
        message: String,
    },

    /// JSON (de)serialization failure outside the transport layer (e.g.
    /// session file encode/decode).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session file read/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Construct a session error.
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Construct an intercept error.
    pub fn intercept(message: impl Into<String>) -> Self {
        Self::Intercept {
            message: message.into(),
        }
    }

    /// Construct a replay error.
    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay {
            message: message.into(),
        }
    }

    /// Construct a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error is the adapter `closed` signal — a normal
    /// end-of-run condition, not a failure the pipeline should escalate.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_closed_is_detected() {
        let err: ProxyError = TransportError::Closed.into();
        assert!(err.is_closed());
    }

    #[test]
    fn other_transport_errors_are_not_closed() {
        let err: ProxyError = TransportError::Io("disk full".into()).into();
        assert!(!err.is_closed());
    }

    #[test]
    fn constructors_build_expected_variants() {
        assert!(matches!(
            ProxyError::session("x"),
            ProxyError::Session { .. }
        ));
        assert!(matches!(
            ProxyError::configuration("x"),
            ProxyError::Configuration { .. }
        ));
    }
}

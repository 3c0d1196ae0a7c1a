//! Configuration types for a proxy run (§A.3 of the expanded design).
//!
//! Grounded on `turbomcp-proxy::config`'s `ProxyConfig`/`BackendConfig`
//! shape: a typed struct per concern instead of a loose options bag, with
//! `serde(default)` on every field that has a sane default so a partial
//! config file still deserializes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::InterceptMode;

fn default_replay_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

/// The real MCP server a proxy run spawns and forwards to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyTarget {
    /// Executable to spawn as the MCP server.
    pub command: String,
    /// Arguments passed to `command`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables for the spawned process. `None` inherits
    /// the proxy's own environment.
    #[serde(default)]
    pub env: Option<Vec<(String, String)>>,
    /// Working directory for the spawned process.
    #[serde(default)]
    pub cwd: Option<String>,
}

impl ProxyTarget {
    /// A target with no arguments, inherited environment and cwd.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: None,
            cwd: None,
        }
    }
}

/// Options controlling a `replay` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// How long to wait for a response to a replayed request before
    /// recording a timeout for that message (§4.6).
    #[serde(default = "default_replay_timeout", with = "humantime_duration")]
    pub timeout: Duration,
    /// Whether to send a synthetic `initialize` handshake before
    /// replaying a session that didn't start with one.
    #[serde(default = "default_true")]
    pub auto_handshake: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            timeout: default_replay_timeout(),
            auto_handshake: true,
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Top-level configuration for a live `proxy` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// The real server this run forwards to.
    pub target: ProxyTarget,
    /// Starting intercept mode (§4.3). Defaults to passthrough so a
    /// proxy started without operator input doesn't stall the first
    /// message.
    #[serde(default = "default_intercept_mode")]
    pub intercept_mode: InterceptMode,
    /// Path to write the captured session to on shutdown, if any.
    #[serde(default)]
    pub session_output: Option<String>,
}

fn default_intercept_mode() -> InterceptMode {
    InterceptMode::Passthrough
}

impl RunConfig {
    /// A run config for `target` with passthrough mode and no session
    /// capture path.
    pub fn new(target: ProxyTarget) -> Self {
        Self {
            target,
            intercept_mode: default_intercept_mode(),
            session_output: None,
        }
    }
}

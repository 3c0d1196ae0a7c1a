//! `proxy` command: run the pipeline until the client or server closes.
//!
//! Grounded on `examples/original_source/src/mcp_proxy/cli.py`'s `proxy`
//! command, whose real work (spawning the TUI) is out of this crate's
//! scope (§1 "out of scope"). This implementation wires the same flags
//! straight into [`crate::pipeline::run_pipeline`]: without a TUI there
//! is no interactive release surface, so intercept mode here holds each
//! message just long enough to log it, then releases it as `forward` —
//! an honest non-interactive stand-in, not a recreation of the TUI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;
use uuid::Uuid;

use crate::cli::args::TargetArgs;
use crate::error::ProxyResult;
use crate::intercept::{InterceptEngine, ReleaseDecision};
use crate::model::{InterceptMode, ProxyMessage, TransportKind};
use crate::pipeline::{run_pipeline, NoopObserver, PipelineObserver, PipelineShared};
use crate::session::SessionStore;
use crate::transport::{StdioClientAdapter, StdioServerAdapter, StdioServerConfig};

/// Run the proxy, bridging the MCP client on stdio to a spawned server.
#[derive(Debug, Args)]
pub struct ProxyCommand {
    /// Server to spawn and forward to.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Start in intercept mode instead of passthrough.
    ///
    /// Without a TUI attached (out of scope for this crate), held
    /// messages are logged and immediately released as `forward` —
    /// this flag is useful mainly to exercise the hold/release path
    /// while capturing a session.
    #[arg(long)]
    pub intercept: bool,

    /// Auto-save the captured session to this path when the run ends.
    #[arg(long, value_name = "FILE")]
    pub session_file: Option<PathBuf>,
}

impl ProxyCommand {
    /// Spawn the target server, bridge it to this process's stdio, and
    /// run the pipeline until either side closes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProxyError`] if the target is
    /// misconfigured, the server fails to spawn, or the pipeline fails
    /// with anything other than a clean close.
    pub async fn execute(self) -> ProxyResult<()> {
        let target = self.target.stdio_target()?;

        info!(command = %target.command, args = ?target.args, "starting proxy session");

        let server_config = StdioServerConfig {
            command: target.command.clone(),
            args: target.args.clone(),
            env: target.env.clone(),
            cwd: target.cwd.clone(),
            max_message_bytes: 10 * 1024 * 1024,
        };
        let server = Arc::new(StdioServerAdapter::spawn(server_config).await?);
        let client = Arc::new(StdioClientAdapter::new());

        let session_id = Uuid::new_v4().to_string();
        let mut session = SessionStore::new(session_id.clone(), TransportKind::Stdio);
        if let Some(command_line) = self.target.command_line() {
            session = session.with_server_command(command_line);
        }
        let session = Arc::new(session);

        let mode = if self.intercept {
            InterceptMode::Intercept
        } else {
            InterceptMode::Passthrough
        };
        let intercept = Arc::new(InterceptEngine::new(mode));

        let observer: Arc<dyn PipelineObserver> = if self.intercept {
            Arc::new(AutoForwardObserver {
                intercept: intercept.clone(),
            })
        } else {
            Arc::new(NoopObserver)
        };

        let shared = Arc::new(PipelineShared::new(
            session.clone(),
            intercept,
            observer,
            TransportKind::Stdio,
        ));

        let result = run_pipeline(client, server, shared).await;

        session.mark_ended();
        if let Some(path) = &self.session_file {
            session.save(path)?;
            info!(path = %path.display(), "session saved");
        }

        result
    }
}

/// Logs every held message, then immediately releases it as `forward` —
/// see the module doc comment for why this stands in for a real TUI.
struct AutoForwardObserver {
    intercept: Arc<InterceptEngine>,
}

impl PipelineObserver for AutoForwardObserver {
    fn on_held(&self, message: &ProxyMessage) {
        info!(id = %message.id, method = ?message.method, "held message, auto-forwarding");
        let _ = self.intercept.release(&message.id, ReleaseDecision::forward());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intercept_flag_selects_intercept_mode() {
        let cmd = ProxyCommand {
            target: TargetArgs {
                target_command: Some("cat".to_string()),
                target_args: vec![],
                target_cwd: None,
                target_url: None,
            },
            intercept: true,
            session_file: None,
        };
        assert!(cmd.intercept);
    }
}

//! `replay` command: re-issue a captured session's client traffic
//! against a live server (§4.6, §B.3).
//!
//! Grounded on `examples/original_source/src/mcp_proxy/cli.py`'s
//! `replay` stub for the flag shape, and on `replay.py`'s own
//! `ReplaySessionResult` for the optional JSON dump this crate's CLI
//! actually implements (the Python CLI never prints it).

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::info;

use crate::cli::args::TargetArgs;
use crate::cli::output::{print_json, OutputFormat};
use crate::error::ProxyResult;
use crate::replay::replay_messages;
use crate::session::SessionStore;
use crate::transport::{StdioServerAdapter, StdioServerConfig};

/// Replay a captured session's client-to-server traffic.
#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// Session file to replay.
    #[arg(long, value_name = "FILE")]
    pub session_file: PathBuf,

    /// Server to replay against. Falls back to the session's own
    /// recorded `server_command` if omitted.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Seconds to wait for each response before recording a timeout.
    #[arg(long, default_value_t = 10.0)]
    pub timeout: f64,

    /// Skip the synthetic `initialize` handshake even if the session
    /// didn't start with one.
    #[arg(long)]
    pub no_auto_handshake: bool,
}

impl ReplayCommand {
    /// Load the session, connect to the target server, and replay.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProxyError`] if the session file can't be
    /// read, no target server can be determined, or the server fails to
    /// spawn.
    pub async fn execute(self, format: OutputFormat) -> ProxyResult<()> {
        let persisted = SessionStore::load(&self.session_file)?;

        let command = self
            .target
            .target_command
            .clone()
            .or_else(|| persisted.server_command.clone());
        let target = match command {
            Some(command) => {
                let mut target = self.target.clone();
                target.target_command = Some(command);
                target.stdio_target()?
            }
            None => self.target.stdio_target()?,
        };

        info!(command = %target.command, args = ?target.args, "replaying session against server");

        let server_config = StdioServerConfig {
            command: target.command,
            args: target.args,
            env: target.env,
            cwd: target.cwd,
            max_message_bytes: 10 * 1024 * 1024,
        };
        let adapter = StdioServerAdapter::spawn(server_config).await?;

        let result = replay_messages(
            &persisted,
            &adapter,
            Duration::from_secs_f64(self.timeout),
            !self.no_auto_handshake,
        )
        .await?;
        adapter.close().await?;

        match format {
            OutputFormat::Json => print_json(&result)?,
            OutputFormat::Human => print_human_summary(&result),
        }

        Ok(())
    }
}

fn print_human_summary(result: &crate::replay::ReplaySessionResult) {
    println!(
        "replayed session {} ({} message{})",
        result.session_id,
        result.results.len(),
        if result.results.len() == 1 { "" } else { "s" }
    );
    if result.handshake_sent {
        println!("  synthetic handshake sent");
    }
    for entry in &result.results {
        let status = match &entry.error {
            Some(err) => format!("FAILED: {err}"),
            None if entry.response.is_some() => "ok".to_string(),
            None => "ok (no response expected)".to_string(),
        };
        println!(
            "  [{} ms] {} -> {status}",
            entry.elapsed_ms,
            entry.original_request.method.as_deref().unwrap_or("?")
        );
    }
    let timeouts = result.timeout_count();
    if timeouts > 0 {
        println!("  {timeouts} message(s) timed out");
    }
}

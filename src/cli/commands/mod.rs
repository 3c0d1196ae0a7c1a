//! CLI subcommands — the four entries of §6's "Operational surface".

pub mod export;
pub mod inspect;
pub mod proxy;
pub mod replay;

use clap::Subcommand;

use crate::cli::output::OutputFormat;
use crate::error::ProxyResult;

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline, proxying a client to a server over stdio.
    Proxy(proxy::ProxyCommand),
    /// Read a session file and print a human summary.
    Inspect(inspect::InspectCommand),
    /// Load a session file and re-save it in the current format.
    Export(export::ExportCommand),
    /// Re-issue a captured session's client traffic against a live server.
    Replay(replay::ReplayCommand),
}

impl Command {
    /// Dispatch to the chosen subcommand.
    ///
    /// # Errors
    ///
    /// Returns whatever [`crate::error::ProxyError`] the subcommand
    /// produces.
    pub async fn execute(self, format: OutputFormat) -> ProxyResult<()> {
        match self {
            Command::Proxy(cmd) => cmd.execute().await,
            Command::Inspect(cmd) => cmd.execute(format).await,
            Command::Export(cmd) => cmd.execute().await,
            Command::Replay(cmd) => cmd.execute(format).await,
        }
    }
}

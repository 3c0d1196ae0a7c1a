//! CLI for mcp-mitm-proxy: the operational surface described in §6 of the
//! design (`proxy`, `inspect`, `export`, `replay`). Argument parsing,
//! output formatting and command dispatch are the "thin surface" the
//! core pipeline was explicitly not required to carry; everything this
//! module does is a straightforward consumer of `crate::pipeline`,
//! `crate::session` and `crate::replay`.
//!
//! Grounded on `turbomcp-proxy::cli`'s shape: a top-level `Cli` struct
//! parsed with `clap::Parser`, verbosity driving a `tracing_subscriber`
//! filter, a `Command` subcommand enum dispatching to per-command
//! modules under `commands/`.

pub mod args;
pub mod commands;
pub mod error;
pub mod output;

use std::io::IsTerminal;

use clap::Parser;
use tracing::Level;

use crate::error::ProxyResult;

/// mcp-mitm-proxy — interactive man-in-the-middle proxy for MCP.
///
/// Proxies an MCP client to an MCP server over stdio, capturing every
/// JSON-RPC message exchanged. Optionally holds traffic for inspection
/// before forwarding, and can replay a captured session against a fresh
/// server.
#[derive(Parser, Debug)]
#[command(
    name = "mcp-mitm-proxy",
    version,
    about = "Interactive MITM proxy for the Model Context Protocol",
    author
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: commands::Command,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for `inspect`/`replay`.
    #[arg(short = 'f', long, value_enum, default_value = "human", global = true)]
    pub format: output::OutputFormat,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Run the selected subcommand.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ProxyError`](crate::error::ProxyError) the
    /// subcommand produces.
    pub async fn execute(self) -> ProxyResult<()> {
        self.init_tracing();
        if self.no_color || !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }
        self.command.execute(self.format).await
    }

    fn init_tracing(&self) {
        let level = if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proxy_subcommand() {
        let cli = Cli::try_parse_from([
            "mcp-mitm-proxy",
            "proxy",
            "--target-command",
            "python",
            "--target-arg",
            "server.py",
        ]);
        assert!(cli.is_ok());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let cli = Cli::try_parse_from(["mcp-mitm-proxy", "-v", "--quiet", "proxy"]);
        assert!(cli.is_err());
    }
}

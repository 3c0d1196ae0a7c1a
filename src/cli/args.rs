//! Shared CLI argument types (§6 "Operational surface"), grounded on
//! `turbomcp-proxy::cli::args::BackendArgs`'s pattern of one flattened
//! `clap::Args` struct per concern.

use clap::Args;
use std::path::PathBuf;

use crate::config::ProxyTarget;
use crate::error::{ProxyError, ProxyResult};

/// The real MCP server a `proxy` or `replay` run talks to.
///
/// Only the stdio transport has a client implementation (§1 Non-goals);
/// `--target-url` is accepted and stored for persistence but attempting
/// to connect with it fails with [`ProxyError::Configuration`] — the
/// protocol slot described in §A.3.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Server executable to spawn (stdio transport).
    #[arg(long, value_name = "COMMAND")]
    pub target_command: Option<String>,

    /// Argument passed to `--target-command`. Repeatable.
    #[arg(long = "target-arg", value_name = "ARG")]
    pub target_args: Vec<String>,

    /// Working directory for the spawned server.
    #[arg(long, value_name = "DIR")]
    pub target_cwd: Option<PathBuf>,

    /// Server URL (SSE/streamable-HTTP transport — protocol slot only).
    #[arg(long, value_name = "URL")]
    pub target_url: Option<String>,
}

impl TargetArgs {
    /// Build a [`ProxyTarget`] for the stdio transport.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Configuration`] if neither `--target-command`
    /// nor `--target-url` was given, or if `--target-url` was given
    /// instead (no network transport client is implemented).
    pub fn stdio_target(&self) -> ProxyResult<ProxyTarget> {
        let Some(command) = &self.target_command else {
            return Err(ProxyError::configuration(if self.target_url.is_some() {
                "SSE/streamable-HTTP transports are a protocol slot only; no client is \
                 implemented — use --target-command for a stdio server"
                    .to_string()
            } else {
                "--target-command is required".to_string()
            }));
        };

        let mut target = ProxyTarget::new(command.clone());
        target.args = self.target_args.clone();
        target.cwd = self
            .target_cwd
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        Ok(target)
    }

    /// The command line as a single display string, for session
    /// persistence (`server_command`, §4.5).
    pub fn command_line(&self) -> Option<String> {
        self.target_command.as_ref().map(|cmd| {
            std::iter::once(cmd.clone())
                .chain(self.target_args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_target_requires_command() {
        let args = TargetArgs {
            target_command: None,
            target_args: vec![],
            target_cwd: None,
            target_url: None,
        };
        assert!(args.stdio_target().is_err());
    }

    #[test]
    fn stdio_target_builds_from_command_and_args() {
        let args = TargetArgs {
            target_command: Some("python".to_string()),
            target_args: vec!["server.py".to_string()],
            target_cwd: None,
            target_url: None,
        };
        let target = args.stdio_target().unwrap();
        assert_eq!(target.command, "python");
        assert_eq!(target.args, vec!["server.py".to_string()]);
    }

    #[test]
    fn command_line_joins_command_and_args() {
        let args = TargetArgs {
            target_command: Some("python".to_string()),
            target_args: vec!["server.py".to_string(), "--flag".to_string()],
            target_cwd: None,
            target_url: None,
        };
        assert_eq!(args.command_line().as_deref(), Some("python server.py --flag"));
    }
}

//! User-facing error rendering, grounded on
//! `turbomcp-proxy::cli::error::format_error`'s shape: one arm per
//! `ProxyError` variant with a short diagnosis plus a suggestion line.

use colored::Colorize;

use crate::error::ProxyError;

/// Render `error` the way it should appear on stderr.
#[must_use]
pub fn format_error(error: &ProxyError) -> String {
    match error {
        ProxyError::Transport(err) => format!(
            "{} transport error\n  {err}\n\n{} the server process may have exited, or the \
             command/arguments are wrong",
            "x".red().bold(),
            "hint:".yellow()
        ),
        ProxyError::Configuration { message } => format!(
            "{} configuration error\n  {message}\n\n{} run with --help to see available options",
            "x".red().bold(),
            "hint:".yellow()
        ),
        ProxyError::Session { message } => format!(
            "{} session error\n  {message}\n\n{} check the session file path and permissions",
            "x".red().bold(),
            "hint:".yellow()
        ),
        ProxyError::Intercept { message } => {
            format!("{} intercept error\n  {message}", "x".red().bold())
        }
        ProxyError::Replay { message } => {
            format!("{} replay error\n  {message}", "x".red().bold())
        }
        ProxyError::Serialization(err) => format!(
            "{} JSON error\n  {err}\n\n{} the session file may be corrupt or from an \
             incompatible version",
            "x".red().bold(),
            "hint:".yellow()
        ),
        ProxyError::Io(err) => format!("{} io error\n  {err}", "x".red().bold()),
    }
}

/// Print `error` to stderr and return the process exit code.
#[must_use]
pub fn display_error(error: &ProxyError) -> i32 {
    eprintln!("{}", format_error(error));
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_mention_help() {
        let err = ProxyError::configuration("missing --target-command");
        let rendered = format_error(&err);
        assert!(rendered.contains("missing --target-command"));
        assert!(rendered.contains("--help"));
    }
}

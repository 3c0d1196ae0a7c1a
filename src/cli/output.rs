//! Output format selection for `inspect`/`replay` (§B.3 "Replay JSON
//! dump"), grounded on `turbomcp-proxy::cli::output`'s `OutputFormat`
//! enum — narrowed to the two formats this crate actually needs; no
//! `ServerSpec` to render means no YAML/pretty-JSON split either.

use clap::ValueEnum;
use serde::Serialize;

use crate::error::ProxyResult;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-oriented text (default).
    Human,
    /// Pretty-printed JSON, for scripting.
    Json,
}

/// Pretty-print `value` as JSON to stdout.
///
/// # Errors
///
/// Returns [`crate::error::ProxyError::Serialization`] if `value` fails
/// to encode.
pub fn print_json<T: Serialize>(value: &T) -> ProxyResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

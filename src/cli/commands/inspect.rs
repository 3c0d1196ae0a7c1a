//! `inspect` command: read a session file and render a human summary.
//!
//! Supplemented feature (§B.1): the Python original's `inspect` command
//! only prints "Not yet implemented"
//! (`examples/original_source/src/mcp_proxy/cli.py`); this crate's
//! session/model carry enough to produce a real summary, so it does.

use std::path::PathBuf;

use clap::Args;

use crate::cli::output::{print_json, OutputFormat};
use crate::error::ProxyResult;
use crate::session::{summarize, SessionStore};

/// Print a summary of a captured session.
#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Session file to read.
    #[arg(long, value_name = "FILE")]
    pub session_file: PathBuf,
}

impl InspectCommand {
    /// Load the session file and render its summary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProxyError`] if the file can't be read or
    /// isn't valid session JSON.
    pub async fn execute(self, format: OutputFormat) -> ProxyResult<()> {
        let session = SessionStore::load(&self.session_file)?;
        let summary = summarize(&session);

        match format {
            OutputFormat::Human => print!("{summary}"),
            OutputFormat::Json => print_json(&summary)?,
        }
        Ok(())
    }
}

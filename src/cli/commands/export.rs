//! `export` command: load a session file and re-save it (§B.2),
//! grounded on `examples/original_source/src/mcp_proxy/cli.py`'s
//! `export_session` stub — the real operation is exactly `load` then
//! `save`, reusing [`crate::session::SessionStore`]'s own round trip.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::error::ProxyResult;
use crate::session::SessionStore;

/// Load a session file and write it back out in the current format.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Session file to read.
    #[arg(long, value_name = "FILE")]
    pub session_file: PathBuf,

    /// Destination path.
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,
}

impl ExportCommand {
    /// Re-save `session_file` at `output`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProxyError`] if the input can't be read
    /// or the output can't be written.
    pub async fn execute(self) -> ProxyResult<()> {
        let persisted = SessionStore::load(&self.session_file)?;
        let store = SessionStore::from_persisted(persisted);
        store.save(&self.output)?;

        info!(
            from = %self.session_file.display(),
            to = %self.output.display(),
            "session exported"
        );
        Ok(())
    }
}

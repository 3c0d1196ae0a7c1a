//! Session capture and persistence (§4.5).
//!
//! Grounded on `examples/original_source/src/mcp_proxy/session_store.py`'s
//! `SessionStore`: append-only in-memory log, `save`/`load` to/from a
//! JSON file. The save path is hardened beyond the original — it writes
//! through a `tempfile::NamedTempFile` in the target directory and
//! `persist()`s it over the destination, so a crash mid-write never
//! leaves a truncated session file (§4.5 "atomic write").
//!
//! The `summarize` function and its `SessionSummary`/`Display` impl are a
//! supplemented feature: the Python CLI's `inspect` command
//! (`examples/original_source/src/mcp_proxy/cli.py`) is a stub that
//! prints "Not yet implemented" — this crate actually renders one.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProxyError, ProxyResult};
use crate::model::{Direction, ProxyMessage, TransportKind};

/// On-disk shape of a captured session (§4.5 "Persisted shape"), grounded
/// on `examples/original_source/src/mcp_proxy/models.py`'s `ProxySession`
/// Pydantic model — field names and optionality match it exactly so a
/// session captured by that implementation would still `load()` here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Proxy-assigned session id.
    pub id: String,
    /// UTC instant the session started.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// UTC instant the session ended, if it has.
    #[serde(default)]
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Transport the session ran over.
    pub transport: TransportKind,
    /// For stdio sessions, the server launch command line.
    #[serde(default)]
    pub server_command: Option<String>,
    /// For SSE/streamable-HTTP sessions, the server endpoint URL.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Arbitrary session metadata (e.g. proxy version, operator notes).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Every captured message, in capture order.
    pub messages: Vec<ProxyMessage>,
}

/// Append-only capture log for a single proxy session.
///
/// Grounded on `SessionStore`: `append` mirrors `append`, `messages`/
/// `by_id` mirror `get_messages`/`get_by_id`, `save`/`load` mirror the
/// eponymous methods (with the atomic-write hardening noted above).
pub struct SessionStore {
    session_id: String,
    transport: TransportKind,
    started_at: chrono::DateTime<chrono::Utc>,
    ended_at: Mutex<Option<chrono::DateTime<chrono::Utc>>>,
    server_command: Option<String>,
    server_url: Option<String>,
    metadata: HashMap<String, Value>,
    messages: Mutex<Vec<ProxyMessage>>,
}

impl SessionStore {
    /// Start a new, empty session capture.
    pub fn new(session_id: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            session_id: session_id.into(),
            transport,
            started_at: chrono::Utc::now(),
            ended_at: Mutex::new(None),
            server_command: None,
            server_url: None,
            metadata: HashMap::new(),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Attach the stdio server command line that this session proxies
    /// to, for persistence (§4.5).
    #[must_use]
    pub fn with_server_command(mut self, command: impl Into<String>) -> Self {
        self.server_command = Some(command.into());
        self
    }

    /// Attach the network server URL that this session proxies to, for
    /// persistence (§4.5).
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Attach arbitrary session metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Reconstruct a live store from a previously persisted session,
    /// preserving its id, timing, target descriptor and metadata
    /// exactly — used by `export` to round-trip a session without
    /// losing the fields a plain `new` + `append` loop would reset.
    pub fn from_persisted(persisted: PersistedSession) -> Self {
        let store = Self {
            session_id: persisted.id,
            transport: persisted.transport,
            started_at: persisted.started_at,
            ended_at: Mutex::new(persisted.ended_at),
            server_command: persisted.server_command,
            server_url: persisted.server_url,
            metadata: persisted.metadata,
            messages: Mutex::new(Vec::new()),
        };
        for message in persisted.messages {
            store.append(message);
        }
        store
    }

    /// The session's id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append a captured message. Order of `append` calls is preserved.
    pub fn append(&self, message: ProxyMessage) {
        self.messages.lock().push(message);
    }

    /// Snapshot of every message captured so far, in capture order.
    pub fn messages(&self) -> Vec<ProxyMessage> {
        self.messages.lock().clone()
    }

    /// Look up a captured message by its proxy-assigned id.
    pub fn by_id(&self, id: &str) -> Option<ProxyMessage> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }

    /// Mark the session as ended at the current instant. Idempotent —
    /// later calls overwrite the previous `ended_at`.
    pub fn mark_ended(&self) {
        *self.ended_at.lock() = Some(chrono::Utc::now());
    }

    /// Materialize the on-disk representation without writing it.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            id: self.session_id.clone(),
            started_at: self.started_at,
            ended_at: *self.ended_at.lock(),
            transport: self.transport,
            server_command: self.server_command.clone(),
            server_url: self.server_url.clone(),
            metadata: self.metadata.clone(),
            messages: self.messages(),
        }
    }

    /// Write the session to `path`, atomically.
    ///
    /// Creates parent directories if missing, writes to a temp file in
    /// the same directory as `path`, then renames it into place — a
    /// reader never observes a partially-written file (§4.5).
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Io`] if the directory can't be created or
    /// the temp file can't be persisted, [`ProxyError::Serialization`]
    /// if the session fails to encode as JSON.
    pub fn save(&self, path: &Path) -> ProxyResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let persisted = self.to_persisted();
        let json = serde_json::to_vec_pretty(&persisted)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, &json)?;
        tmp.persist(path)
            .map_err(|err| ProxyError::session(format!("failed to persist session file: {err}")))?;
        Ok(())
    }

    /// Load a previously saved session from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Io`] if the file can't be read,
    /// [`ProxyError::Serialization`] if it isn't valid session JSON.
    pub fn load(path: &Path) -> ProxyResult<PersistedSession> {
        let bytes = std::fs::read(path)?;
        let persisted: PersistedSession = serde_json::from_slice(&bytes)?;
        Ok(persisted)
    }
}

/// Human-oriented rollup of a session, rendered by the `inspect` CLI
/// command.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Session id.
    pub session_id: String,
    /// Transport the session ran over.
    pub transport: TransportKind,
    /// Total messages captured.
    pub total_messages: usize,
    /// Messages flowing client to server.
    pub client_to_server: usize,
    /// Messages flowing server to client.
    pub server_to_client: usize,
    /// Messages that were modified via intercept before forwarding.
    pub modified: usize,
    /// Count of each distinct JSON-RPC method seen, requests and
    /// notifications only.
    pub methods: HashMap<String, usize>,
}

/// Summarize a persisted session for the `inspect` command.
pub fn summarize(session: &PersistedSession) -> SessionSummary {
    let mut client_to_server = 0usize;
    let mut server_to_client = 0usize;
    let mut modified = 0usize;
    let mut methods: HashMap<String, usize> = HashMap::new();

    for message in &session.messages {
        match message.direction {
            Direction::ClientToServer => client_to_server += 1,
            Direction::ServerToClient => server_to_client += 1,
        }
        if message.was_modified() {
            modified += 1;
        }
        if let Some(method) = &message.method {
            *methods.entry(method.clone()).or_insert(0) += 1;
        }
    }

    SessionSummary {
        session_id: session.id.clone(),
        transport: session.transport,
        total_messages: session.messages.len(),
        client_to_server,
        server_to_client,
        modified,
        methods,
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "session {} ({})", self.session_id, self.transport)?;
        writeln!(f, "  messages: {}", self.total_messages)?;
        writeln!(
            f,
            "    client -> server: {}, server -> client: {}",
            self.client_to_server, self.server_to_client
        )?;
        writeln!(f, "    modified: {}", self.modified)?;
        if !self.methods.is_empty() {
            writeln!(f, "  methods:")?;
            let mut methods: Vec<_> = self.methods.iter().collect();
            methods.sort_by(|a, b| a.0.cmp(b.0));
            for (method, count) in methods {
                writeln!(f, "    {method}: {count}")?;
            }
        }
        Ok(())
    }
}

//! Server-facing stdio adapter — the proxy acts as client to a real MCP
//! server it spawns as a subprocess (§4.2).
//!
//! Grounded on `turbomcp-transport::child_process::ChildProcessTransport`
//! for the overall shape (spawn via `tokio::process::Command`, bridge
//! stdout/stdin through `tokio::sync::mpsc` channels via two background
//! tasks, `tokio::sync::Mutex` for state that crosses `.await` points)
//! and on `examples/original_source/src/mcp_proxy/adapters/stdio.py`'s
//! `StdioServerAdapter` for the read/write/close semantics this crate
//! actually needs (a closed sentinel instead of a typed SDK stream).
//!
//! Framing: one JSON object per line, UTF-8, `\n`-terminated (§6). A
//! line that fails to parse is logged and dropped — it never surfaces as
//! a `read` failure (§7 *parse-error*).

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex as TokioMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::TransportAdapter;
use crate::error::{TransportError, TransportResult};

/// The open question of §9 ("unbounded queues") is resolved here: bridge
/// queues are bounded. An unbounded queue lets a slow pipeline consumer
/// accumulate unbounded memory; a bounded one makes the subprocess's
/// stdout reader (and thus indirectly the subprocess itself, once its
/// stdout pipe fills) exert backpressure. See `DESIGN.md`.
const QUEUE_CAPACITY: usize = 256;

/// Configuration for the subprocess a [`StdioServerAdapter`] spawns.
#[derive(Debug, Clone, Default)]
pub struct StdioServerConfig {
    /// Executable to run as the MCP server.
    pub command: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Environment variables to set. `None` inherits the proxy's own
    /// environment (minus nothing extra — §6 "child inherits no extra
    /// file descriptors").
    pub env: Option<Vec<(String, String)>>,
    /// Working directory for the subprocess.
    pub cwd: Option<String>,
    /// Maximum accepted line length in bytes; oversized frames are
    /// dropped with a warning rather than accepted unbounded.
    pub max_message_bytes: usize,
}

impl StdioServerConfig {
    /// Build a config for the given executable and arguments, with the
    /// rest defaulted.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: None,
            cwd: None,
            max_message_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Server-facing stdio adapter: owns a spawned subprocess.
#[derive(Debug)]
pub struct StdioServerAdapter {
    child: TokioMutex<Option<Child>>,
    read_rx: TokioMutex<mpsc::Receiver<Value>>,
    write_tx: mpsc::Sender<Value>,
    closed: Arc<AtomicBool>,
    close_signal: Arc<Notify>,
    reader_task: TokioMutex<Option<JoinHandle<()>>>,
    writer_task: TokioMutex<Option<JoinHandle<()>>>,
}

impl StdioServerAdapter {
    /// Spawn the subprocess and start the bridging tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Configuration`] if `command` is empty,
    /// or [`TransportError::Io`] if the process fails to spawn or its
    /// stdio handles cannot be captured.
    pub async fn spawn(config: StdioServerConfig) -> TransportResult<Self> {
        if config.command.is_empty() {
            return Err(TransportError::Configuration(
                "server command must not be empty".to_string(),
            ));
        }

        info!(command = %config.command, args = ?config.args, "spawning mcp server subprocess");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(env) = &config.env {
            cmd.env_clear();
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Io("failed to capture child stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Io("failed to capture child stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Io("failed to capture child stderr".to_string()))?;

        let (write_tx, write_rx) = mpsc::channel::<Value>(QUEUE_CAPACITY);
        let (read_tx, read_rx) = mpsc::channel::<Value>(QUEUE_CAPACITY);

        let writer_task = tokio::spawn(stdin_writer_loop(stdin, write_rx));
        let reader_task = tokio::spawn(stdout_reader_loop(
            stdout,
            read_tx,
            config.max_message_bytes,
        ));
        tokio::spawn(stderr_logger_loop(stderr));

        Ok(Self {
            child: TokioMutex::new(Some(child)),
            read_rx: TokioMutex::new(read_rx),
            write_tx,
            closed: Arc::new(AtomicBool::new(false)),
            close_signal: Arc::new(Notify::new()),
            reader_task: TokioMutex::new(Some(reader_task)),
            writer_task: TokioMutex::new(Some(writer_task)),
        })
    }
}

#[async_trait]
impl TransportAdapter for StdioServerAdapter {
    async fn read(&self) -> TransportResult<Value> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let mut rx = self.read_rx.lock().await;
        tokio::select! {
            item = rx.recv() => item.ok_or(TransportError::Closed),
            () = self.close_signal.notified() => Err(TransportError::Closed),
        }
    }

    async fn write(&self, message: Value) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.write_tx
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.close_signal.notify_waiters();

        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.writer_task.lock().await.take() {
            task.abort();
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.start_kill() {
                warn!(%err, "failed to signal child process");
            }
            if let Err(err) = child.wait().await {
                warn!(%err, "failed waiting for child process exit");
            }
        }
        Ok(())
    }
}

async fn stdin_writer_loop(stdin: tokio::process::ChildStdin, mut rx: mpsc::Receiver<Value>) {
    let mut writer = BufWriter::new(stdin);
    while let Some(message) = rx.recv().await {
        let Ok(mut line) = serde_json::to_vec(&message) else {
            warn!("failed to encode outbound message, dropping");
            continue;
        };
        line.push(b'\n');
        if let Err(err) = writer.write_all(&line).await {
            warn!(%err, "failed writing to child stdin");
            break;
        }
        if let Err(err) = writer.flush().await {
            warn!(%err, "failed flushing child stdin");
            break;
        }
    }
    debug!("stdin writer loop ended");
}

async fn stdout_reader_loop(
    stdout: tokio::process::ChildStdout,
    tx: mpsc::Sender<Value>,
    max_message_bytes: usize,
) {
    let reader = BufReader::new(stdout);
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.len() > max_message_bytes {
                    warn!(bytes = line.len(), "dropping oversized frame from server");
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(value) => {
                        trace!(%line, "received frame from server");
                        if tx.send(value).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(%err, %line, "dropping unparseable frame from server");
                    }
                }
            }
            Ok(None) => {
                debug!("server stdout closed");
                break;
            }
            Err(err) => {
                warn!(%err, "error reading server stdout");
                break;
            }
        }
    }
}

async fn stderr_logger_loop(stderr: tokio::process::ChildStderr) {
    let reader = BufReader::new(stderr);
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "mcp_server_stderr", "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_with_empty_command_is_rejected_at_spawn() {
        let config = StdioServerConfig::new("", vec![]);
        assert!(config.command.is_empty());
    }

    #[tokio::test]
    async fn spawn_rejects_empty_command() {
        let config = StdioServerConfig::new("", vec![]);
        let result = StdioServerAdapter::spawn(config).await;
        assert!(matches!(result, Err(TransportError::Configuration(_))));
    }

    #[tokio::test]
    async fn cat_echoes_frames_back() {
        // `cat` echoes stdin to stdout unchanged, which is enough to
        // exercise the newline-framed JSON-RPC bridge end to end.
        let config = StdioServerConfig::new("cat", vec![]);
        let adapter = StdioServerAdapter::spawn(config)
            .await
            .expect("cat should spawn");

        let request = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        adapter.write(request.clone()).await.unwrap();

        let echoed = adapter.read().await.unwrap();
        assert_eq!(echoed, request);

        adapter.close().await.unwrap();
        assert!(matches!(adapter.read().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let config = StdioServerConfig::new("cat", vec![]);
        let adapter = StdioServerAdapter::spawn(config).await.unwrap();
        adapter.close().await.unwrap();
        adapter.close().await.unwrap();
        assert!(matches!(
            adapter.write(serde_json::json!({})).await,
            Err(TransportError::Closed)
        ));
    }
}

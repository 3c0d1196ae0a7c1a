//! Client-facing stdio adapter — the proxy acts as the MCP server as seen
//! by the real client, over its own stdin/stdout (§4.2).
//!
//! Same bridging shape as [`super::stdio_server`], but there is no
//! subprocess to own: the "remote peer" is whatever process launched the
//! proxy and is piping into its stdin / reading its stdout. Grounded the
//! same way — `turbomcp-transport::child_process` for the bridging
//! pattern, `examples/original_source/src/mcp_proxy/adapters/stdio.py`'s
//! `StdioClientAdapter` for read/write/close semantics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{mpsc, Mutex as TokioMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::TransportAdapter;
use crate::error::{TransportError, TransportResult};

const QUEUE_CAPACITY: usize = 256;

/// Client-facing stdio adapter: bridges the proxy's own stdin/stdout.
#[derive(Debug)]
pub struct StdioClientAdapter {
    read_rx: TokioMutex<mpsc::Receiver<Value>>,
    write_tx: mpsc::Sender<Value>,
    closed: Arc<AtomicBool>,
    close_signal: Arc<Notify>,
    reader_task: TokioMutex<Option<JoinHandle<()>>>,
    writer_task: TokioMutex<Option<JoinHandle<()>>>,
}

impl StdioClientAdapter {
    /// Start bridging the process's stdin/stdout.
    pub fn new() -> Self {
        Self::with_max_message_bytes(10 * 1024 * 1024)
    }

    /// Start bridging with an explicit oversized-frame cutoff.
    pub fn with_max_message_bytes(max_message_bytes: usize) -> Self {
        let (write_tx, write_rx) = mpsc::channel::<Value>(QUEUE_CAPACITY);
        let (read_tx, read_rx) = mpsc::channel::<Value>(QUEUE_CAPACITY);

        let writer_task = tokio::spawn(stdout_writer_loop(write_rx));
        let reader_task = tokio::spawn(stdin_reader_loop(read_tx, max_message_bytes));

        Self {
            read_rx: TokioMutex::new(read_rx),
            write_tx,
            closed: Arc::new(AtomicBool::new(false)),
            close_signal: Arc::new(Notify::new()),
            reader_task: TokioMutex::new(Some(reader_task)),
            writer_task: TokioMutex::new(Some(writer_task)),
        }
    }
}

impl Default for StdioClientAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportAdapter for StdioClientAdapter {
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
        Ok(())
    }
}

async fn stdout_writer_loop(mut rx: mpsc::Receiver<Value>) {
    let mut writer = BufWriter::new(io::stdout());
    while let Some(message) = rx.recv().await {
        let Ok(mut line) = serde_json::to_vec(&message) else {
            warn!("failed to encode outbound message, dropping");
            continue;
        };
        line.push(b'\n');
        if let Err(err) = writer.write_all(&line).await {
            warn!(%err, "failed writing to stdout");
            break;
        }
        if let Err(err) = writer.flush().await {
            warn!(%err, "failed flushing stdout");
            break;
        }
    }
    debug!("stdout writer loop ended");
}

async fn stdin_reader_loop(tx: mpsc::Sender<Value>, max_message_bytes: usize) {
    let reader = BufReader::new(io::stdin());
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.len() > max_message_bytes {
                    warn!(bytes = line.len(), "dropping oversized frame from client");
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(value) => {
                        trace!(%line, "received frame from client");
                        if tx.send(value).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(%err, %line, "dropping unparseable frame from client");
                    }
                }
            }
            Ok(None) => {
                debug!("client stdin closed");
                break;
            }
            Err(err) => {
                warn!(%err, "error reading client stdin");
                break;
            }
        }
    }
}

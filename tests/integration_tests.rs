//! End-to-end scenarios across the pipeline, intercept engine, session
//! store and replay engine together, rather than one module in
//! isolation. Grounded on the placement and `#[tokio::test]` style of
//! `turbomcp-proxy`'s `tests/integration_tests.rs`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_mitm_proxy::prelude::*;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex as TokioMutex};

#[derive(Debug)]
struct ChannelAdapter {
    inbound: TokioMutex<mpsc::Receiver<Value>>,
    outbound: mpsc::Sender<Value>,
}

#[async_trait]
impl TransportAdapter for ChannelAdapter {
    async fn read(&self) -> mcp_mitm_proxy::error::TransportResult<Value> {
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or(mcp_mitm_proxy::error::TransportError::Closed)
    }

    async fn write(&self, message: Value) -> mcp_mitm_proxy::error::TransportResult<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| mcp_mitm_proxy::error::TransportError::Closed)
    }

    async fn close(&self) -> mcp_mitm_proxy::error::TransportResult<()> {
        Ok(())
    }
}

fn channel_pair() -> (Arc<ChannelAdapter>, mpsc::Sender<Value>, mpsc::Receiver<Value>) {
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, out_rx) = mpsc::channel(16);
    let adapter = Arc::new(ChannelAdapter {
        inbound: TokioMutex::new(in_rx),
        outbound: out_tx,
    });
    (adapter, in_tx, out_rx)
}

/// Observer that drops every held message, for S2.
struct DropAllObserver {
    intercept: Arc<InterceptEngine>,
}

impl PipelineObserver for DropAllObserver {
    fn on_held(&self, message: &mcp_mitm_proxy::model::ProxyMessage) {
        let _ = self
            .intercept
            .release(&message.id, ReleaseDecision::drop_message());
    }
}

/// Observer that rewrites `tools/list` to `tools/call` on release, for
/// S3.
struct ModifyMethodObserver {
    intercept: Arc<InterceptEngine>,
}

impl PipelineObserver for ModifyMethodObserver {
    fn on_held(&self, message: &mcp_mitm_proxy::model::ProxyMessage) {
        let mut replacement = message.raw.clone();
        replacement["method"] = json!("tools/call");
        let _ = self
            .intercept
            .release(&message.id, ReleaseDecision::modify(replacement));
    }
}

#[tokio::test]
async fn s1_handshake_correlates_across_directions() {
    let (client_adapter, client_in, mut client_out) = channel_pair();
    let (server_adapter, server_in, mut server_out) = channel_pair();

    let session = Arc::new(SessionStore::new("s1", TransportKind::Stdio));
    let intercept = Arc::new(InterceptEngine::new(InterceptMode::Passthrough));
    let shared = Arc::new(PipelineShared::new(
        session.clone(),
        intercept,
        Arc::new(NoopObserver),
        TransportKind::Stdio,
    ));
    let handle = tokio::spawn(run_pipeline(client_adapter, server_adapter, shared));

    client_in
        .send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "t", "version": "0"},
            }
        }))
        .await
        .unwrap();
    let forwarded = server_out.recv().await.unwrap();
    assert_eq!(forwarded["method"], "initialize");

    client_in
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await
        .unwrap();
    let forwarded_notification = server_out.recv().await.unwrap();
    assert_eq!(forwarded_notification["method"], "notifications/initialized");

    server_in
        .send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"serverInfo": {"name": "fx", "version": "0"}}
        }))
        .await
        .unwrap();
    let response = client_out.recv().await.unwrap();
    assert_eq!(response["id"], 1);

    drop(client_in);
    drop(server_in);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

    let messages = session.messages();
    assert!(messages.len() >= 3);
    assert!(messages
        .iter()
        .any(|m| m.direction == mcp_mitm_proxy::model::Direction::ClientToServer));
    assert!(messages
        .iter()
        .any(|m| m.direction == mcp_mitm_proxy::model::Direction::ServerToClient));

    let request = messages
        .iter()
        .find(|m| m.method.as_deref() == Some("initialize"))
        .unwrap();
    let response_envelope = messages
        .iter()
        .find(|m| m.direction == mcp_mitm_proxy::model::Direction::ServerToClient)
        .unwrap();
    assert_eq!(response_envelope.correlated_id.as_deref(), Some(request.id.as_str()));
}

#[tokio::test]
async fn s2_dropped_message_never_reaches_destination_but_is_captured() {
    let (client_adapter, client_in, mut client_out) = channel_pair();
    let (server_adapter, _server_in, mut server_out) = channel_pair();

    let session = Arc::new(SessionStore::new("s2", TransportKind::Stdio));
    let intercept = Arc::new(InterceptEngine::new(InterceptMode::Intercept));
    let observer: Arc<dyn PipelineObserver> = Arc::new(DropAllObserver {
        intercept: intercept.clone(),
    });
    let shared = Arc::new(PipelineShared::new(
        session.clone(),
        intercept,
        observer,
        TransportKind::Stdio,
    ));
    let handle = tokio::spawn(run_pipeline(client_adapter, server_adapter, shared));

    client_in
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server_out.try_recv().is_err());

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].method.as_deref(), Some("tools/list"));

    drop(client_in);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    let _ = client_out.try_recv();
}

#[tokio::test]
async fn s3_modified_message_is_forwarded_with_original_preserved() {
    let (client_adapter, client_in, _client_out) = channel_pair();
    let (server_adapter, _server_in, mut server_out) = channel_pair();

    let session = Arc::new(SessionStore::new("s3", TransportKind::Stdio));
    let intercept = Arc::new(InterceptEngine::new(InterceptMode::Intercept));
    let observer: Arc<dyn PipelineObserver> = Arc::new(ModifyMethodObserver {
        intercept: intercept.clone(),
    });
    let shared = Arc::new(PipelineShared::new(
        session.clone(),
        intercept,
        observer,
        TransportKind::Stdio,
    ));
    let handle = tokio::spawn(run_pipeline(client_adapter, server_adapter, shared));

    client_in
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .unwrap();

    let forwarded = tokio::time::timeout(Duration::from_secs(1), server_out.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded["method"], "tools/call");

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].modified);
    assert_eq!(
        messages[0].original_raw.as_ref().unwrap()["method"],
        "tools/list"
    );

    drop(client_in);
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
}

#[tokio::test]
async fn s4_switching_to_passthrough_drains_both_held_messages() {
    let engine = InterceptEngine::new(InterceptMode::Intercept);

    let first = test_message("m1", "tools/list");
    let second = test_message("m2", "tools/call");
    let ticket_one = engine.hold(first);
    let ticket_two = engine.hold(second);
    assert_eq!(engine.get_held().len(), 2);

    engine.set_mode(InterceptMode::Passthrough);
    assert!(engine.get_held().is_empty());

    let decision_one = ticket_one.wait().await.unwrap();
    let decision_two = ticket_two.wait().await.unwrap();
    assert_eq!(decision_one.action, InterceptAction::Forward);
    assert_eq!(decision_two.action, InterceptAction::Forward);
}

#[tokio::test]
async fn s5_replay_timeout_reports_error_and_elapsed_time() {
    #[derive(Debug)]
    struct NeverRespondsAdapter;

    #[async_trait]
    impl TransportAdapter for NeverRespondsAdapter {
        async fn read(&self) -> mcp_mitm_proxy::error::TransportResult<Value> {
            std::future::pending().await
        }
        async fn write(&self, _message: Value) -> mcp_mitm_proxy::error::TransportResult<()> {
            Ok(())
        }
        async fn close(&self) -> mcp_mitm_proxy::error::TransportResult<()> {
            Ok(())
        }
    }

    let session = persisted_session_with(vec![test_message("m1", "tools/list")]);
    let result = replay_messages(
        &session,
        &NeverRespondsAdapter,
        Duration::from_millis(100),
        false,
    )
    .await
    .unwrap();

    assert_eq!(result.results.len(), 1);
    let entry = &result.results[0];
    assert!(entry.response.is_none());
    assert!(entry
        .error
        .as_deref()
        .unwrap()
        .to_lowercase()
        .contains("timeout"));
    assert!(entry.elapsed_ms >= 100);
}

#[tokio::test]
async fn s6_replay_auto_handshake_precedes_captured_request() {
    #[derive(Debug)]
    struct RecordingAdapter {
        responses: TokioMutex<std::collections::VecDeque<Value>>,
        sent: TokioMutex<Vec<Value>>,
    }

    #[async_trait]
    impl TransportAdapter for RecordingAdapter {
        async fn read(&self) -> mcp_mitm_proxy::error::TransportResult<Value> {
            self.responses
                .lock()
                .await
                .pop_front()
                .ok_or(mcp_mitm_proxy::error::TransportError::Closed)
        }
        async fn write(&self, message: Value) -> mcp_mitm_proxy::error::TransportResult<()> {
            self.sent.lock().await.push(message);
            Ok(())
        }
        async fn close(&self) -> mcp_mitm_proxy::error::TransportResult<()> {
            Ok(())
        }
    }

    let adapter = RecordingAdapter {
        responses: TokioMutex::new(
            vec![
                json!({"jsonrpc": "2.0", "id": "__handshake__", "result": {}}),
                json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}),
            ]
            .into(),
        ),
        sent: TokioMutex::new(Vec::new()),
    };

    let session = persisted_session_with(vec![test_message("m1", "tools/list")]);
    let result = replay_messages(&session, &adapter, Duration::from_secs(1), true)
        .await
        .unwrap();
    assert!(result.handshake_sent);

    let sent = adapter.sent.lock().await;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["method"], "initialize");
    assert_eq!(sent[1]["method"], "notifications/initialized");
    assert_eq!(sent[2]["method"], "tools/list");
}

fn test_message(id: &str, method: &str) -> mcp_mitm_proxy::model::ProxyMessage {
    mcp_mitm_proxy::model::ProxyMessage {
        id: id.to_string(),
        sequence: 0,
        timestamp: chrono::Utc::now(),
        direction: mcp_mitm_proxy::model::Direction::ClientToServer,
        transport: TransportKind::Stdio,
        raw: json!({"jsonrpc": "2.0", "id": 1, "method": method}),
        jsonrpc_id: Some(mcp_mitm_proxy::model::JsonRpcId::Number(1)),
        method: Some(method.to_string()),
        correlated_id: None,
        modified: false,
        original_raw: None,
    }
}

fn persisted_session_with(messages: Vec<mcp_mitm_proxy::model::ProxyMessage>) -> PersistedSession {
    PersistedSession {
        id: "replay-session".to_string(),
        started_at: chrono::Utc::now(),
        ended_at: None,
        transport: TransportKind::Stdio,
        server_command: None,
        server_url: None,
        metadata: std::collections::HashMap::new(),
        messages,
    }
}

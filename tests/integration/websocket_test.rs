//! End-to-end editing session tests over WebSocket

use convergedoc::shared::{ClientMessage, ErrorKind, Operation, ServerMessage};
use pretty_assertions::assert_eq;

use crate::common::{TestClient, TestServer};
use crate::{assert_converged, assert_error_reply};

#[tokio::test]
async fn test_join_receives_current_state() {
    let server = TestServer::with_document("doc", "hello").await;
    let client = TestClient::connect(&server.ws_url("doc")).await;
    assert_eq!(client.content(), "hello");
    assert_eq!(client.version(), 0);
}

#[tokio::test]
async fn test_default_document_route() {
    let server = TestServer::with_document("main", "default text").await;
    let client = TestClient::connect(&server.default_ws_url()).await;
    assert_eq!(client.content(), "default text");
}

#[tokio::test]
async fn test_concurrent_inserts_converge() {
    let server = TestServer::with_document("doc", "abc").await;
    let mut x = TestClient::connect(&server.ws_url("doc")).await;
    let mut y = TestClient::connect(&server.ws_url("doc")).await;

    x.send_op(Operation::insert(3, "d"), 0).await;
    assert_eq!(
        x.recv().await,
        ServerMessage::Ack { version: 1, ops: vec![Operation::insert(3, "d")] }
    );
    assert_eq!(
        y.recv().await,
        ServerMessage::Operation { op: Operation::insert(3, "d"), version: 1 }
    );

    // Y's edit was generated before it saw version 1.
    y.send_op(Operation::insert(0, "X"), 0).await;
    assert_eq!(
        y.recv().await,
        ServerMessage::Ack { version: 2, ops: vec![Operation::insert(0, "X")] }
    );
    assert_eq!(
        x.recv().await,
        ServerMessage::Operation { op: Operation::insert(0, "X"), version: 2 }
    );

    let late = TestClient::connect(&server.ws_url("doc")).await;
    assert_eq!(late.content(), "Xabcd");
    assert_eq!(late.version(), 2);
    assert_converged!("Xabcd", [x.content(), y.content()]);
}

#[tokio::test]
async fn test_insert_into_deleted_document() {
    let server = TestServer::with_document("doc", "hello").await;
    let mut x = TestClient::connect(&server.ws_url("doc")).await;
    let mut y = TestClient::connect(&server.ws_url("doc")).await;

    x.send_op(Operation::delete(0, 5), 0).await;
    x.recv_commits(1).await;
    y.recv_commits(1).await;

    y.send_op(Operation::insert(5, "!"), 0).await;
    assert_eq!(
        y.recv().await,
        ServerMessage::Ack { version: 2, ops: vec![Operation::insert(0, "!")] }
    );
    assert_eq!(
        x.recv().await,
        ServerMessage::Operation { op: Operation::insert(0, "!"), version: 2 }
    );
    assert_converged!("!", [x.content(), y.content()]);
}

#[tokio::test]
async fn test_many_sessions_converge() {
    const CLIENTS: usize = 4;
    const EDITS: usize = 5;

    let server = TestServer::with_document("doc", "base").await;
    let mut clients = Vec::new();
    for _ in 0..CLIENTS {
        clients.push(TestClient::connect(&server.ws_url("doc")).await);
    }

    // Everyone edits against version 0 at once; the server orders and
    // transforms them.
    for (index, client) in clients.iter_mut().enumerate() {
        for edit in 0..EDITS {
            let text = format!("{}{}", index, edit);
            client.send_op(Operation::insert(4, text), 0).await;
        }
    }

    for client in clients.iter_mut() {
        client.recv_commits(CLIENTS * EDITS).await;
    }

    let observer = TestClient::connect(&server.ws_url("doc")).await;
    assert_eq!(observer.version(), (CLIENTS * EDITS) as u64);
    assert_eq!(observer.content().chars().count(), 4 + CLIENTS * EDITS * 2);
    let replicas: Vec<String> = clients.iter().map(|c| c.content()).collect();
    assert_converged!(observer.content().as_str(), replicas);
}

#[tokio::test]
async fn test_malformed_messages_keep_session_open() {
    let server = TestServer::with_document("doc", "abc").await;
    let mut client = TestClient::connect(&server.ws_url("doc")).await;

    client.send_raw("{not json").await;
    assert_error_reply!(client.recv().await, ErrorKind::MalformedMessage);

    client.send_raw(r#"{"type":"operation","op":{"kind":"insert","position":0,"text":"x"}}"#).await;
    assert_error_reply!(client.recv().await, ErrorKind::MalformedMessage);

    client.send_op(Operation::insert(0, "x"), 7).await;
    assert_error_reply!(client.recv().await, ErrorKind::MalformedMessage);

    client.send_op(Operation::delete(1, 10), 0).await;
    assert_error_reply!(client.recv().await, ErrorKind::OutOfRange);

    client.send_op(Operation::insert(3, "!"), 0).await;
    assert_eq!(
        client.recv().await,
        ServerMessage::Ack { version: 1, ops: vec![Operation::insert(3, "!")] }
    );
}

#[tokio::test]
async fn test_binary_frame_closes_session() {
    let server = TestServer::with_document("doc", "abc").await;
    let mut client = TestClient::connect(&server.ws_url("doc")).await;

    client.send_binary(vec![1, 2, 3]).await;
    client.expect_closed().await;

    let meta = server.get("/collab/doc/meta").await;
    let meta: convergedoc::shared::DocumentMetadata = meta.json();
    assert_eq!(meta.session_count, 0);
}

#[tokio::test]
async fn test_resync_returns_current_state() {
    let server = TestServer::with_document("doc", "abc").await;
    let mut x = TestClient::connect(&server.ws_url("doc")).await;
    let mut y = TestClient::connect(&server.ws_url("doc")).await;

    x.send_op(Operation::insert(0, ">"), 0).await;
    x.recv_commits(1).await;
    y.recv_commits(1).await;

    y.send(&ClientMessage::Resync).await;
    assert_eq!(
        y.recv().await,
        ServerMessage::Init { content: ">abc".to_string(), version: 1 }
    );
    assert_eq!(y.content(), ">abc");
}

#[tokio::test]
async fn test_disconnect_does_not_affect_others() {
    let server = TestServer::with_document("doc", "abc").await;
    let leaving = TestClient::connect(&server.ws_url("doc")).await;
    let mut staying = TestClient::connect(&server.ws_url("doc")).await;
    leaving.close().await;

    staying.send_op(Operation::delete(0, 1), 0).await;
    assert_eq!(
        staying.recv().await,
        ServerMessage::Ack { version: 1, ops: vec![Operation::delete(0, 1)] }
    );
    assert_eq!(staying.content(), "bc");
}

#[tokio::test]
async fn test_http_replace_reaches_sessions() {
    let server = TestServer::with_document("doc", "old").await;
    let mut client = TestClient::connect(&server.ws_url("doc")).await;

    let response = server
        .put_json("/collab/doc", serde_json::json!({ "content": "new text" }))
        .await;
    assert!(response.status.is_success(), "PUT failed: {}", response.body);

    client.recv_commits(2).await;
    assert_eq!(client.content(), "new text");
    assert_eq!(client.version(), 2);
}

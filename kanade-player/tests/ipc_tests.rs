//! Control-channel protocol tests
//!
//! A tokio Unix listener stands in for the player's IPC endpoint, serving
//! canned newline-terminated JSON replies.

#![cfg(unix)]

use kanade_player::{ControlSocket, IpcError};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;

const IO_TIMEOUT: Duration = Duration::from_millis(500);

/// Serve `reply` to every connection, forwarding each received request line
fn fake_player(path: &PathBuf, reply: &'static str) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = UnixListener::bind(path).expect("bind fake player socket");
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                let _ = tx.send(line.trim().to_string());
                let _ = reader.get_mut().write_all(reply.as_bytes()).await;
            }
        }
    });
    rx
}

#[tokio::test]
async fn property_query_returns_served_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mpv.sock");
    let mut requests = fake_player(&path, "{\"data\":42.5,\"error\":\"success\"}\n");

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    let value = ipc.get_property_f64("time-pos").await.unwrap();
    assert_eq!(value, 42.5);

    // the request is one newline-terminated JSON object
    let sent = requests.recv().await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&sent).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({ "command": ["get_property", "time-pos"] })
    );
}

#[tokio::test]
async fn error_status_yields_no_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mpv.sock");
    let _requests = fake_player(&path, "{\"data\":null,\"error\":\"property unavailable\"}\n");

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    assert!(matches!(
        ipc.get_property_f64("duration").await,
        Err(IpcError::NoValue)
    ));
}

#[tokio::test]
async fn non_numeric_success_value_yields_no_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mpv.sock");
    let _requests = fake_player(&path, "{\"data\":\"some title\",\"error\":\"success\"}\n");

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    assert!(matches!(
        ipc.get_property_f64("duration").await,
        Err(IpcError::NoValue)
    ));
}

#[tokio::test]
async fn malformed_reply_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mpv.sock");
    let _requests = fake_player(&path, "definitely not json\n");

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    assert!(matches!(
        ipc.get_property("time-pos").await,
        Err(IpcError::Malformed)
    ));
}

#[tokio::test]
async fn missing_socket_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-created.sock");

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    assert!(matches!(
        ipc.command(&["cycle", "pause"]).await,
        Err(IpcError::Unavailable)
    ));
    assert!(matches!(
        ipc.get_property("duration").await,
        Err(IpcError::Unavailable)
    ));
}

#[tokio::test]
async fn stale_socket_file_is_unavailable() {
    // a leftover regular file at the socket path must not be mistaken for a
    // live endpoint
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.sock");
    std::fs::write(&path, b"stale").unwrap();

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    assert!(matches!(
        ipc.get_property("duration").await,
        Err(IpcError::Unavailable)
    ));
}

#[tokio::test]
async fn commands_are_newline_terminated_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mpv.sock");
    let mut requests = fake_player(&path, "{\"error\":\"success\"}\n");

    let ipc = ControlSocket::new(&path, IO_TIMEOUT);
    assert!(ipc.command(&["add", "volume", "5"]).await.is_ok());

    let sent = requests.recv().await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&sent).unwrap();
    assert_eq!(parsed, serde_json::json!({ "command": ["add", "volume", "5"] }));
}

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use benchwatch::{ChannelEvent, ConnectionManager, ConnectionStatus};
use tokio::time::timeout;
use url::Url;

async fn ws_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(scripted_session)
}

/// One benchmark session per connection: a running update, one
/// malformed frame, then completion, then the server hangs up.
async fn scripted_session(mut socket: WebSocket) {
    let frames = [
        r#"{ "status": "running", "current_model": "whisper-base", "progress": 3, "total": 10 }"#,
        "{ this is not json",
        r#"{ "status": "completed", "message": "Benchmark completed" }"#,
    ];
    for frame in frames {
        if socket.send(Message::Text(frame.to_string())).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn spawn_mock_channel() -> SocketAddr {
    let app = Router::new().route("/ws", get(ws_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn next_event(rx: &mut tokio::sync::mpsc::Receiver<ChannelEvent>) -> ChannelEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for channel event")
        .expect("channel closed unexpectedly")
}

#[tokio::test]
async fn channel_delivers_parsed_events_and_drops_malformed_frames() {
    let addr = spawn_mock_channel().await;
    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let (manager, mut rx) = ConnectionManager::spawn(url, Duration::from_millis(50));

    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Connecting)
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Open)
    ));

    let ChannelEvent::Status(first) = next_event(&mut rx).await else {
        panic!("expected a status event");
    };
    assert_eq!(first.status.as_deref(), Some("running"));
    assert_eq!(first.current_model.as_deref(), Some("whisper-base"));
    assert_eq!(first.progress, Some(3));

    // The malformed frame is dropped, so the very next event is the
    // completion update.
    let ChannelEvent::Status(second) = next_event(&mut rx).await else {
        panic!("expected a status event");
    };
    assert_eq!(second.status.as_deref(), Some("completed"));

    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Closed)
    ));

    manager.shutdown().await;
}

#[tokio::test]
async fn channel_reconnects_after_close() {
    let addr = spawn_mock_channel().await;
    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let (manager, mut rx) = ConnectionManager::spawn(url, Duration::from_millis(50));

    // Drain the first session to its close.
    loop {
        if matches!(
            next_event(&mut rx).await,
            ChannelEvent::Connection(ConnectionStatus::Closed)
        ) {
            break;
        }
    }

    // A second session starts on its own after the fixed delay.
    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Reconnecting)
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Open)
    ));
    let ChannelEvent::Status(event) = next_event(&mut rx).await else {
        panic!("expected a status event from the new channel");
    };
    assert_eq!(event.status.as_deref(), Some("running"));

    manager.shutdown().await;
}

#[tokio::test]
async fn failed_connect_reports_closed_then_retries() {
    // Nothing is listening here.
    let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
    let (manager, mut rx) = ConnectionManager::spawn(url, Duration::from_millis(20));

    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Connecting)
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Closed)
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        ChannelEvent::Connection(ConnectionStatus::Reconnecting)
    ));

    manager.shutdown().await;
}

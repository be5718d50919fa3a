#![allow(clippy::unwrap_used)]
// Push channel tests against a loopback Socket.IO stand-in built on
// `tokio_tungstenite::accept_async`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use printgate_api::{
    CaptureResult, ConnectionEvent, PushEvent, PushHandle, PushMessage, ReconnectConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn listen() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    (listener, url)
}

fn reconnect(initial_ms: u64, max_retries: u32) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(initial_ms),
        max_delay: Duration::from_millis(initial_ms * 4),
        max_retries: Some(max_retries),
    }
}

/// Accept one client and complete the Engine.IO open and namespace connect.
async fn handshake(stream: TcpStream) -> WebSocketStream<TcpStream> {
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    ws.send(Message::Text(
        r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":20000}"#.into(),
    ))
    .await
    .unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "40");
    ws.send(Message::Text(r#"40{"sid":"n1"}"#.into()))
        .await
        .unwrap();
    ws
}

async fn next_message(rx: &mut broadcast::Receiver<PushMessage>) -> PushMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_ping_and_event_delivery() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = handshake(stream).await;

        ws.send(Message::Text("2".into())).await.unwrap();
        let pong = ws.next().await.unwrap().unwrap();
        assert_eq!(pong.to_text().unwrap(), "3");

        ws.send(Message::Text(
            r#"42["capture_result",{"success":true,"message":"ok","template_no":2}]"#.into(),
        ))
        .await
        .unwrap();
        ws.close(None).await.unwrap();
    });

    let cancel = CancellationToken::new();
    let handle = PushHandle::spawn(&url, reconnect(50, 5), cancel.clone()).unwrap();
    let mut rx = handle.subscribe();

    assert_eq!(
        next_message(&mut rx).await,
        PushMessage::Connection(ConnectionEvent::Connected)
    );
    assert_eq!(
        next_message(&mut rx).await,
        PushMessage::Event(PushEvent::CaptureResult(CaptureResult {
            success: true,
            message: Some("ok".into()),
            template_no: Some(2),
        }))
    );
    assert_eq!(
        next_message(&mut rx).await,
        PushMessage::Connection(ConnectionEvent::Disconnected)
    );

    server.await.unwrap();
    handle.shutdown();
}

#[tokio::test]
async fn test_gives_up_after_retry_budget() {
    let (listener, url) = listen().await;
    // Nothing listens on the port any more, so every attempt is refused.
    drop(listener);

    let handle = PushHandle::spawn(&url, reconnect(10, 1), CancellationToken::new()).unwrap();
    let mut rx = handle.subscribe();

    assert!(matches!(
        next_message(&mut rx).await,
        PushMessage::Connection(ConnectionEvent::Error(_))
    ));
    assert!(matches!(
        next_message(&mut rx).await,
        PushMessage::Connection(ConnectionEvent::Error(_))
    ));
    assert_eq!(
        next_message(&mut rx).await,
        PushMessage::Connection(ConnectionEvent::GaveUp { attempts: 1 })
    );
}

#[tokio::test]
async fn test_clean_close_waits_before_reconnecting() {
    let (listener, url) = listen().await;
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    let server = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let mut ws = handshake(stream).await;
            let _ = ws.close(None).await;
        }
    });

    let cancel = CancellationToken::new();
    let handle = PushHandle::spawn(&url, reconnect(200, 5), cancel.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    handle.shutdown();
    server.abort();

    let count = accepted.load(Ordering::SeqCst);
    assert!((1..=3).contains(&count), "reconnected {count} times in 350ms");
}

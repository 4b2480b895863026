//! End-to-end tests for the viewer socket.
//!
//! Each test binds a real listener on an ephemeral port, connects viewers
//! with `tokio-tungstenite`, and drives the counter through the shared
//! [`AppState`].

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use deli_counter_core::CounterStore;
use deli_counter_server::serve;
use deli_counter_server::state::AppState;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Viewer = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

const HEARTBEAT: Duration = Duration::from_millis(100);

async fn start(initial: i64) -> (Arc<AppState>, SocketAddr) {
    launch(AppState::new(Arc::new(CounterStore::with_initial(initial)))).await
}

async fn start_with_heartbeat(initial: i64, period: Duration) -> (Arc<AppState>, SocketAddr) {
    let mut state = AppState::new(Arc::new(CounterStore::with_initial(initial)));
    state.heartbeat_interval = Some(period);
    launch(state).await
}

async fn launch(state: AppState) -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(
        listener,
        Arc::clone(&state),
        std::future::pending::<()>(),
    ));
    (state, addr)
}

async fn connect(addr: SocketAddr) -> Viewer {
    let url = format!("ws://{addr}/deli-counter-socket");
    let (stream, _response) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Next text frame, skipping control frames.
async fn recv_text(viewer: &mut Viewer) -> String {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match viewer.next().await.unwrap().unwrap() {
                Message::Text(text) => return text.as_str().to_owned(),
                Message::Close(_) => panic!("viewer closed while waiting for text"),
                _ => {}
            }
        }
    })
    .await
    .unwrap()
}

/// Assert no text frame arrives within a short window.
async fn assert_silent(viewer: &mut Viewer) {
    let got = tokio::time::timeout(Duration::from_millis(200), viewer.next()).await;
    assert!(got.is_err(), "unexpected frame: {got:?}");
}

/// Complete the upgrade handshake by hand and return the raw stream,
/// which the caller then never reads from or answers on.
async fn connect_unresponsive(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /deli-counter-socket HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut buf = [0u8; 256];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tokio::time::timeout(RECV_TIMEOUT, stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(n > 0, "server closed during handshake");
        head.extend_from_slice(&buf[..n]);
    }
    assert!(head.starts_with(b"HTTP/1.1 101"));
    stream
}

async fn wait_for_viewers(state: &AppState, expected: usize) {
    tokio::time::timeout(RECV_TIMEOUT, async {
        while state.broadcaster.viewer_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_first_message_is_current_value() {
    let (state, addr) = start(7).await;
    let mut viewer = connect(addr).await;

    assert_eq!(recv_text(&mut viewer).await, "7");
    assert_eq!(state.broadcaster.viewer_count(), 1);
}

#[tokio::test]
async fn test_increments_arrive_in_order_for_every_viewer() {
    let (state, addr) = start(100).await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    assert_eq!(recv_text(&mut a).await, "100");
    assert_eq!(recv_text(&mut b).await, "100");

    for _ in 0..25 {
        state.broadcaster.advance().await;
    }

    for viewer in [&mut a, &mut b] {
        for expected in 101..=125 {
            assert_eq!(recv_text(viewer).await, expected.to_string());
        }
        assert_silent(viewer).await;
    }
}

#[tokio::test]
async fn test_late_joiner_scenario() {
    let (state, addr) = start(0).await;
    let mut first = connect(addr).await;
    assert_eq!(recv_text(&mut first).await, "0");

    state.broadcaster.advance().await;
    assert_eq!(recv_text(&mut first).await, "1");

    let mut second = connect(addr).await;
    assert_eq!(recv_text(&mut second).await, "1");

    state.broadcaster.retreat().await;
    assert_eq!(recv_text(&mut first).await, "0");
    assert_eq!(recv_text(&mut second).await, "0");

    second.close(None).await.unwrap();
    wait_for_viewers(&state, 1).await;

    let delivery = state.broadcaster.retreat().await;
    assert_eq!(delivery.value, -1);
    assert_eq!(delivery.delivered, 1);
    assert_eq!(recv_text(&mut first).await, "-1");
}

#[tokio::test]
async fn test_abrupt_disconnect_unregisters() {
    let (state, addr) = start(0).await;
    let mut viewer = connect(addr).await;
    assert_eq!(recv_text(&mut viewer).await, "0");
    wait_for_viewers(&state, 1).await;

    drop(viewer);
    wait_for_viewers(&state, 0).await;

    let delivery = state.broadcaster.advance().await;
    assert_eq!(delivery.delivered, 0);
}

#[tokio::test]
async fn test_viewer_messages_are_ignored() {
    let (state, addr) = start(3).await;
    let mut viewer = connect(addr).await;
    assert_eq!(recv_text(&mut viewer).await, "3");

    viewer.send(Message::text("99")).await.unwrap();
    viewer
        .send(Message::binary(vec![1u8, 2, 3]))
        .await
        .unwrap();

    state.broadcaster.advance().await;
    assert_eq!(recv_text(&mut viewer).await, "4");
    assert_eq!(state.broadcaster.current_value(), 4);
    assert_eq!(state.broadcaster.viewer_count(), 1);
}

#[tokio::test]
async fn test_http_control_broadcasts_to_viewers() {
    let (state, addr) = start(0).await;
    let mut viewer = connect(addr).await;
    assert_eq!(recv_text(&mut viewer).await, "0");

    // Plain HTTP/1.1 POST over a raw socket.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST /api/counter/advance HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));

    assert_eq!(recv_text(&mut viewer).await, "1");
    assert_eq!(state.broadcaster.current_value(), 1);
}

#[tokio::test]
async fn test_many_viewers_connect_and_leave_during_broadcasts() {
    let (state, addr) = start(0).await;

    let producer = {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            for _ in 0..100 {
                state.broadcaster.advance().await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    // (viewer, last value seen)
    let mut open: Vec<(Viewer, i64)> = Vec::new();
    for _ in 0..10 {
        let mut viewer = connect(addr).await;
        let first: i64 = recv_text(&mut viewer).await.parse().unwrap();
        assert!((0..=100).contains(&first));
        open.push((viewer, first));
        if open.len() > 3 {
            let (mut leaving, _) = open.remove(0);
            leaving.close(None).await.unwrap();
        }
    }

    producer.await.unwrap();

    for (viewer, last) in &mut open {
        while *last < 100 {
            let next: i64 = recv_text(viewer).await.parse().unwrap();
            assert_eq!(next, *last + 1);
            *last = next;
        }
    }

    drop(open);
    wait_for_viewers(&state, 0).await;
    assert_eq!(state.broadcaster.current_value(), 100);
}

#[tokio::test]
async fn test_heartbeat_ping_reaches_viewer() {
    let (_state, addr) = start_with_heartbeat(0, HEARTBEAT).await;
    let mut viewer = connect(addr).await;
    assert_eq!(recv_text(&mut viewer).await, "0");

    let ping = tokio::time::timeout(HEARTBEAT * 3, async {
        loop {
            if let Message::Ping(_) = viewer.next().await.unwrap().unwrap() {
                return;
            }
        }
    })
    .await;
    assert!(ping.is_ok(), "no heartbeat ping within three periods");
}

#[tokio::test]
async fn test_responsive_viewer_survives_heartbeats() {
    let (state, addr) = start_with_heartbeat(0, HEARTBEAT).await;
    let mut viewer = connect(addr).await;
    assert_eq!(recv_text(&mut viewer).await, "0");

    // Reading lets tungstenite answer each ping with a pong.
    let mut pings = 0;
    let _ = tokio::time::timeout(HEARTBEAT * 8, async {
        while let Some(Ok(msg)) = viewer.next().await {
            if matches!(msg, Message::Ping(_)) {
                pings += 1;
            }
        }
    })
    .await;

    assert!(pings >= 4, "only {pings} pings seen");
    assert_eq!(state.broadcaster.viewer_count(), 1);
    state.broadcaster.advance().await;
    assert_eq!(recv_text(&mut viewer).await, "1");
}

#[tokio::test]
async fn test_unresponsive_viewer_is_unregistered() {
    let (state, addr) = start_with_heartbeat(0, HEARTBEAT).await;
    let _silent = connect_unresponsive(addr).await;
    wait_for_viewers(&state, 1).await;

    for _ in 0..2000 {
        state.broadcaster.advance().await;
    }

    wait_for_viewers(&state, 0).await;
    let delivery = state.broadcaster.advance().await;
    assert_eq!(delivery.delivered, 0);
}

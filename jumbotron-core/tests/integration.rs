//! End-to-end tests over real loopback sockets: a fake device serving
//! the HTTP handshake on one port and the push feed one port above.

use std::time::Duration;

use futures::SinkExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use jumbotron_core::{
    Endpoint, Pixel, PushChannel, PushEvent, PushFrame, Session, SyncEngine, WsChannel,
    protocol::NANOS_PER_MILLI, protocol::unix_millis_now,
};

fn frame(rows: usize, columns: usize, cell: Pixel) -> PushFrame {
    PushFrame {
        data: vec![vec![cell; columns]; rows],
        timestamp: unix_millis_now() * NANOS_PER_MILLI,
    }
}

/// Serve `body` to every HTTP request arriving on `listener`.
async fn serve_http(listener: TcpListener, body: String) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let body = body.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });
    }
}

/// Serve the given push frames to the first WebSocket peer, then close.
async fn serve_push(listener: TcpListener, frames: Vec<PushFrame>) {
    let (stream, _) = match listener.accept().await {
        Ok(pair) => pair,
        Err(_) => return,
    };
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    for f in frames {
        let text = serde_json::to_string(&f).unwrap();
        if ws.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
    let _ = ws.close(None).await;
}

/// Bind an adjacent HTTP/push port pair. Ephemeral allocation cannot
/// guarantee two neighbouring free ports in one shot, so probe a few
/// candidates.
async fn bind_device_ports() -> (TcpListener, TcpListener, Endpoint) {
    for _ in 0..16 {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http_port = probe.local_addr().unwrap().port();
        if let Ok(push) = TcpListener::bind(("127.0.0.1", http_port + 1)).await {
            return (probe, push, Endpoint::new("127.0.0.1", http_port));
        }
    }
    panic!("could not allocate an adjacent port pair");
}

#[tokio::test]
async fn session_mirrors_pushed_frames() {
    let (http, push, endpoint) = bind_device_ports().await;

    tokio::spawn(serve_http(
        http,
        r#"{"isAlive":true,"rows":2,"columns":3}"#.to_string(),
    ));
    tokio::spawn(serve_push(
        push,
        vec![
            frame(2, 3, Pixel::new(10, 20, 30, 40)),
            frame(2, 3, Pixel::new(50, 60, 70, 80)),
        ],
    ));

    let mut session = Session::connect(endpoint).await.unwrap();
    let mut frames = session.frames();

    // Watch channels coalesce, so poll until the second frame lands.
    while frames.borrow().cells.get(1).map(|r| r[2]) != Some(Pixel::new(50, 60, 70, 80)) {
        tokio::time::timeout(Duration::from_secs(5), frames.changed())
            .await
            .unwrap()
            .unwrap();
    }

    let state = frames.borrow().clone();
    assert_eq!(state.cells.len(), 2);
    assert_eq!(state.cells[0].len(), 3);
    assert_eq!(state.cells[1][2], Pixel::new(50, 60, 70, 80));

    // The feed closed after the second frame; reachability drops and
    // the last grid stays published.
    let monitor = session.monitor();
    let mut reachable = monitor.reachable_changes();
    while *reachable.borrow() {
        tokio::time::timeout(Duration::from_secs(5), reachable.changed())
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(frames.borrow().cells[1][2], Pixel::new(50, 60, 70, 80));

    session.disconnect();
}

#[tokio::test]
async fn ws_channel_feeds_engine_directly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let push_port = listener.local_addr().unwrap().port();
    tokio::spawn(serve_push(listener, vec![frame(1, 2, Pixel::new(9, 9, 9, 9))]));

    // The push feed lives one above the HTTP port.
    let endpoint = Endpoint::new("127.0.0.1", push_port - 1);
    let channel = WsChannel::connect(&endpoint).await.unwrap();

    let mut engine = SyncEngine::new(1, 2);
    let frames = engine.frame_receiver();
    engine.run(channel).await.unwrap();

    assert_eq!(frames.borrow().cells[0][1], Pixel::new(9, 9, 9, 9));
}

#[tokio::test]
async fn channel_events_arrive_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let push_port = listener.local_addr().unwrap().port();
    tokio::spawn(serve_push(
        listener,
        vec![frame(1, 1, Pixel::new(1, 0, 0, 0)), frame(1, 1, Pixel::new(2, 0, 0, 0))],
    ));

    let endpoint = Endpoint::new("127.0.0.1", push_port - 1);
    let mut channel = WsChannel::connect(&endpoint).await.unwrap();

    match channel.next().await {
        PushEvent::Frame(f) => assert_eq!(f.data[0][0].r, 1),
        other => panic!("expected frame, got {other:?}"),
    }
    match channel.next().await {
        PushEvent::Frame(f) => assert_eq!(f.data[0][0].r, 2),
        other => panic!("expected frame, got {other:?}"),
    }
    assert!(matches!(channel.next().await, PushEvent::Closed));
}

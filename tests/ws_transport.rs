//! The WebSocket transport against an in-process server playing the
//! relay's side of the socket.

use futures_util::{SinkExt, StreamExt};
use pairchat::signaling::{ClientEvent, PeerId, ServerEvent, SignalingTransport, WsSignaling};
use pairchat::SignalingError;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn bind() -> (TcpListener, String) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test]
async fn frames_go_out_as_json_text() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => assert!(text.starts_with(r#"{"event":"start""#)),
            other => panic!("unexpected frame: {other:?}"),
        }
    });

    let mut transport = WsSignaling::connect(&url).await.unwrap();
    transport
        .send(ClientEvent::Start(PeerId::from("me")))
        .await
        .unwrap();
    server.await.unwrap();
    // The server half is already gone; closing may race its FIN.
    let _ = transport.close().await;
}

#[tokio::test]
async fn server_close_maps_to_closed() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"event":"numberOfOnline","data":3}"#.into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
    });

    let mut transport = WsSignaling::connect(&url).await.unwrap();
    assert!(matches!(
        transport.recv().await,
        Ok(ServerEvent::NumberOfOnline(3))
    ));
    assert!(matches!(
        transport.recv().await,
        Err(SignalingError::Closed)
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn pings_are_answered_with_pongs() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Ping(b"keepalive".to_vec())).await.unwrap();
        // The pong comes back before any text frame is offered.
        let reply = ws.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::Pong(b"keepalive".to_vec()));
        ws.send(Message::Text(r#"{"event":"strangerIsDoneTyping"}"#.into()))
            .await
            .unwrap();
    });

    let mut transport = WsSignaling::connect(&url).await.unwrap();
    assert!(matches!(
        transport.recv().await,
        Ok(ServerEvent::StrangerIsDoneTyping)
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn binary_frames_decode_like_text() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Binary(
            br#"{"event":"searching","data":"Searching for a stranger..."}"#.to_vec(),
        ))
        .await
        .unwrap();
    });

    let mut transport = WsSignaling::connect(&url).await.unwrap();
    match transport.recv().await.unwrap() {
        ServerEvent::Searching(msg) => assert_eq!(msg, "Searching for a stranger..."),
        other => panic!("unexpected event: {other:?}"),
    }
    server.await.unwrap();
}

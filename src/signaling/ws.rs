use crate::error::SignalingError;
use crate::signaling::events::{self, ClientEvent, ServerEvent};
use crate::signaling::transport::SignalingTransport;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;

fn map_ws_error(err: impl std::fmt::Display) -> SignalingError {
    SignalingError::Io(err.to_string())
}

/// WebSocket signaling channel, one JSON text frame per event.
pub struct WsSignaling {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsSignaling {
    pub async fn connect(url: &str) -> Result<Self, SignalingError> {
        let (stream, _response) = connect_async(url).await.map_err(map_ws_error)?;
        debug!(url, "connected to relay");
        Ok(Self { stream })
    }
}

#[async_trait]
impl SignalingTransport for WsSignaling {
    async fn send(&mut self, event: ClientEvent) -> Result<(), SignalingError> {
        let frame = events::encode(&event)?;
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(map_ws_error)
    }

    async fn recv(&mut self) -> Result<ServerEvent, SignalingError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return events::decode(&text),
                Some(Ok(Message::Binary(bytes))) => {
                    return serde_json::from_slice(&bytes).map_err(SignalingError::Decode)
                }
                Some(Ok(Message::Ping(payload))) => {
                    self.stream
                        .send(Message::Pong(payload))
                        .await
                        .map_err(map_ws_error)?;
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Err(SignalingError::Closed),
                Some(Ok(other)) => {
                    return Err(SignalingError::Unsupported(format!("{other:?}")))
                }
                Some(Err(err)) => return Err(map_ws_error(err)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        self.stream.close(None).await.map_err(map_ws_error)
    }
}

use crate::error::SignalingError;
use crate::signaling::events::{ClientEvent, ServerEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Message transport to the relay server. FIFO, at-most-once per
/// connection; no reconnection. A dropped transport is reported through
/// `recv` as [`SignalingError::Closed`] and forces the session to end.
#[async_trait]
pub trait SignalingTransport: Send {
    async fn send(&mut self, event: ClientEvent) -> Result<(), SignalingError>;
    async fn recv(&mut self) -> Result<ServerEvent, SignalingError>;
    async fn close(&mut self) -> Result<(), SignalingError>;
}

/// In-process transport half handed to the client.
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    inbound: mpsc::UnboundedReceiver<ServerEvent>,
}

/// Relay half of [`memory_pair`]: what a test (or a loopback relay)
/// drives to play the server's role.
pub struct MemoryRelay {
    pub to_client: mpsc::UnboundedSender<ServerEvent>,
    pub from_client: mpsc::UnboundedReceiver<ClientEvent>,
}

/// Connected in-process transport pair.
pub fn memory_pair() -> (MemoryTransport, MemoryRelay) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            outbound: out_tx,
            inbound: in_rx,
        },
        MemoryRelay {
            to_client: in_tx,
            from_client: out_rx,
        },
    )
}

#[async_trait]
impl SignalingTransport for MemoryTransport {
    async fn send(&mut self, event: ClientEvent) -> Result<(), SignalingError> {
        self.outbound
            .send(event)
            .map_err(|_| SignalingError::Closed)
    }

    async fn recv(&mut self) -> Result<ServerEvent, SignalingError> {
        self.inbound.recv().await.ok_or(SignalingError::Closed)
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        self.inbound.close();
        Ok(())
    }
}

//! Typed signaling channel to the relay server.
//!
//! The relay matches two waiting clients and forwards every payload
//! between exactly those two. The wire format is one JSON object per
//! frame, `{"event": <name>, "data": <payload>}`, with the relay's
//! event names.

pub mod events;
pub mod transport;
pub mod ws;

pub use events::{
    decode, encode, ChatPayload, ClientEvent, IceCandidate, PeerId, ServerEvent, SignalEnvelope,
    SignalPayload,
};
pub use transport::{memory_pair, MemoryRelay, MemoryTransport, SignalingTransport};
pub use ws::WsSignaling;

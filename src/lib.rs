//! Client core for an anonymous, randomly-paired text and video chat.
//!
//! A relay server matches two waiting strangers and forwards their
//! signaling and chat payloads; this crate drives everything on the
//! client side of that contract: the session state machine, the WebRTC
//! offer/answer/ICE exchange, chat text, typing indicators and the UI
//! state projection.

pub mod client;
pub mod config;
pub mod error;
pub mod peer;
pub mod presence;
pub mod session;
pub mod signaling;
mod utils;

pub use client::{ChatClient, ChatHandle};
pub use config::{IceServerConfig, SessionConfig};
pub use error::{ConfigError, MediaError, SessionError, SignalingError};
pub use peer::{MediaEvent, MediaSession, MediaSource, NoMedia, StaticTracks};
pub use presence::{Controls, PresenceView, TranscriptLine};
pub use session::{ChatSession, SessionState, UiEvent, UserAction};
pub use signaling::{
    ClientEvent, IceCandidate, PeerId, ServerEvent, SignalEnvelope, SignalPayload,
    SignalingTransport, WsSignaling,
};

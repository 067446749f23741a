use thiserror::Error;

/// Failures on the signaling channel to the relay server.
///
/// `Closed` covers both a clean close frame and EOF; the session layer
/// treats every transport failure the same way, as a forced disconnect.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("failed to encode signaling frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode signaling frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("signaling channel closed")]
    Closed,

    #[error("signaling transport error: {0}")]
    Io(String),

    #[error("unsupported signaling frame: {0}")]
    Unsupported(String),
}

/// Failures inside the media session.
///
/// `Acquisition` is recoverable: the chat continues text-only. The other
/// variants surface as a terminal transition, equivalent to a partner
/// disconnect.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media capture unavailable: {0}")]
    Acquisition(String),

    #[error("webrtc negotiation failed: {0}")]
    Negotiation(#[from] webrtc::Error),

    #[error("local description missing after negotiation step")]
    MissingLocalDescription,
}

/// Invalid ICE server configuration supplied by the embedder.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ICE server URL cannot be empty")]
    EmptyUrl,

    #[error("TURN server {0} requires username and credential")]
    MissingTurnCredentials(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

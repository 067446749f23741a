use crate::error::MediaError;
use async_trait::async_trait;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

/// Capture capability. The core never touches camera or microphone APIs
/// itself; the embedder supplies whatever local tracks it can produce.
///
/// Acquisition failure is never fatal to the chat: the session continues
/// text-only.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<Vec<Arc<dyn TrackLocal + Send + Sync>>, MediaError>;
}

/// No capture hardware at all; every session is text-only.
pub struct NoMedia;

#[async_trait]
impl MediaSource for NoMedia {
    async fn acquire(&self) -> Result<Vec<Arc<dyn TrackLocal + Send + Sync>>, MediaError> {
        Ok(Vec::new())
    }
}

/// Pre-built local tracks (headless capture pipelines, tests).
pub struct StaticTracks(pub Vec<Arc<dyn TrackLocal + Send + Sync>>);

#[async_trait]
impl MediaSource for StaticTracks {
    async fn acquire(&self) -> Result<Vec<Arc<dyn TrackLocal + Send + Sync>>, MediaError> {
        Ok(self.0.clone())
    }
}

/// Capture that always fails, as when camera/microphone permission was
/// denied. Exercises the text-only fallback.
pub struct DeniedMedia;

#[async_trait]
impl MediaSource for DeniedMedia {
    async fn acquire(&self) -> Result<Vec<Arc<dyn TrackLocal + Send + Sync>>, MediaError> {
        Err(MediaError::Acquisition("permission denied".into()))
    }
}

pub mod connection;
pub mod ice;
pub mod media;

pub use connection::{MediaEvent, MediaSession};
pub use media::{DeniedMedia, MediaSource, NoMedia, StaticTracks};

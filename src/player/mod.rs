//! Video player integration
//!
//! - mpv: external mpv process driven over JSON IPC
//! - protocol: mpv IPC message types
//!
//! The playback session never calls a player directly; the watch driver
//! forwards session effects through the [`Player`] trait and feeds
//! [`PlayerEvent`]s back as session commands.

pub mod mpv;
pub mod protocol;

use thiserror::Error;

pub use mpv::{MpvOptions, MpvPlayer};

/// Errors from the player
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),

    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),

    #[error("Player IPC failed: {0}")]
    Ipc(String),

    #[error("Player is not running")]
    Disconnected,

    /// Decode or stream failure reported by the player
    #[error("Playback failed: {0}")]
    Stream(String),

    #[error("Player IPC is not supported on this platform")]
    Unsupported,
}

/// What the player reports back
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Position update; `duration` is 0 until known
    Progress { position: f64, duration: f64 },
    /// The current file played to the end
    Ended,
    /// The current file could not be played
    Failed(String),
    /// The player went away (window closed)
    Closed,
}

/// Control surface of a player
pub trait Player {
    /// Replace the current file and start playing at `speed`
    fn load(&mut self, url: &str, speed: f64) -> Result<(), PlaybackError>;

    fn set_paused(&mut self, paused: bool) -> Result<(), PlaybackError>;

    fn set_speed(&mut self, speed: f64) -> Result<(), PlaybackError>;

    /// Absolute seek in seconds
    fn seek(&mut self, position: f64) -> Result<(), PlaybackError>;

    fn stop(&mut self) -> Result<(), PlaybackError>;
}

//! Playback
//!
//! - session: per-episode state machine (commands in, effects out)
//! - remote: device key → command routing
//! - keys: terminal keyboard as a remote control
//! - continuation: next-episode resolution
//! - watch: driver tying session, player and keys together

pub mod continuation;
pub mod keys;
pub mod remote;
pub mod session;
pub mod watch;

pub use continuation::{Continuation, ContinuationResolver};
pub use keys::RemoteKeys;
pub use remote::{DeviceKey, RemoteInputRouter, UnmappedKey};
pub use session::{Command, Effect, InputMode, Motion, Phase, PlaybackSession, PlaybackState, Speed};
pub use watch::{WatchEnd, WatchError, WatchSummary, Watcher};

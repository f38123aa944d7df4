//! tvshows - Browse and watch TV shows from a home media server
//!
//! Lists channels, shows, episodes and parts served by a media server on the
//! local network and plays them, continuing to older episodes on its own.
//!
//! # Modules
//!
//! - `models` - Hosts, episode lists, parts, notices
//! - `api` - Host failover, cancellable fetches, episode catalog
//! - `playback` - Session state machine, remote keys, continuation, watch loop
//! - `player` - mpv over JSON IPC
//! - `config` - TOML configuration
//! - `cli` / `commands` - Scriptable command line
//! - `logging` - tracing setup

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod playback;
pub mod player;

// Re-export commonly used types
pub use models::{EpisodeList, EpisodeRef, Host, HomeListing, Notice, Part, ShowSummary};

pub use api::{CatalogError, EpisodeCatalog, FetchClient, FetchError, HostRegistry};
pub use playback::{PlaybackSession, Watcher};

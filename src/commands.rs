//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the catalog and playback modules.
//! Each handler takes CLI args, the shared [`AppContext`] and Output, and
//! returns ExitCode.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::api::{
    CatalogError, EpisodeCatalog, FetchClient, FetchError, FileHostStore, HostRegistry,
    HostStore, MemoryHostStore,
};
use crate::cli::{
    EpisodeArgs, EpisodesCmd, ExitCode, HostsAction, HostsCmd, HostsStatus, NextResponse, Output,
    WatchCmd, WatchResponse,
};
use crate::config::Config;
use crate::models::{Host, Notice};
use crate::playback::{
    Continuation, ContinuationResolver, RemoteInputRouter, RemoteKeys, WatchEnd, WatchError,
    Watcher,
};
use crate::player::{MpvOptions, MpvPlayer, PlaybackError};

/// Capacity of the notice channel shared by fetches and playback
const NOTICE_CAPACITY: usize = 64;

const KEY_HELP: &str = "←/→ seek (or speed)  ↑/↓ switch seek/speed  Enter/Space pause  \
                        n/p next/previous part  1-9 pick part  q quit";

// =============================================================================
// Context
// =============================================================================

/// Everything the handlers share for one invocation
pub struct AppContext {
    pub config: Config,
    pub catalog: Arc<EpisodeCatalog>,
    pub notices: broadcast::Sender<Notice>,
}

impl AppContext {
    /// Build from config and `--host` flags, persisting the host index under
    /// the user's data directory
    pub fn new(config: Config, cli_hosts: &[String]) -> anyhow::Result<Self> {
        let hosts = config.host_list(cli_hosts)?;
        let store: Arc<dyn HostStore> = match FileHostStore::default_path() {
            Some(path) => Arc::new(FileHostStore::new(path)),
            None => Arc::new(MemoryHostStore::new()),
        };
        let registry = HostRegistry::new(hosts, store)?;
        Ok(Self::with_registry(config, Arc::new(registry)))
    }

    pub fn with_registry(config: Config, registry: Arc<HostRegistry>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let fetch = FetchClient::with_notices(registry, notices.clone());
        Self {
            config,
            catalog: Arc::new(EpisodeCatalog::new(fetch)),
            notices,
        }
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        self.catalog.fetch().registry()
    }
}

/// Print notices on stderr while a command runs
pub fn spawn_notice_printer(ctx: &AppContext, output: &Output) -> tokio::task::JoinHandle<()> {
    let mut notices = ctx.notices.subscribe();
    let visible = !output.quiet && !output.json;
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                // \r keeps lines aligned while the terminal is in raw mode
                Ok(notice) if visible => eprint!("{}\r\n", notice),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "Notice printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Exit code for a fetch failure
pub fn fetch_exit_code(error: &FetchError) -> ExitCode {
    match error {
        FetchError::Network { .. } | FetchError::HostsExhausted { .. } => ExitCode::NetworkError,
        FetchError::HttpStatus { .. } => ExitCode::HttpStatus,
        FetchError::Cancelled | FetchError::Decode(_) => ExitCode::Error,
    }
}

/// Exit code for a catalog failure
pub fn catalog_exit_code(error: &CatalogError) -> ExitCode {
    match error {
        CatalogError::Fetch(e) => fetch_exit_code(e),
        CatalogError::EmptyResult(_) => ExitCode::EmptyResult,
    }
}

fn catalog_error(output: &Output, context: &str, error: CatalogError) -> ExitCode {
    output.error(format!("{}: {}", context, error), catalog_exit_code(&error))
}

// =============================================================================
// Home Command
// =============================================================================

pub async fn home_cmd(ctx: &AppContext, output: &Output) -> ExitCode {
    output.info(format!("Fetching home from {}...", ctx.catalog.fetch().current_host()));

    match ctx.catalog.home().await {
        Ok(home) => {
            let lines = home.iter().flat_map(|(channel, shows)| {
                std::iter::once(channel.clone())
                    .chain(shows.iter().map(|show| format!("  {}", show)))
            });
            if let Err(e) = output.print_lines(&home, lines) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => catalog_error(output, "Home fetch failed", e),
    }
}

// =============================================================================
// Episodes Command
// =============================================================================

pub async fn episodes_cmd(cmd: EpisodesCmd, ctx: &AppContext, output: &Output) -> ExitCode {
    output.info(format!("Fetching episodes of {} > {}...", cmd.channel, cmd.show));

    let result = if cmd.all {
        ctx.catalog.load_all(&cmd.channel, &cmd.show).await
    } else {
        ctx.catalog.first_page(&cmd.channel, &cmd.show).await
    };

    match result {
        Ok(list) => {
            if list.has_more {
                output.info("More episodes available (use --all)");
            }
            if let Err(e) = output.print_lines(&list, list.episodes.iter()) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => catalog_error(output, "Episodes fetch failed", e),
    }
}

// =============================================================================
// Parts Command
// =============================================================================

pub async fn parts_cmd(cmd: EpisodeArgs, ctx: &AppContext, output: &Output) -> ExitCode {
    let episode = cmd.episode_ref();
    output.info(format!("Fetching parts of {}...", episode));

    match ctx.catalog.parts(&episode).await {
        Ok(parts) => {
            let lines = parts
                .iter()
                .enumerate()
                .map(|(i, part)| format!("{}. {}  {}", i + 1, part.title, part.url));
            if let Err(e) = output.print_lines(&parts, lines) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => catalog_error(output, "Parts fetch failed", e),
    }
}

// =============================================================================
// Next Command
// =============================================================================

pub async fn next_cmd(cmd: EpisodeArgs, ctx: &AppContext, output: &Output) -> ExitCode {
    let current = cmd.episode_ref();
    output.info(format!("Looking for the episode after {}...", current));

    match ContinuationResolver::new(&ctx.catalog).resolve(&current).await {
        Ok(continuation) => {
            let response = NextResponse {
                next: continuation.next().cloned(),
                outcome: continuation_name(&continuation),
                current,
            };
            let line = match &response.next {
                Some(next) => next.episode.clone(),
                None => format!("No next episode ({})", response.outcome),
            };
            if let Err(e) = output.print_lines(&response, [line]) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => catalog_error(output, "Continuation lookup failed", e),
    }
}

fn continuation_name(continuation: &Continuation) -> &'static str {
    match continuation {
        Continuation::Next(_) => "next",
        Continuation::Oldest => "oldest",
        Continuation::NotFound => "not_found",
    }
}

// =============================================================================
// Watch Command
// =============================================================================

pub async fn watch_cmd(cmd: WatchCmd, ctx: &AppContext, output: &Output) -> ExitCode {
    let options = MpvOptions {
        program: ctx.config.player_program().to_string(),
        extra_args: ctx.config.mpv_args.clone(),
        ..MpvOptions::default()
    };

    let (player, events) = match MpvPlayer::spawn(&options).await {
        Ok(spawned) => spawned,
        Err(e) => return output.error(e.to_string(), ExitCode::PlaybackFailed),
    };

    output.info(KEY_HELP);
    let keys = match RemoteKeys::subscribe() {
        Ok(keys) => keys,
        Err(e) => {
            player.shutdown().await;
            return output.error(format!("Failed to read terminal input: {}", e), ExitCode::Error);
        }
    };

    let printer = spawn_notice_printer(ctx, output);
    let mut watcher = Watcher::new(ctx.catalog.clone(), player, events, keys, ctx.notices.clone())
        .with_router(RemoteInputRouter::new(ctx.config.seek_step_secs))
        .autoplay_first_part(cmd.autoplay || ctx.config.autoplay_first_part);

    let result = watcher.run(cmd.episode.episode_ref(), cmd.part_index()).await;

    // Dropping the watcher's key stream restores the terminal
    watcher.into_player().shutdown().await;
    printer.abort();

    match result {
        Ok(summary) => {
            let end = match &summary.end {
                WatchEnd::Exited => "exited",
                WatchEnd::Exhausted(continuation) => continuation_name(continuation),
            };
            let response = WatchResponse {
                watched: summary.episodes,
                end,
            };
            if output.json {
                if let Err(e) = output.print(&response) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                output.info(format!("Watched {} episode(s)", response.watched.len()));
            }
            ExitCode::Success
        }
        Err(WatchError::Catalog(e)) => catalog_error(output, "Watch failed", e),
        Err(WatchError::Playback(e)) => playback_error(output, e),
    }
}

fn playback_error(output: &Output, error: PlaybackError) -> ExitCode {
    output.error(error.to_string(), ExitCode::PlaybackFailed)
}

// =============================================================================
// Hosts Command
// =============================================================================

pub fn hosts_cmd(cmd: HostsCmd, ctx: &AppContext, output: &Output) -> ExitCode {
    let registry = ctx.registry();

    match cmd.action {
        Some(HostsAction::Reset { index }) => {
            if let Err(e) = registry.reset(index) {
                return output.error(e.to_string(), ExitCode::InvalidArgs);
            }
        }
        Some(HostsAction::Advance) => {
            registry.advance();
        }
        None => {}
    }

    let index = registry.index();
    let status = HostsStatus {
        hosts: registry.hosts().iter().map(Host::to_string).collect(),
        index,
        current: registry.current().to_string(),
    };
    let lines = status.hosts.iter().enumerate().map(|(i, host)| {
        let marker = if i == index { "*" } else { " " };
        format!("{} {} {}", marker, i, host)
    });
    if let Err(e) = output.print_lines(&status, lines) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

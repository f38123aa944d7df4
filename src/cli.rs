//! CLI - Command Line Interface for tvshows
//!
//! Every catalog query is scriptable and prints JSON when asked (or when
//! stdout is not a terminal). `watch` is the interactive mode: mpv plays,
//! the terminal is the remote control.
//!
//! # Examples
//!
//! ```bash
//! # Browse
//! tvshows home
//! tvshows episodes "Star Plus" "Anupamaa" --all --json
//! tvshows parts "Star Plus" "Anupamaa" "Episode 512"
//!
//! # Watch, continuing to older episodes automatically
//! tvshows watch "Star Plus" "Anupamaa" "Episode 512" --part 2
//!
//! # Host failover state
//! tvshows hosts
//! tvshows hosts reset 0
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::EpisodeRef;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error, every host failed
    NetworkError = 3,
    /// Server answered with a non-200 status
    HttpStatus = 4,
    /// Nothing to show (no parts)
    EmptyResult = 5,
    /// Player could not start or play
    PlaybackFailed = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// tvshows - Browse and watch TV shows from a home media server
#[derive(Parser, Debug)]
#[command(
    name = "tvshows",
    version,
    author = "Gorka & Hermes",
    about = "Browse and watch TV shows from a home media server",
    long_about = "Lists channels, shows, episodes and parts served by a media server \
                  on the local network, and plays them in mpv with the terminal \
                  as a remote control.\n\n\
                  Hosts are tried in order; the last one that answered is remembered.",
    after_help = "EXAMPLES:\n\
                  tvshows home                              List channels and shows\n\
                  tvshows episodes Star Show --all          List every episode\n\
                  tvshows watch Star Show \"Episode 4\"       Watch and keep going\n\
                  tvshows hosts --json                      Show host failover state"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Media server address (repeatable, replaces configured hosts)
    #[arg(long = "host", global = true, value_name = "ADDR")]
    pub hosts: Vec<String>,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List channels and their shows
    #[command(visible_alias = "h")]
    Home,

    /// List episodes of a show, newest first
    #[command(visible_alias = "ep")]
    Episodes(EpisodesCmd),

    /// List the parts of an episode
    #[command(visible_alias = "p")]
    Parts(EpisodeArgs),

    /// Show which episode would play after this one
    #[command(visible_alias = "n")]
    Next(EpisodeArgs),

    /// Play an episode in mpv, continuing to older episodes
    #[command(visible_alias = "w")]
    Watch(WatchCmd),

    /// Inspect or change the current media server host
    Hosts(HostsCmd),
}

/// List episodes of a show
#[derive(Args, Debug)]
pub struct EpisodesCmd {
    /// Channel name
    pub channel: String,

    /// Show name
    pub show: String,

    /// Follow "load more" until the server has no more pages
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Identifies one episode
#[derive(Args, Debug)]
pub struct EpisodeArgs {
    /// Channel name
    pub channel: String,

    /// Show name
    pub show: String,

    /// Episode name
    pub episode: String,
}

impl EpisodeArgs {
    pub fn episode_ref(&self) -> EpisodeRef {
        EpisodeRef::new(&self.channel, &self.show, &self.episode)
    }
}

/// Watch an episode
#[derive(Args, Debug)]
pub struct WatchCmd {
    #[command(flatten)]
    pub episode: EpisodeArgs,

    /// Start at this part (1-based)
    #[arg(long, short = 'P', value_parser = clap::value_parser!(u16).range(1..))]
    pub part: Option<u16>,

    /// Start multi-part episodes at part 1 without asking
    #[arg(long)]
    pub autoplay: bool,
}

impl WatchCmd {
    /// Zero-based part index
    pub fn part_index(&self) -> Option<usize> {
        self.part.map(|p| p as usize - 1)
    }
}

/// Host failover state
#[derive(Args, Debug)]
pub struct HostsCmd {
    #[command(subcommand)]
    pub action: Option<HostsAction>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HostsAction {
    /// Make the host at INDEX current
    Reset {
        /// Zero-based index into the host list
        index: usize,
    },

    /// Rotate to the next host
    Advance,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// `hosts` response
#[derive(Debug, Serialize, Deserialize)]
pub struct HostsStatus {
    pub hosts: Vec<String>,
    pub index: usize,
    pub current: String,
}

/// `next` response
#[derive(Debug, Serialize, Deserialize)]
pub struct NextResponse {
    pub current: EpisodeRef,
    /// `None` when nothing older exists
    pub next: Option<EpisodeRef>,
    /// next, oldest or not_found
    pub outcome: &'static str,
}

/// `watch` response
#[derive(Debug, Serialize, Deserialize)]
pub struct WatchResponse {
    pub watched: Vec<EpisodeRef>,
    /// exited, oldest or not_found
    pub end: &'static str,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print plain lines, or the JSON form of `data` in JSON mode
    pub fn print_lines<T, I>(&self, data: T, lines: I) -> anyhow::Result<()>
    where
        T: Serialize,
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        if self.json {
            return self.print(data);
        }
        for line in lines {
            println!("{}", line);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Configuration management for tvshows
//!
//! Config is stored at ~/.config/tvshows/config.toml. The host list can be
//! replaced by the TVSHOWS_HOSTS environment variable (comma separated) or by
//! repeated `--host` flags, in that order of increasing precedence.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::Host;
use crate::playback::remote::DEFAULT_SEEK_STEP_SECS;

/// Environment variable overriding the configured hosts
pub const HOSTS_ENV: &str = "TVSHOWS_HOSTS";

/// Hosts tried when nothing is configured
pub const DEFAULT_HOSTS: &[&str] = &["192.168.1.2:3000", "10.3.141.1:3000"];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Media server addresses, tried in order
    pub hosts: Vec<String>,
    /// Seconds skipped by left/right in seek mode
    pub seek_step_secs: f64,
    /// mpv executable override
    pub player: Option<String>,
    /// Extra arguments passed to mpv
    pub mpv_args: Vec<String>,
    /// Start multi-part episodes at part 1
    pub autoplay_first_part: bool,
    /// tracing filter directive, e.g. "tvshows=debug"
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
            seek_step_secs: DEFAULT_SEEK_STEP_SECS,
            player: None,
            mpv_args: Vec::new(),
            autoplay_first_part: false,
            log_filter: None,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/tvshows/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tvshows").join("config.toml"))
    }

    /// Load config from `path` (or the default location).
    ///
    /// A missing file yields defaults; a malformed one is an error so the
    /// caller can report it once logging is up.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::path) else {
            return Ok(Self::default());
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents)
                .with_context(|| format!("Malformed config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Could not read {}", path.display())),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Effective host list: `--host` flags, else TVSHOWS_HOSTS, else config
    pub fn host_list(&self, cli_hosts: &[String]) -> Result<Vec<Host>> {
        let env = std::env::var(HOSTS_ENV).ok();
        self.resolve_hosts(cli_hosts, env.as_deref())
    }

    /// [`Config::host_list`] with the environment value passed in
    pub fn resolve_hosts(&self, cli_hosts: &[String], env: Option<&str>) -> Result<Vec<Host>> {
        let hosts: Vec<Host> = if !cli_hosts.is_empty() {
            cli_hosts.iter().map(|h| Host::new(h.trim())).collect()
        } else if let Some(env) = env.filter(|v| !v.trim().is_empty()) {
            split_hosts(env)
        } else {
            self.hosts.iter().map(|h| Host::new(h.trim())).collect()
        };

        let hosts: Vec<Host> = hosts.into_iter().filter(|h| !h.address.is_empty()).collect();
        if hosts.is_empty() {
            bail!("No media server hosts configured");
        }
        Ok(hosts)
    }

    /// mpv executable to launch
    pub fn player_program(&self) -> &str {
        self.player.as_deref().unwrap_or("mpv")
    }
}

fn split_hosts(value: &str) -> Vec<Host> {
    value
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(Host::new)
        .collect()
}

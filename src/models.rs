//! Data structures shared across tvshows
//!
//! Organized by domain:
//! - **Hosts**: candidate media server addresses
//! - **Catalog**: channels, shows, episode listings, episode parts
//! - **Notices**: non-fatal notifications surfaced to the user

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Host Models
// =============================================================================

/// One candidate network address for the media server (`host:port`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
}

impl Host {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Base URL used for every request against this host
    pub fn base_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl From<&str> for Host {
    fn from(address: &str) -> Self {
        Host::new(address)
    }
}

// =============================================================================
// Catalog Models
// =============================================================================

/// A show as listed on the home screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowSummary {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl fmt::Display for ShowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Channel name → shows, as served by `GET /home`
pub type HomeListing = BTreeMap<String, Vec<ShowSummary>>;

/// Episode identifiers for one show, newest first.
///
/// Only ever grows by appending pages; entries are never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeList {
    pub channel: String,
    pub show: String,
    pub episodes: Vec<String>,
    pub has_more: bool,
}

impl EpisodeList {
    pub fn new(channel: impl Into<String>, show: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            show: show.into(),
            episodes: Vec::new(),
            has_more: false,
        }
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Position of an episode in the list, by identity
    pub fn position(&self, episode: &str) -> Option<usize> {
        self.episodes.iter().position(|e| e == episode)
    }

    /// Append a page, skipping identifiers already present.
    ///
    /// `has_more` always reflects the latest page.
    pub fn append_page(&mut self, page: Vec<String>, has_more: bool) -> usize {
        let before = self.episodes.len();
        for episode in page {
            if !self.episodes.contains(&episode) {
                self.episodes.push(episode);
            }
        }
        self.has_more = has_more;
        self.episodes.len() - before
    }

    /// Catalog key used to detect concurrent load-more calls for one show
    pub fn key(&self) -> String {
        format!("{}/{}", self.channel, self.show)
    }
}

impl fmt::Display for EpisodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let more = if self.has_more { ", more available" } else { "" };
        write!(
            f,
            "{} > {} ({} episodes{})",
            self.channel,
            self.show,
            self.episodes.len(),
            more
        )
    }
}

/// One contiguous video segment of a multi-part episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub title: String,
    pub url: String,
}

impl Part {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Server-relative URLs (`/media?...`) are served by the host that
    /// answered the parts request.
    pub fn resolve_against(mut self, host: &Host) -> Self {
        if self.url.starts_with('/') {
            self.url = format!("{}{}", host.base_url(), self.url);
        }
        self
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Identifies one episode of one show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub channel: String,
    pub show: String,
    pub episode: String,
}

impl EpisodeRef {
    pub fn new(
        channel: impl Into<String>,
        show: impl Into<String>,
        episode: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            show: show.into(),
            episode: episode.into(),
        }
    }

    /// Same show, different episode
    pub fn sibling(&self, episode: impl Into<String>) -> Self {
        Self {
            channel: self.channel.clone(),
            show: self.show.clone(),
            episode: episode.into(),
        }
    }
}

impl fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {} > {}", self.channel, self.show, self.episode)
    }
}

// =============================================================================
// Notices
// =============================================================================

/// Lightweight, non-fatal notification (the toast of a TV front-end)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// A host failed at the network level and the next one is being tried
    HostFailed { host: String, attempt: usize },
    /// "Previous part" pressed on the first part
    FirstPart,
    /// "Next part" pressed on the last part
    LastPart,
    /// A device key with no binding
    UnmappedKey { code: i32 },
    /// Continuation found nothing older to play
    NoNextEpisode,
    /// A new part started playing
    NowPlaying { title: String },
    /// Several parts loaded and none picked yet
    ChoosePart { titles: Vec<String> },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::HostFailed { host, attempt } => {
                write!(f, "Network error: {}, retries: {}", host, attempt)
            }
            Notice::FirstPart => write!(f, "Already at the first part"),
            Notice::LastPart => write!(f, "Already at the last part"),
            Notice::UnmappedKey { code } => write!(f, "Unmapped key: {}", code),
            Notice::NoNextEpisode => write!(f, "No older episode to play"),
            Notice::NowPlaying { title } => write!(f, "Now playing: {}", title),
            Notice::ChoosePart { titles } => {
                write!(f, "Choose a part:")?;
                for (i, title) in titles.iter().enumerate() {
                    write!(f, " [{}] {}", i + 1, title)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_base_url() {
        assert_eq!(Host::new("192.168.1.2:3000").base_url(), "http://192.168.1.2:3000");
        assert_eq!(Host::new("http://localhost:3000/").base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_part_resolves_relative_url() {
        let host = Host::new("10.3.141.1:3000");
        let part = Part::new("Part 1", "/media?id=42").resolve_against(&host);
        assert_eq!(part.url, "http://10.3.141.1:3000/media?id=42");

        let absolute = Part::new("Part 2", "https://cdn.example/v.mp4").resolve_against(&host);
        assert_eq!(absolute.url, "https://cdn.example/v.mp4");
    }

    #[test]
    fn test_append_page_skips_known_entries() {
        let mut list = EpisodeList::new("Star", "Show");
        list.append_page(vec!["E5".into(), "E4".into()], true);
        let added = list.append_page(vec!["E5".into(), "E4".into(), "E3".into()], false);
        assert_eq!(added, 1);
        assert_eq!(list.episodes, vec!["E5", "E4", "E3"]);
        assert!(!list.has_more);
    }

    #[test]
    fn test_episode_ref_sibling() {
        let current = EpisodeRef::new("Star", "Show", "E4");
        let next = current.sibling("E3");
        assert_eq!(next.channel, "Star");
        assert_eq!(next.episode, "E3");
        assert_eq!(next.to_string(), "Star > Show > E3");
    }
}

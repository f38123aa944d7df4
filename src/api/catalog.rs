//! Episode catalog
//!
//! Home listing, paginated episode lists and episode parts, all served by
//! the media server's JSON API through a [`FetchClient`].

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

use super::fetch::{FetchClient, FetchError};
use crate::models::{EpisodeList, EpisodeRef, HomeListing, Part};

/// Upper bound on pages walked by [`EpisodeCatalog::load_all`]
pub const MAX_PAGES: usize = 50;

/// Catalog failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The server answered but had no parts for the episode
    #[error("No parts found for {0} (download or processing failed)")]
    EmptyResult(EpisodeRef),
}

impl CatalogError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CatalogError::Fetch(e) if e.is_cancelled())
    }
}

/// Result of a paginated load
#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad {
    Loaded(EpisodeList),
    /// A load-more for the same show was already pending; nothing was fetched
    AlreadyPending,
}

impl PageLoad {
    pub fn into_list(self) -> Option<EpisodeList> {
        match self {
            PageLoad::Loaded(list) => Some(list),
            PageLoad::AlreadyPending => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    episodes: Vec<String>,
    #[serde(default)]
    has_more: bool,
}

/// Episode catalog bound to one fetch surface
pub struct EpisodeCatalog {
    fetch: FetchClient,
    pending_more: Mutex<HashSet<String>>,
}

impl EpisodeCatalog {
    pub fn new(fetch: FetchClient) -> Self {
        Self {
            fetch,
            pending_more: Mutex::new(HashSet::new()),
        }
    }

    pub fn fetch(&self) -> &FetchClient {
        &self.fetch
    }

    /// `GET /home`
    pub async fn home(&self) -> Result<HomeListing, CatalogError> {
        Ok(self.fetch.get_as("/home", &[]).await?)
    }

    /// Load the first page (`cursor == None`) or the next page after `cursor`.
    pub async fn load(
        &self,
        channel: &str,
        show: &str,
        cursor: Option<&EpisodeList>,
    ) -> Result<PageLoad, CatalogError> {
        match cursor {
            None => Ok(PageLoad::Loaded(self.first_page(channel, show).await?)),
            Some(list) => self.load_more(list).await,
        }
    }

    /// First page of episodes, newest first
    pub async fn first_page(&self, channel: &str, show: &str) -> Result<EpisodeList, CatalogError> {
        let page = self.fetch_page(channel, show, false).await?;
        let mut list = EpisodeList::new(channel, show);
        list.append_page(page.episodes, page.has_more);
        info!(%list, "Loaded episodes");
        Ok(list)
    }

    /// Append the next page to `list`.
    ///
    /// Returns `AlreadyPending` without touching the network when another
    /// load-more for the same show has not finished yet.
    pub async fn load_more(&self, list: &EpisodeList) -> Result<PageLoad, CatalogError> {
        let Some(_guard) = PendingGuard::acquire(&self.pending_more, list.key()) else {
            debug!(show = %list.show, "Load more already pending, ignoring");
            return Ok(PageLoad::AlreadyPending);
        };

        let page = self.fetch_page(&list.channel, &list.show, true).await?;
        let mut next = list.clone();
        let added = next.append_page(page.episodes, page.has_more);
        info!(list = %next, added, "Loaded more episodes");
        Ok(PageLoad::Loaded(next))
    }

    /// Walk pages until the server reports no more (bounded by [`MAX_PAGES`])
    pub async fn load_all(&self, channel: &str, show: &str) -> Result<EpisodeList, CatalogError> {
        let mut list = self.first_page(channel, show).await?;
        let mut pages = 1;
        while list.has_more && pages < MAX_PAGES {
            match self.load_more(&list).await? {
                PageLoad::Loaded(next) => list = next,
                PageLoad::AlreadyPending => break,
            }
            pages += 1;
        }
        Ok(list)
    }

    /// `GET /episode/{channel}/{show}/{episode}`; an empty answer is an error
    pub async fn parts(&self, episode: &EpisodeRef) -> Result<Vec<Part>, CatalogError> {
        let path = format!(
            "/episode/{}/{}/{}",
            urlencoding::encode(&episode.channel),
            urlencoding::encode(&episode.show),
            urlencoding::encode(&episode.episode)
        );
        let pairs: Vec<(String, String)> = self.fetch.get_as(&path, &[]).await?;
        if pairs.is_empty() {
            return Err(CatalogError::EmptyResult(episode.clone()));
        }

        let host = self.fetch.current_host();
        let parts: Vec<Part> = pairs
            .into_iter()
            .map(|(title, url)| Part::new(title, url).resolve_against(&host))
            .collect();
        info!(%episode, parts = parts.len(), "Loaded episode parts");
        Ok(parts)
    }

    async fn fetch_page(
        &self,
        channel: &str,
        show: &str,
        load_more: bool,
    ) -> Result<EpisodesResponse, CatalogError> {
        let path = format!(
            "/episodes/{}/{}",
            urlencoding::encode(channel),
            urlencoding::encode(show)
        );
        let load_more = if load_more { "true" } else { "false" };
        Ok(self.fetch.get_as(&path, &[("load_more", load_more)]).await?)
    }
}

/// Marks a show as having a load-more in flight; cleared on drop, so a
/// cancelled or failed load never leaves the show stuck.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> PendingGuard<'a> {
    fn acquire(pending: &'a Mutex<HashSet<String>>, key: String) -> Option<Self> {
        if !lock(pending).insert(key.clone()) {
            return None;
        }
        Some(Self { pending, key })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! Automatic continuation to the next (older) episode
//!
//! Episode lists are newest first, so the episode to auto-play after the
//! current one sits right after it in the list.

use tracing::{debug, info};

use crate::api::catalog::{CatalogError, EpisodeCatalog, PageLoad, MAX_PAGES};
use crate::models::{EpisodeList, EpisodeRef};

/// Outcome of a continuation lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// Play this episode next
    Next(EpisodeRef),
    /// The current episode is the oldest one
    Oldest,
    /// The current episode vanished from the refreshed list
    NotFound,
}

impl Continuation {
    pub fn next(&self) -> Option<&EpisodeRef> {
        match self {
            Continuation::Next(episode) => Some(episode),
            _ => None,
        }
    }
}

/// Where `current` sits relative to a (possibly partial) list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Neighbour<'a> {
    Older(&'a str),
    /// Found at the end of what is loaded
    AtEnd,
    Missing,
}

/// Find the chronologically older neighbour of `current`
pub fn older_neighbour<'a>(episodes: &'a [String], current: &str) -> Neighbour<'a> {
    match episodes.iter().position(|e| e == current) {
        Some(pos) => match episodes.get(pos + 1) {
            Some(next) => Neighbour::Older(next),
            None => Neighbour::AtEnd,
        },
        None => Neighbour::Missing,
    }
}

/// Resolves the episode that follows the current one
pub struct ContinuationResolver<'a> {
    catalog: &'a EpisodeCatalog,
}

impl<'a> ContinuationResolver<'a> {
    pub fn new(catalog: &'a EpisodeCatalog) -> Self {
        Self { catalog }
    }

    /// Refresh the show's episode list and pick the next episode.
    ///
    /// Pages are loaded only while the answer depends on them.
    pub async fn resolve(&self, current: &EpisodeRef) -> Result<Continuation, CatalogError> {
        info!(episode = %current, "Done playing all parts, looking for the next episode");
        let mut list = self
            .catalog
            .first_page(&current.channel, &current.show)
            .await?;

        for _ in 0..MAX_PAGES {
            match older_neighbour(&list.episodes, &current.episode) {
                Neighbour::Older(next) => {
                    info!(next, "Playing next episode");
                    return Ok(Continuation::Next(current.sibling(next)));
                }
                Neighbour::AtEnd if !list.has_more => {
                    info!("This is the oldest episode, nothing to continue with");
                    return Ok(Continuation::Oldest);
                }
                Neighbour::Missing if !list.has_more => {
                    debug!(episode = %current, "Current episode not in refreshed list");
                    return Ok(Continuation::NotFound);
                }
                Neighbour::AtEnd | Neighbour::Missing => {}
            }

            match self.load_more(&list).await? {
                Some(next) => list = next,
                None => break,
            }
        }
        Ok(Continuation::NotFound)
    }

    // `None` when the next page brought nothing new or a load was pending.
    async fn load_more(&self, list: &EpisodeList) -> Result<Option<EpisodeList>, CatalogError> {
        match self.catalog.load_more(list).await? {
            PageLoad::Loaded(next) if next.len() > list.len() || !next.has_more => Ok(Some(next)),
            PageLoad::Loaded(_) | PageLoad::AlreadyPending => Ok(None),
        }
    }
}

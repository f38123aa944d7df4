//! Watch driver
//!
//! Glues one [`PlaybackSession`] at a time to a [`Player`] and a stream of
//! remote keys. Keys and player events are raced in a single loop, turned
//! into session commands and applied in arrival order; the resulting
//! effects are carried out here. When an episode runs out of parts the next
//! (older) episode is resolved and a fresh session replaces the old one.

use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::continuation::{Continuation, ContinuationResolver};
use super::remote::{DeviceKey, RemoteInputRouter, UnmappedKey};
use super::session::{Command, Effect, InputMode, Phase, PlaybackSession};
use crate::api::catalog::{CatalogError, EpisodeCatalog};
use crate::models::{EpisodeRef, Notice};
use crate::player::{PlaybackError, Player, PlayerEvent};

/// Why watching stopped
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// How a watch run ended
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEnd {
    /// User pressed back or closed the player
    Exited,
    /// Continuation found nothing left to play
    Exhausted(Continuation),
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSummary {
    /// Episodes that were opened, in order
    pub episodes: Vec<EpisodeRef>,
    pub end: WatchEnd,
}

enum Input {
    Key(DeviceKey),
    Player(PlayerEvent),
    KeysClosed,
    PlayerGone,
}

enum Flow {
    Stay,
    Close,
    NextEpisode,
}

enum Advance {
    Opened(PlaybackSession),
    Left,
    Exhausted(Continuation),
}

/// Drives playback from keys and player events
pub struct Watcher<P, S> {
    catalog: Arc<EpisodeCatalog>,
    router: RemoteInputRouter,
    player: P,
    events: mpsc::UnboundedReceiver<PlayerEvent>,
    keys: S,
    notices: broadcast::Sender<Notice>,
    autoplay_first_part: bool,
}

impl<P, S> Watcher<P, S>
where
    P: Player,
    S: Stream<Item = DeviceKey> + Unpin,
{
    pub fn new(
        catalog: Arc<EpisodeCatalog>,
        player: P,
        events: mpsc::UnboundedReceiver<PlayerEvent>,
        keys: S,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        Self {
            catalog,
            router: RemoteInputRouter::default(),
            player,
            events,
            keys,
            notices,
            autoplay_first_part: false,
        }
    }

    pub fn with_router(mut self, router: RemoteInputRouter) -> Self {
        self.router = router;
        self
    }

    /// Start multi-part episodes at part 1 instead of waiting for a choice
    pub fn autoplay_first_part(mut self, autoplay: bool) -> Self {
        self.autoplay_first_part = autoplay;
        self
    }

    /// Give the player back, e.g. to shut it down
    pub fn into_player(self) -> P {
        self.player
    }

    /// Watch `episode`, continuing to older episodes until the user exits
    /// or nothing is left. `first_part` is a zero-based part index.
    ///
    /// Back is honoured while parts or the next episode are still loading;
    /// the pending request is aborted. Other keys are ignored until a
    /// part list is ready.
    pub async fn run(
        &mut self,
        episode: EpisodeRef,
        first_part: Option<usize>,
    ) -> Result<WatchSummary, WatchError> {
        let mut episodes = vec![episode.clone()];
        let autoplay = self.autoplay_first_part && first_part.is_none();
        let Some(mut session) = self.open(episode, first_part, autoplay).await? else {
            return Ok(WatchSummary {
                episodes,
                end: WatchEnd::Exited,
            });
        };

        loop {
            let input = tokio::select! {
                key = self.keys.next() => key.map(Input::Key).unwrap_or(Input::KeysClosed),
                event = self.events.recv() => event.map(Input::Player).unwrap_or(Input::PlayerGone),
            };

            let command = match input {
                Input::Key(key) => match self.router.route(key, session.input_mode()) {
                    Ok(command) => command,
                    Err(UnmappedKey(key)) => {
                        self.notify(Notice::UnmappedKey { code: key.code() });
                        continue;
                    }
                },
                Input::Player(event) => match event {
                    PlayerEvent::Progress { position, duration } => Command::Progress {
                        current: position,
                        total: duration,
                    },
                    PlayerEvent::Ended => Command::PartEnded,
                    PlayerEvent::Failed(message) => Command::PlaybackFailed(message),
                    PlayerEvent::Closed => Command::Exit,
                },
                Input::KeysClosed => {
                    debug!("Key stream ended");
                    Command::Exit
                }
                Input::PlayerGone => {
                    warn!("Player event channel closed");
                    Command::Exit
                }
            };

            let effects = session.apply(command);
            match self.execute(effects)? {
                Flow::Stay => {}
                Flow::Close => {
                    return Ok(WatchSummary {
                        episodes,
                        end: WatchEnd::Exited,
                    })
                }
                Flow::NextEpisode => {
                    let current = session.episode().clone();
                    drop(session);
                    match self.advance(&current).await? {
                        Advance::Opened(next) => {
                            episodes.push(next.episode().clone());
                            session = next;
                        }
                        Advance::Left => {
                            return Ok(WatchSummary {
                                episodes,
                                end: WatchEnd::Exited,
                            })
                        }
                        Advance::Exhausted(other) => {
                            return Ok(WatchSummary {
                                episodes,
                                end: WatchEnd::Exhausted(other),
                            })
                        }
                    }
                }
            }
        }
    }

    /// Resolve and start the episode after `current`.
    ///
    /// A failed lookup stops the player and ends the run with the catalog
    /// error; there is nothing left to watch and no retry.
    async fn advance(&mut self, current: &EpisodeRef) -> Result<Advance, WatchError> {
        let catalog = Arc::clone(&self.catalog);
        let resolver = ContinuationResolver::new(&catalog);
        let continuation = match self.until_back(resolver.resolve(current)).await {
            Some(Ok(continuation)) => continuation,
            Some(Err(e)) => {
                warn!(episode = %current, "Continuation failed: {}", e);
                let _ = self.player.stop();
                return Err(e.into());
            }
            None => {
                self.player.stop()?;
                return Ok(Advance::Left);
            }
        };

        match continuation {
            // Continuing never waits for a part choice
            Continuation::Next(next) => match self.open(next, None, true).await? {
                Some(session) => Ok(Advance::Opened(session)),
                None => {
                    self.player.stop()?;
                    Ok(Advance::Left)
                }
            },
            other => {
                self.notify(Notice::NoNextEpisode);
                self.player.stop()?;
                Ok(Advance::Exhausted(other))
            }
        }
    }

    /// Load `episode` and start it. `None` means the user left while the
    /// parts were loading.
    async fn open(
        &mut self,
        episode: EpisodeRef,
        first_part: Option<usize>,
        autoplay: bool,
    ) -> Result<Option<PlaybackSession>, WatchError> {
        info!(%episode, "Opening episode");
        let catalog = Arc::clone(&self.catalog);
        let Some(parts) = self.until_back(catalog.parts(&episode)).await else {
            return Ok(None);
        };
        let parts = parts?;

        let mut session = PlaybackSession::new(episode);
        let mut effects = session.load_parts(parts, autoplay);
        if let Some(index) = first_part {
            if *session.phase() == Phase::ChoosingPart {
                let jumped = session.apply(Command::JumpToPart(index));
                if jumped.is_empty() {
                    warn!(part = index + 1, "No such part, choose one");
                } else {
                    effects = jumped;
                }
            }
        }

        // Loading only ever plays or notifies
        self.execute(effects)?;
        Ok(Some(session))
    }

    /// Drive `work` to completion unless Back arrives first, in which case
    /// the catalog's pending request is aborted and `None` is returned.
    async fn until_back<F: Future>(&mut self, work: F) -> Option<F::Output> {
        tokio::pin!(work);
        loop {
            tokio::select! {
                output = &mut work => return Some(output),
                key = self.keys.next() => {
                    let Some(key) = key else {
                        debug!("Key stream ended while loading");
                        break;
                    };
                    match self.router.route(key, InputMode::default()) {
                        Ok(Command::Exit) => break,
                        Ok(command) => debug!(?command, "Ignored while loading"),
                        Err(UnmappedKey(key)) => {
                            self.notify(Notice::UnmappedKey { code: key.code() })
                        }
                    }
                }
            }
        }
        info!("Left while loading");
        self.catalog.fetch().abort();
        None
    }

    fn execute(&mut self, effects: Vec<Effect>) -> Result<Flow, PlaybackError> {
        let mut flow = Flow::Stay;
        for effect in effects {
            debug!(?effect, "Executing effect");
            match effect {
                Effect::Play { url, speed, .. } => self.player.load(&url, speed)?,
                Effect::SetPaused(paused) => self.player.set_paused(paused)?,
                Effect::SetSpeed(speed) => self.player.set_speed(speed)?,
                Effect::Seek(position) => self.player.seek(position)?,
                Effect::Notice(notice) => self.notify(notice),
                Effect::Continue => flow = Flow::NextEpisode,
                Effect::Failed(message) => {
                    let _ = self.player.stop();
                    return Err(PlaybackError::Stream(message));
                }
                Effect::Close => {
                    self.player.stop()?;
                    flow = Flow::Close;
                }
            }
        }
        Ok(flow)
    }

    fn notify(&self, notice: Notice) {
        info!(%notice, "Notice");
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }
}

//! Playback session state machine
//!
//! One session per episode. It owns the part list, the current part, the
//! pause/speed state and the last reported position. Every mutation arrives
//! as a [`Command`]; the session answers with [`Effect`]s for the driver to
//! carry out (player calls, notices, continuation). It never talks to the
//! player or the network itself.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::models::{EpisodeRef, Notice, Part};

// =============================================================================
// Speed & Motion
// =============================================================================

/// Playback speed, restricted to the steps a remote can reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Speed {
    Half,
    #[default]
    Normal,
    Double,
    Triple,
}

impl Speed {
    pub fn as_f64(self) -> f64 {
        match self {
            Speed::Half => 0.5,
            Speed::Normal => 1.0,
            Speed::Double => 2.0,
            Speed::Triple => 3.0,
        }
    }

    /// 1 → 2 → 3, clamped at 3; anything below normal snaps back to 1
    pub fn up(self) -> Speed {
        match self {
            Speed::Half => Speed::Normal,
            Speed::Normal => Speed::Double,
            Speed::Double | Speed::Triple => Speed::Triple,
        }
    }

    /// 1 → 0.5, clamped at 0.5; anything above normal snaps back to 1
    pub fn down(self) -> Speed {
        match self {
            Speed::Normal | Speed::Half => Speed::Half,
            Speed::Double | Speed::Triple => Speed::Normal,
        }
    }

    pub fn is_normal(self) -> bool {
        self == Speed::Normal
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f64())
    }
}

/// Pause and speed as one value: a paused session has no speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Motion {
    Playing(Speed),
    Paused,
}

impl Motion {
    pub fn is_paused(self) -> bool {
        matches!(self, Motion::Paused)
    }

    pub fn speed(self) -> Speed {
        match self {
            Motion::Playing(speed) => speed,
            Motion::Paused => Speed::Normal,
        }
    }
}

/// What left/right do on the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Seek,
    Speed,
}

impl InputMode {
    pub fn toggled(self) -> InputMode {
        match self {
            InputMode::Seek => InputMode::Speed,
            InputMode::Speed => InputMode::Seek,
        }
    }
}

// =============================================================================
// Commands & Effects
// =============================================================================

/// A request to mutate the session
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePause,
    SpeedDown,
    SpeedUp,
    /// Relative seek in seconds
    SeekBy(f64),
    /// Absolute seek in seconds
    SeekTo(f64),
    /// Passive refresh from the player
    Progress { current: f64, total: f64 },
    PartEnded,
    JumpToPart(usize),
    PreviousPart,
    NextPart,
    ToggleInputMode,
    /// Player reported a decode/stream failure
    PlaybackFailed(String),
    /// User navigated away
    Exit,
}

/// Something the driver must do as a consequence of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Play {
        index: usize,
        title: String,
        url: String,
        speed: f64,
    },
    SetPaused(bool),
    SetSpeed(f64),
    Seek(f64),
    Notice(Notice),
    /// All parts played: resolve and start the next episode
    Continue,
    /// Playback failed; surfaced to the user, no retry
    Failed(String),
    /// Tear the session down
    Close,
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle phase of a session
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Waiting for the part list
    Loading,
    /// Parts loaded, user picks one
    ChoosingPart,
    /// A part is loaded in the player
    Active { index: usize, motion: Motion },
    /// Last part finished
    Ended,
    Failed(String),
}

/// Serializable snapshot of what the UI shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub part_index: Option<usize>,
    pub part_count: usize,
    pub paused: bool,
    pub speed: f64,
    pub current_time: f64,
    pub total_duration: f64,
    pub input_mode: InputMode,
    pub ended: bool,
}

/// State machine over the ordered parts of one episode
#[derive(Debug)]
pub struct PlaybackSession {
    episode: EpisodeRef,
    parts: Vec<Part>,
    phase: Phase,
    current_time: f64,
    total_duration: f64,
    input_mode: InputMode,
}

impl PlaybackSession {
    /// New session waiting for its parts
    pub fn new(episode: EpisodeRef) -> Self {
        Self {
            episode,
            parts: Vec::new(),
            phase: Phase::Loading,
            current_time: 0.0,
            total_duration: 0.0,
            input_mode: InputMode::default(),
        }
    }

    /// Hand the loaded parts to the session.
    ///
    /// A single part (or `autoplay`) starts playback at index 0 right away;
    /// otherwise the session waits for a [`Command::JumpToPart`].
    pub fn load_parts(&mut self, parts: Vec<Part>, autoplay: bool) -> Vec<Effect> {
        if self.phase != Phase::Loading {
            debug!(episode = %self.episode, "Parts already loaded, ignoring");
            return Vec::new();
        }
        if parts.is_empty() {
            let message = format!("No parts for {}", self.episode);
            self.phase = Phase::Failed(message.clone());
            return vec![Effect::Failed(message)];
        }

        self.parts = parts;
        if self.parts.len() == 1 || autoplay {
            self.start_part(0, Speed::Normal)
        } else {
            self.phase = Phase::ChoosingPart;
            let titles = self.parts.iter().map(|p| p.title.clone()).collect();
            vec![Effect::Notice(Notice::ChoosePart { titles })]
        }
    }

    pub fn episode(&self) -> &EpisodeRef {
        &self.episode
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn current_part(&self) -> Option<&Part> {
        match self.phase {
            Phase::Active { index, .. } => self.parts.get(index),
            _ => None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        let (part_index, motion) = match self.phase {
            Phase::Active { index, motion } => (Some(index), Some(motion)),
            _ => (None, None),
        };
        PlaybackState {
            part_index,
            part_count: self.parts.len(),
            paused: motion.map(Motion::is_paused).unwrap_or(false),
            speed: motion.map(|m| m.speed()).unwrap_or_default().as_f64(),
            current_time: self.current_time,
            total_duration: self.total_duration,
            input_mode: self.input_mode,
            ended: self.phase == Phase::Ended,
        }
    }

    /// Apply one command and return the effects it produced
    pub fn apply(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Exit => return vec![Effect::Close],
            Command::ToggleInputMode => {
                self.input_mode = self.input_mode.toggled();
                debug!(mode = ?self.input_mode, "Input mode changed");
                return Vec::new();
            }
            _ => {}
        }

        match self.phase.clone() {
            Phase::ChoosingPart => match command {
                Command::JumpToPart(index) => self.jump_to(index),
                Command::PlaybackFailed(message) => self.fail(message),
                _ => Vec::new(),
            },
            Phase::Active { index, motion } => self.apply_active(command, index, motion),
            Phase::Loading | Phase::Ended | Phase::Failed(_) => {
                debug!(?command, phase = ?self.phase, "Ignoring command, no part loaded");
                Vec::new()
            }
        }
    }

    fn apply_active(&mut self, command: Command, index: usize, motion: Motion) -> Vec<Effect> {
        let last = self.parts.len() - 1;
        match command {
            Command::TogglePause => match motion {
                Motion::Playing(speed) if !speed.is_normal() => {
                    self.set_motion(index, Motion::Playing(Speed::Normal));
                    vec![Effect::SetSpeed(Speed::Normal.as_f64())]
                }
                Motion::Playing(_) => {
                    self.set_motion(index, Motion::Paused);
                    vec![Effect::SetPaused(true)]
                }
                Motion::Paused => {
                    self.set_motion(index, Motion::Playing(Speed::Normal));
                    vec![Effect::SetPaused(false)]
                }
            },
            Command::SpeedUp | Command::SpeedDown => match motion {
                Motion::Paused => {
                    self.set_motion(index, Motion::Playing(Speed::Normal));
                    vec![Effect::SetPaused(false)]
                }
                Motion::Playing(speed) => {
                    let next = if command == Command::SpeedUp {
                        speed.up()
                    } else {
                        speed.down()
                    };
                    if next == speed {
                        return Vec::new();
                    }
                    self.set_motion(index, Motion::Playing(next));
                    vec![Effect::SetSpeed(next.as_f64())]
                }
            },
            Command::SeekBy(delta) => self.seek_to(self.current_time + delta),
            Command::SeekTo(position) => self.seek_to(position),
            Command::Progress { current, total } => {
                self.current_time = current.max(0.0);
                self.total_duration = total.max(0.0);
                Vec::new()
            }
            Command::PartEnded if index < last => self.start_part(index + 1, motion.speed()),
            Command::PartEnded => {
                info!(episode = %self.episode, "All parts played");
                self.phase = Phase::Ended;
                vec![Effect::Continue]
            }
            Command::JumpToPart(target) => self.jump_to(target),
            Command::PreviousPart if index == 0 => vec![Effect::Notice(Notice::FirstPart)],
            Command::PreviousPart => self.start_part(index - 1, motion.speed()),
            Command::NextPart if index == last => vec![Effect::Notice(Notice::LastPart)],
            Command::NextPart => self.start_part(index + 1, motion.speed()),
            Command::PlaybackFailed(message) => self.fail(message),
            Command::ToggleInputMode | Command::Exit => Vec::new(),
        }
    }

    fn jump_to(&mut self, index: usize) -> Vec<Effect> {
        if index >= self.parts.len() {
            debug!(index, parts = self.parts.len(), "Part index out of range");
            return Vec::new();
        }
        let speed = match self.phase {
            Phase::Active { motion, .. } => motion.speed(),
            _ => Speed::Normal,
        };
        self.start_part(index, speed)
    }

    // Seeking needs a known duration, i.e. a first progress report.
    fn seek_to(&mut self, position: f64) -> Vec<Effect> {
        if self.total_duration <= 0.0 {
            debug!("Seek ignored before first progress report");
            return Vec::new();
        }
        if !position.is_finite() {
            debug!(position, "Seek target is not a number");
            return Vec::new();
        }
        self.current_time = position.clamp(0.0, self.total_duration);
        vec![Effect::Seek(self.current_time)]
    }

    fn start_part(&mut self, index: usize, speed: Speed) -> Vec<Effect> {
        self.phase = Phase::Active {
            index,
            motion: Motion::Playing(speed),
        };
        self.current_time = 0.0;
        self.total_duration = 0.0;

        let part = &self.parts[index];
        info!(episode = %self.episode, index, title = %part.title, "Playing part");
        vec![
            Effect::Play {
                index,
                title: part.title.clone(),
                url: part.url.clone(),
                speed: speed.as_f64(),
            },
            Effect::Notice(Notice::NowPlaying {
                title: part.title.clone(),
            }),
        ]
    }

    fn set_motion(&mut self, index: usize, motion: Motion) {
        self.phase = Phase::Active { index, motion };
    }

    fn fail(&mut self, message: String) -> Vec<Effect> {
        self.phase = Phase::Failed(message.clone());
        vec![Effect::Failed(message)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(n: usize) -> Vec<Part> {
        (0..n)
            .map(|i| Part::new(format!("Part {}", i + 1), format!("http://h/p{}.mp4", i + 1)))
            .collect()
    }

    fn playing(n: usize) -> PlaybackSession {
        let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E4"));
        session.load_parts(parts(n), true);
        session
    }

    #[test]
    fn test_speed_steps() {
        assert_eq!(Speed::Normal.up(), Speed::Double);
        assert_eq!(Speed::Triple.up(), Speed::Triple);
        assert_eq!(Speed::Half.up(), Speed::Normal);
        assert_eq!(Speed::Normal.down(), Speed::Half);
        assert_eq!(Speed::Half.down(), Speed::Half);
        assert_eq!(Speed::Triple.down(), Speed::Normal);
    }

    #[test]
    fn test_loading_ignores_commands() {
        let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E1"));
        assert!(session.apply(Command::TogglePause).is_empty());
        assert!(session.apply(Command::PartEnded).is_empty());
        assert_eq!(session.phase(), &Phase::Loading);
    }

    #[test]
    fn test_empty_parts_fail_session() {
        let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E1"));
        let effects = session.load_parts(Vec::new(), false);
        assert!(matches!(effects.as_slice(), [Effect::Failed(_)]));
        assert!(matches!(session.phase(), Phase::Failed(_)));
    }

    #[test]
    fn test_multi_part_waits_for_choice() {
        let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E1"));
        let effects = session.load_parts(parts(3), false);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notice(Notice::ChoosePart { titles })] if titles.len() == 3
        ));
        assert_eq!(session.phase(), &Phase::ChoosingPart);

        let effects = session.apply(Command::JumpToPart(2));
        assert!(matches!(effects[0], Effect::Play { index: 2, .. }));
    }

    #[test]
    fn test_pause_resume_roundtrip() {
        let mut session = playing(2);
        assert_eq!(session.apply(Command::TogglePause), vec![Effect::SetPaused(true)]);
        assert!(session.state().paused);
        assert_eq!(session.apply(Command::TogglePause), vec![Effect::SetPaused(false)]);
        assert!(!session.state().paused);
    }

    #[test]
    fn test_speed_change_while_paused_resumes() {
        let mut session = playing(1);
        session.apply(Command::TogglePause);
        assert_eq!(session.apply(Command::SpeedUp), vec![Effect::SetPaused(false)]);
        let state = session.state();
        assert!(!state.paused);
        assert_eq!(state.speed, 1.0);
    }

    #[test]
    fn test_seek_while_paused_stays_paused() {
        let mut session = playing(1);
        session.apply(Command::Progress {
            current: 30.0,
            total: 100.0,
        });
        session.apply(Command::TogglePause);
        assert_eq!(session.apply(Command::SeekBy(15.0)), vec![Effect::Seek(45.0)]);
        assert!(session.state().paused);
    }

    #[test]
    fn test_non_finite_seek_is_ignored() {
        let mut session = playing(1);
        session.apply(Command::Progress {
            current: 30.0,
            total: 100.0,
        });
        assert!(session.apply(Command::SeekBy(f64::NAN)).is_empty());
        assert!(session.apply(Command::SeekTo(f64::INFINITY)).is_empty());
        assert_eq!(session.state().current_time, 30.0);
        assert_eq!(session.apply(Command::SeekTo(50.0)), vec![Effect::Seek(50.0)]);
    }

    #[test]
    fn test_toggle_input_mode() {
        let mut session = playing(1);
        assert_eq!(session.input_mode(), InputMode::Seek);
        session.apply(Command::ToggleInputMode);
        assert_eq!(session.input_mode(), InputMode::Speed);
    }

    #[test]
    fn test_playback_failure_is_terminal() {
        let mut session = playing(2);
        let effects = session.apply(Command::PlaybackFailed("decoder error".into()));
        assert_eq!(effects, vec![Effect::Failed("decoder error".into())]);
        assert!(session.apply(Command::NextPart).is_empty());
    }

    #[test]
    fn test_exit_closes_in_any_phase() {
        let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E1"));
        assert_eq!(session.apply(Command::Exit), vec![Effect::Close]);
    }
}

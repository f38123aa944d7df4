//! Remote control input routing
//!
//! Pure translation from device key codes (Android TV numbering) to
//! session commands. The router keeps no state: the input mode comes from
//! the session on every call.

use std::fmt;
use thiserror::Error;
use tracing::warn;

use super::session::{Command, InputMode};

/// Default seek step for left/right in seek mode
pub const DEFAULT_SEEK_STEP_SECS: f64 = 15.0;

/// A device key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceKey(pub i32);

impl DeviceKey {
    pub const UNKNOWN: DeviceKey = DeviceKey(0);
    pub const BACK: DeviceKey = DeviceKey(4);
    pub const DIGIT_0: DeviceKey = DeviceKey(7);
    pub const DIGIT_1: DeviceKey = DeviceKey(8);
    pub const DIGIT_9: DeviceKey = DeviceKey(16);
    pub const DPAD_UP: DeviceKey = DeviceKey(19);
    pub const DPAD_DOWN: DeviceKey = DeviceKey(20);
    pub const DPAD_LEFT: DeviceKey = DeviceKey(21);
    pub const DPAD_RIGHT: DeviceKey = DeviceKey(22);
    pub const DPAD_CENTER: DeviceKey = DeviceKey(23);
    pub const LETTER_A: DeviceKey = DeviceKey(29);
    pub const TAB: DeviceKey = DeviceKey(61);
    pub const SPACE: DeviceKey = DeviceKey(62);
    pub const ENTER: DeviceKey = DeviceKey(66);
    pub const MEDIA_PLAY_PAUSE: DeviceKey = DeviceKey(85);
    pub const MEDIA_NEXT: DeviceKey = DeviceKey(87);
    pub const MEDIA_PREVIOUS: DeviceKey = DeviceKey(88);
    pub const MEDIA_REWIND: DeviceKey = DeviceKey(89);
    pub const MEDIA_FAST_FORWARD: DeviceKey = DeviceKey(90);
    pub const ESCAPE: DeviceKey = DeviceKey(111);
    pub const FORWARD_DEL: DeviceKey = DeviceKey(112);
    pub const MOVE_HOME: DeviceKey = DeviceKey(122);
    pub const MOVE_END: DeviceKey = DeviceKey(123);
    pub const INSERT: DeviceKey = DeviceKey(124);
    pub const F1: DeviceKey = DeviceKey(131);

    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keycode {}", self.0)
    }
}

/// Key with no binding; reported, otherwise ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No binding for {0}")]
pub struct UnmappedKey(pub DeviceKey);

/// Maps device keys to playback commands
#[derive(Debug, Clone)]
pub struct RemoteInputRouter {
    seek_step: f64,
}

impl RemoteInputRouter {
    pub fn new(seek_step_secs: f64) -> Self {
        Self {
            seek_step: seek_step_secs.abs(),
        }
    }

    pub fn seek_step(&self) -> f64 {
        self.seek_step
    }

    /// Translate one key press
    pub fn route(&self, key: DeviceKey, mode: InputMode) -> Result<Command, UnmappedKey> {
        let command = match key {
            DeviceKey::DPAD_LEFT => match mode {
                InputMode::Seek => Command::SeekBy(-self.seek_step),
                InputMode::Speed => Command::SpeedDown,
            },
            DeviceKey::DPAD_RIGHT => match mode {
                InputMode::Seek => Command::SeekBy(self.seek_step),
                InputMode::Speed => Command::SpeedUp,
            },
            DeviceKey::DPAD_CENTER
            | DeviceKey::ENTER
            | DeviceKey::SPACE
            | DeviceKey::MEDIA_PLAY_PAUSE => Command::TogglePause,
            DeviceKey::DPAD_UP | DeviceKey::DPAD_DOWN => Command::ToggleInputMode,
            DeviceKey::MEDIA_REWIND => Command::SeekBy(-self.seek_step),
            DeviceKey::MEDIA_FAST_FORWARD => Command::SeekBy(self.seek_step),
            DeviceKey::MEDIA_PREVIOUS => Command::PreviousPart,
            DeviceKey::MEDIA_NEXT => Command::NextPart,
            DeviceKey::BACK | DeviceKey::ESCAPE => Command::Exit,
            DeviceKey(code) if (DeviceKey::DIGIT_1.0..=DeviceKey::DIGIT_9.0).contains(&code) => {
                Command::JumpToPart((code - DeviceKey::DIGIT_1.0) as usize)
            }
            other => {
                warn!(key = other.0, "Unmapped remote key");
                return Err(UnmappedKey(other));
            }
        };
        Ok(command)
    }
}

impl Default for RemoteInputRouter {
    fn default() -> Self {
        Self::new(DEFAULT_SEEK_STEP_SECS)
    }
}

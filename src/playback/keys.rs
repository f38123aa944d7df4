//! Terminal as a remote control
//!
//! Wraps crossterm's `EventStream` into a stream of [`DeviceKey`]s. Raw mode
//! is enabled when the stream is subscribed and restored when it is dropped,
//! so the subscription can never outlive the playback screen that owns it.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::{debug, warn};

use super::remote::DeviceKey;

/// Restores cooked mode on drop
struct RawModeGuard;

impl RawModeGuard {
    fn acquire() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Lazy stream of remote key presses read from the terminal
pub struct RemoteKeys {
    events: EventStream,
    _raw_mode: RawModeGuard,
}

impl RemoteKeys {
    /// Start listening; each call yields a fresh, independent stream
    pub fn subscribe() -> std::io::Result<Self> {
        let raw_mode = RawModeGuard::acquire()?;
        Ok(Self {
            events: EventStream::new(),
            _raw_mode: raw_mode,
        })
    }
}

impl Stream for RemoteKeys {
    type Item = DeviceKey;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<DeviceKey>> {
        loop {
            match ready!(self.events.poll_next_unpin(cx)) {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let device_key = terminal_key(&key);
                    if device_key == DeviceKey::UNKNOWN {
                        debug!(?key, "Terminal key has no device code");
                    }
                    return Poll::Ready(Some(device_key));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Terminal input failed: {}", e);
                    return Poll::Ready(None);
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

/// Translate a terminal key to the remote key it stands for.
///
/// Keys without a playback role still get their device code so the router
/// can report them; anything with no code at all is [`DeviceKey::UNKNOWN`].
pub fn terminal_key(key: &KeyEvent) -> DeviceKey {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return DeviceKey::BACK;
    }
    match key.code {
        KeyCode::Left => DeviceKey::DPAD_LEFT,
        KeyCode::Right => DeviceKey::DPAD_RIGHT,
        KeyCode::Up => DeviceKey::DPAD_UP,
        KeyCode::Down => DeviceKey::DPAD_DOWN,
        KeyCode::Enter => DeviceKey::DPAD_CENTER,
        KeyCode::Char(' ') => DeviceKey::SPACE,
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => DeviceKey::BACK,
        KeyCode::Char('n') | KeyCode::PageDown => DeviceKey::MEDIA_NEXT,
        KeyCode::Char('p') | KeyCode::PageUp => DeviceKey::MEDIA_PREVIOUS,
        KeyCode::Char(',') => DeviceKey::MEDIA_REWIND,
        KeyCode::Char('.') => DeviceKey::MEDIA_FAST_FORWARD,
        KeyCode::Char(c @ '0'..='9') => {
            DeviceKey(DeviceKey::DIGIT_0.code() + (c as i32 - '0' as i32))
        }
        KeyCode::Char(c) if c.is_ascii_alphabetic() => {
            DeviceKey(DeviceKey::LETTER_A.code() + (c.to_ascii_lowercase() as i32 - 'a' as i32))
        }
        KeyCode::Tab => DeviceKey::TAB,
        KeyCode::Delete => DeviceKey::FORWARD_DEL,
        KeyCode::Home => DeviceKey::MOVE_HOME,
        KeyCode::End => DeviceKey::MOVE_END,
        KeyCode::Insert => DeviceKey::INSERT,
        KeyCode::F(n @ 1..=12) => DeviceKey(DeviceKey::F1.code() + i32::from(n) - 1),
        _ => DeviceKey::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::remote::{RemoteInputRouter, UnmappedKey};
    use crate::playback::session::InputMode;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_map_to_dpad() {
        assert_eq!(terminal_key(&press(KeyCode::Left)), DeviceKey::DPAD_LEFT);
        assert_eq!(terminal_key(&press(KeyCode::Right)), DeviceKey::DPAD_RIGHT);
        assert_eq!(terminal_key(&press(KeyCode::Enter)), DeviceKey::DPAD_CENTER);
    }

    #[test]
    fn test_digits_map_to_device_digits() {
        assert_eq!(terminal_key(&press(KeyCode::Char('1'))), DeviceKey::DIGIT_1);
        assert_eq!(terminal_key(&press(KeyCode::Char('9'))), DeviceKey::DIGIT_9);
        assert_eq!(terminal_key(&press(KeyCode::Char('0'))), DeviceKey::DIGIT_0);
    }

    #[test]
    fn test_ctrl_c_is_back() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(terminal_key(&key), DeviceKey::BACK);
    }

    #[test]
    fn test_unbound_keys_keep_their_device_code() {
        let router = RemoteInputRouter::default();
        let z = terminal_key(&press(KeyCode::Char('z')));
        assert_eq!(z, DeviceKey(54));
        assert_eq!(terminal_key(&press(KeyCode::Char('Z'))), z);
        assert_eq!(terminal_key(&press(KeyCode::F(5))), DeviceKey(135));
        assert_eq!(terminal_key(&press(KeyCode::CapsLock)), DeviceKey::UNKNOWN);

        for key in [z, DeviceKey::TAB, DeviceKey::UNKNOWN] {
            assert_eq!(router.route(key, InputMode::Seek), Err(UnmappedKey(key)));
        }
    }
}

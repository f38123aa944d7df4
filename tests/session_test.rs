//! Playback session tests
//!
//! Pause/speed interplay, seeking, part sequencing and boundary notices.

use tvshows::models::{EpisodeRef, Notice, Part};
use tvshows::playback::{Command, Effect, Phase, PlaybackSession};

fn parts(n: usize) -> Vec<Part> {
    (1..=n)
        .map(|i| Part::new(format!("Part {}", i), format!("http://media/p{}.mp4", i)))
        .collect()
}

fn session_with(n: usize) -> PlaybackSession {
    let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E4"));
    session.load_parts(parts(n), true);
    session
}

fn with_progress(mut session: PlaybackSession, current: f64, total: f64) -> PlaybackSession {
    session.apply(Command::Progress { current, total });
    session
}

// =============================================================================
// Speed & Pause
// =============================================================================

#[test]
fn test_speed_up_clamps_at_three() {
    let mut session = session_with(1);
    let speeds: Vec<f64> = (0..3)
        .map(|_| {
            session.apply(Command::SpeedUp);
            session.state().speed
        })
        .collect();
    assert_eq!(speeds, vec![2.0, 3.0, 3.0]);
    assert!(session.apply(Command::SpeedUp).is_empty());
}

#[test]
fn test_speed_down_clamps_at_half() {
    let mut session = session_with(1);
    assert_eq!(session.apply(Command::SpeedDown), vec![Effect::SetSpeed(0.5)]);
    assert!(session.apply(Command::SpeedDown).is_empty());
    assert_eq!(session.state().speed, 0.5);
}

#[test]
fn test_toggle_pause_at_double_speed_restores_normal() {
    let mut session = session_with(1);
    session.apply(Command::SpeedUp);
    assert_eq!(session.state().speed, 2.0);

    let effects = session.apply(Command::TogglePause);

    assert_eq!(effects, vec![Effect::SetSpeed(1.0)]);
    let state = session.state();
    assert_eq!(state.speed, 1.0);
    assert!(!state.paused);
}

#[test]
fn test_paused_session_reports_normal_speed() {
    let mut session = session_with(1);
    session.apply(Command::TogglePause);
    let state = session.state();
    assert!(state.paused);
    assert_eq!(state.speed, 1.0);
}

// =============================================================================
// Seeking
// =============================================================================

#[test]
fn test_seek_back_clamps_to_zero() {
    let mut session = with_progress(session_with(1), 10.0, 600.0);
    assert_eq!(session.apply(Command::SeekBy(-15.0)), vec![Effect::Seek(0.0)]);
    assert_eq!(session.state().current_time, 0.0);
}

#[test]
fn test_seek_clamps_to_duration() {
    let mut session = with_progress(session_with(1), 590.0, 600.0);
    assert_eq!(session.apply(Command::SeekBy(15.0)), vec![Effect::Seek(600.0)]);
    assert_eq!(session.apply(Command::SeekTo(-5.0)), vec![Effect::Seek(0.0)]);
}

#[test]
fn test_seek_ignored_before_first_progress() {
    let mut session = session_with(1);
    assert!(session.apply(Command::SeekBy(15.0)).is_empty());
    assert!(session.apply(Command::SeekTo(30.0)).is_empty());
}

// =============================================================================
// Parts
// =============================================================================

#[test]
fn test_single_part_plays_immediately() {
    let mut session = PlaybackSession::new(EpisodeRef::new("Star", "Show", "E1"));
    let effects = session.load_parts(parts(1), false);

    assert!(matches!(
        &effects[0],
        Effect::Play { index: 0, url, speed, .. } if url == "http://media/p1.mp4" && *speed == 1.0
    ));
    assert_eq!(session.state().part_index, Some(0));
}

#[test]
fn test_part_ended_advances_and_resets_time() {
    let mut session = with_progress(session_with(3), 500.0, 600.0);
    let effects = session.apply(Command::PartEnded);

    assert!(matches!(effects[0], Effect::Play { index: 1, .. }));
    let state = session.state();
    assert_eq!(state.part_index, Some(1));
    assert_eq!(state.current_time, 0.0);
    assert!(!state.paused);
}

#[test]
fn test_last_part_ended_continues() {
    let mut session = session_with(3);
    session.apply(Command::JumpToPart(2));

    let effects = session.apply(Command::PartEnded);

    assert_eq!(effects, vec![Effect::Continue]);
    assert_eq!(session.phase(), &Phase::Ended);
    assert!(session.state().ended);
    // Nothing left to control
    assert!(session.apply(Command::TogglePause).is_empty());
}

#[test]
fn test_jump_out_of_range_is_noop() {
    let mut session = session_with(3);
    assert!(session.apply(Command::JumpToPart(3)).is_empty());
    assert_eq!(session.state().part_index, Some(0));
}

#[test]
fn test_part_boundaries_raise_notices() {
    let mut session = session_with(2);
    assert_eq!(
        session.apply(Command::PreviousPart),
        vec![Effect::Notice(Notice::FirstPart)]
    );

    session.apply(Command::NextPart);
    assert_eq!(session.state().part_index, Some(1));
    assert_eq!(
        session.apply(Command::NextPart),
        vec![Effect::Notice(Notice::LastPart)]
    );
    assert_eq!(session.state().part_index, Some(1));
}

#[test]
fn test_part_change_keeps_speed() {
    let mut session = session_with(2);
    session.apply(Command::SpeedUp);
    let effects = session.apply(Command::NextPart);
    assert!(matches!(effects[0], Effect::Play { index: 1, speed, .. } if speed == 2.0));
}

#[test]
fn test_progress_never_rejected_while_active() {
    let mut session = session_with(1);
    session.apply(Command::TogglePause);
    assert!(session
        .apply(Command::Progress {
            current: 42.0,
            total: 100.0
        })
        .is_empty());
    assert_eq!(session.state().current_time, 42.0);
    assert_eq!(session.state().total_duration, 100.0);
}

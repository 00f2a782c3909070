//! TonePlayer behavior against the clock-driven simulated sink.

use std::sync::Arc;
use std::time::Duration;

use otoscreen_audio::sim::SimulatedSink;
use otoscreen_audio::{PlaybackEvent, PlaybackSink, ToneAsset, TonePlayer};
use otoscreen_foundation::test_clock;
use otoscreen_telemetry::SessionMetrics;
use tokio::sync::broadcast::error::TryRecvError;

const SKIP: Duration = Duration::from_secs(10);

fn asset(label: &str, hz: f32) -> ToneAsset {
    ToneAsset::new(label, hz, SKIP, Duration::from_secs(30))
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => events.push(ev),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    events
}

#[test]
fn start_seeks_past_the_lead_in() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock.clone());
    let player = TonePlayer::new(Box::new(sink.clone()));

    player.start(&asset("500 Hz", 500.0), 0.8, SKIP).unwrap();
    assert_eq!(sink.last_volume(), Some(0.8));

    // Position starts at the lead-in mark, ratio at zero.
    clock.advance(Duration::from_secs(15));
    assert_eq!(
        otoscreen_audio::progress_ratio(Duration::from_secs(25), Duration::from_secs(40), SKIP),
        0.5
    );
}

#[test]
fn starting_a_new_tone_fully_replaces_the_previous_one() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock.clone());
    let player = TonePlayer::new(Box::new(sink.clone()));

    let first = player.start(&asset("500 Hz", 500.0), 0.8, SKIP).unwrap();
    clock.advance(Duration::from_secs(5));
    let second = player.start(&asset("1000 Hz", 1000.0), 0.4, SKIP).unwrap();

    assert_ne!(first, second);
    assert_eq!(sink.load_count(), 2);
    assert_eq!(sink.last_volume(), Some(0.4));
    // One loaded tone, freshly positioned at the lead-in mark.
    assert!(sink.is_loaded());
    assert_eq!(sink.position(), SKIP);
}

#[test]
fn stop_is_idempotent_and_discards_the_source() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock);
    let player = TonePlayer::new(Box::new(sink.clone()));

    player.stop(); // nothing playing: no-op
    assert!(!sink.is_loaded());

    player.start(&asset("4000 Hz", 4000.0), 0.2, SKIP).unwrap();
    player.stop();
    player.stop();
    assert!(!sink.is_loaded());
    assert!(player.current_playback().is_none());
}

#[test]
fn stale_events_from_a_superseded_playback_are_dropped() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock.clone());
    let metrics = Arc::new(SessionMetrics::default());
    let player =
        TonePlayer::new(Box::new(sink)).with_metrics(Arc::clone(&metrics));
    let mut rx = player.subscribe();

    let first = player.start(&asset("500 Hz", 500.0), 0.8, SKIP).unwrap();
    // Run the first tone to its end, but supersede it before polling so its
    // "ended" state would arrive late.
    clock.advance(Duration::from_secs(40));
    let second = player.start(&asset("1000 Hz", 1000.0), 0.4, SKIP).unwrap();
    player.poll_once();

    let events = drain(&mut rx);
    assert!(
        !events.iter().any(|ev| matches!(ev,
            PlaybackEvent::Ended { id } | PlaybackEvent::Progress { id, .. } if *id == first
        )),
        "no event from the superseded playback may surface"
    );
    assert!(events
        .iter()
        .any(|ev| matches!(ev, PlaybackEvent::Started { id } if *id == second)));
}

#[test]
fn ended_is_emitted_exactly_once_for_the_active_playback() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock.clone());
    let player = TonePlayer::new(Box::new(sink));
    let mut rx = player.subscribe();

    let id = player.start(&asset("500 Hz", 500.0), 0.8, SKIP).unwrap();
    clock.advance(Duration::from_secs(40));
    player.poll_once();
    player.poll_once();

    let events = drain(&mut rx);
    let ended: Vec<_> = events
        .iter()
        .filter(|ev| matches!(ev, PlaybackEvent::Ended { id: e } if *e == id))
        .collect();
    assert_eq!(ended.len(), 1);

    let last_ratio = events.iter().rev().find_map(|ev| match ev {
        PlaybackEvent::Progress { ratio, .. } => Some(*ratio),
        _ => None,
    });
    assert_eq!(last_ratio, Some(1.0));
}

#[test]
fn toggle_pauses_and_replays_from_the_lead_in_mark() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock.clone());
    let player = TonePlayer::new(Box::new(sink.clone()));

    player.start(&asset("500 Hz", 500.0), 0.8, SKIP).unwrap();
    clock.advance(Duration::from_secs(12));

    assert!(!player.toggle().unwrap());
    assert!(!player.is_playing());
    let paused_at = sink.position();
    clock.advance(Duration::from_secs(30));
    assert_eq!(sink.position(), paused_at);

    // Resume replays from the lead-in mark, not the pause position.
    assert!(player.toggle().unwrap());
    assert_eq!(sink.position(), SKIP);
}

#[test]
fn toggle_without_an_active_playback_is_rejected() {
    let clock = test_clock();
    let sink = SimulatedSink::new(clock);
    let player = TonePlayer::new(Box::new(sink));
    assert!(player.toggle().is_err());
}

//! Tone playback layer for otoscreen.
//!
//! The browser media element the original flow leaned on becomes a
//! [`sink::PlaybackSink`] seam with two backends: a real output device
//! ([`device::DeviceSink`], cpal) and a clock-driven simulation
//! ([`sim::SimulatedSink`]) for tests and headless runs. [`player::TonePlayer`]
//! enforces the single-active-playback discipline on top of whichever sink is
//! wired in.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod asset;
pub mod device;
pub mod player;
pub mod sim;
pub mod sink;

pub use asset::{volume_ticks, ToneAsset};
pub use player::{progress_ratio, PlaybackEvent, PlaybackId, TonePlayer};
pub use sink::PlaybackSink;

/// Generates unique playback IDs
static PLAYBACK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique playback ID.
///
/// Every `start` of the player gets a fresh ID; events carrying a superseded
/// ID are discarded rather than applied to the current question.
pub fn next_playback_id() -> u64 {
    PLAYBACK_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

use std::time::Duration;

use otoscreen_foundation::PlaybackError;

use crate::asset::ToneAsset;

/// The seam standing in for the media element.
///
/// A sink holds at most one loaded tone. Position and end-of-playback are
/// sampled by the player's poll loop rather than pushed, which keeps sink
/// implementations free to run their audio path on whatever thread the
/// backend needs.
pub trait PlaybackSink: Send {
    /// Load `asset` for playback at `volume` (0.0..=1.0), replacing any
    /// previously loaded tone. The sink starts paused at position zero.
    fn load(&mut self, asset: &ToneAsset, volume: f32) -> Result<(), PlaybackError>;

    /// Move the playback position. Positions past the end are clamped.
    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;

    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Current playback position. Zero when nothing is loaded.
    fn position(&self) -> Duration;

    /// Duration of the loaded tone, if any.
    fn duration(&self) -> Option<Duration>;

    /// True once playback has reached the end of the loaded tone.
    fn is_ended(&self) -> bool;

    /// Drop the loaded tone entirely so no buffered audio can keep playing.
    fn unload(&mut self);
}

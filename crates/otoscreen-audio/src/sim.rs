use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use otoscreen_foundation::{PlaybackError, SharedClock};

use crate::asset::ToneAsset;
use crate::sink::PlaybackSink;

/// Clock-driven sink with no audio hardware behind it.
///
/// Position advances with the injected clock while "playing", which makes it
/// usable both for `--simulate` runs (real clock) and deterministic tests
/// (virtual clock). Clones share state so a test can keep a handle on the
/// sink it hands to the player.
#[derive(Clone)]
pub struct SimulatedSink {
    clock: SharedClock,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    loaded: Option<SimPlayback>,
    loads: u64,
    last_volume: Option<f32>,
}

struct SimPlayback {
    duration: Duration,
    base: Duration,
    resumed_at: Option<Instant>,
}

impl SimPlayback {
    fn position(&self, now: Instant) -> Duration {
        let elapsed = match self.resumed_at {
            Some(at) => now.saturating_duration_since(at),
            None => Duration::ZERO,
        };
        (self.base + elapsed).min(self.duration)
    }
}

impl SimulatedSink {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// How many tones have been loaded over the sink's lifetime.
    pub fn load_count(&self) -> u64 {
        self.inner.lock().loads
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.inner.lock().last_volume
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().loaded.is_some()
    }
}

impl PlaybackSink for SimulatedSink {
    fn load(&mut self, asset: &ToneAsset, volume: f32) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock();
        inner.loaded = Some(SimPlayback {
            duration: asset.duration,
            base: Duration::ZERO,
            resumed_at: None,
        });
        inner.loads += 1;
        inner.last_volume = Some(volume);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let playback = inner.loaded.as_mut().ok_or(PlaybackError::NotLoaded)?;
        playback.base = position.min(playback.duration);
        if playback.resumed_at.is_some() {
            playback.resumed_at = Some(now);
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let playback = inner.loaded.as_mut().ok_or(PlaybackError::NotLoaded)?;
        if playback.resumed_at.is_none() {
            playback.resumed_at = Some(now);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let playback = inner.loaded.as_mut().ok_or(PlaybackError::NotLoaded)?;
        if playback.resumed_at.is_some() {
            playback.base = playback.position(now);
            playback.resumed_at = None;
        }
        Ok(())
    }

    fn position(&self) -> Duration {
        let now = self.clock.now();
        self.inner
            .lock()
            .loaded
            .as_ref()
            .map(|p| p.position(now))
            .unwrap_or(Duration::ZERO)
    }

    fn duration(&self) -> Option<Duration> {
        self.inner.lock().loaded.as_ref().map(|p| p.duration)
    }

    fn is_ended(&self) -> bool {
        let now = self.clock.now();
        self.inner
            .lock()
            .loaded
            .as_ref()
            .map(|p| !p.duration.is_zero() && p.position(now) >= p.duration)
            .unwrap_or(false)
    }

    fn unload(&mut self) {
        self.inner.lock().loaded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otoscreen_foundation::test_clock;

    fn asset() -> ToneAsset {
        ToneAsset::new(
            "1000 Hz",
            1000.0,
            Duration::from_secs(10),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn position_tracks_the_clock_only_while_playing() {
        let clock = test_clock();
        let mut sink = SimulatedSink::new(clock.clone());
        sink.load(&asset(), 0.8).unwrap();

        sink.play().unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(sink.position(), Duration::from_secs(5));

        sink.pause().unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(sink.position(), Duration::from_secs(5));
        assert!(!sink.is_ended());
    }

    #[test]
    fn playback_ends_at_the_asset_duration() {
        let clock = test_clock();
        let mut sink = SimulatedSink::new(clock.clone());
        sink.load(&asset(), 0.4).unwrap();
        sink.seek(Duration::from_secs(10)).unwrap();
        sink.play().unwrap();

        clock.advance(Duration::from_secs(29));
        assert!(!sink.is_ended());
        clock.advance(Duration::from_secs(1));
        assert!(sink.is_ended());
        assert_eq!(sink.position(), Duration::from_secs(40));
    }

    #[test]
    fn operations_on_an_unloaded_sink_are_rejected() {
        let clock = test_clock();
        let mut sink = SimulatedSink::new(clock);
        assert!(matches!(sink.play(), Err(PlaybackError::NotLoaded)));
        assert_eq!(sink.position(), Duration::ZERO);
        assert_eq!(sink.duration(), None);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use otoscreen_foundation::PlaybackError;
use otoscreen_telemetry::SessionMetrics;

use crate::asset::ToneAsset;
use crate::next_playback_id;
use crate::sink::PlaybackSink;

/// Identifies one `start` of the player. Monotonically increasing.
pub type PlaybackId = u64;

/// Cadence at which the poll loop samples sink position. Matches the
/// media-element `timeupdate` rate the original flow was written against.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    Started { id: PlaybackId },
    /// Progress ratio in [0, 1] over the post-lead-in portion of the tone.
    Progress { id: PlaybackId, ratio: f32 },
    Ended { id: PlaybackId },
    Failed { id: PlaybackId, reason: String },
}

#[derive(Debug, Clone, Copy)]
struct ActivePlayback {
    id: PlaybackId,
    skip: Duration,
    playing: bool,
    ended: bool,
}

/// Owns the single audio output channel.
///
/// Exactly one playback is active at a time: `start` fully stops and unloads
/// the previous tone before the next one begins. Events are fanned out on a
/// broadcast channel and always carry the playback ID that produced them, so
/// a late event from a superseded playback can be detected and discarded.
pub struct TonePlayer {
    sink: Mutex<Box<dyn PlaybackSink>>,
    active: Mutex<Option<ActivePlayback>>,
    running: Arc<AtomicBool>,
    events: broadcast::Sender<PlaybackEvent>,
    metrics: Option<Arc<SessionMetrics>>,
}

impl TonePlayer {
    pub fn new(sink: Box<dyn PlaybackSink>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            sink: Mutex::new(sink),
            active: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            events,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Begin playback of `asset` at `volume`, seeking past `skip` first.
    ///
    /// Any active playback is stopped and unloaded before the new one starts.
    /// On sink failure the player is left stopped and a `Failed` event is
    /// emitted; the question stays answerable and the replay control retries.
    pub fn start(
        &self,
        asset: &ToneAsset,
        volume: f32,
        skip: Duration,
    ) -> Result<PlaybackId, PlaybackError> {
        self.stop();

        let id = next_playback_id();
        let mut active = self.active.lock();
        let mut sink = self.sink.lock();

        match Self::begin(sink.as_mut(), asset, volume, skip) {
            Ok(()) => {
                *active = Some(ActivePlayback {
                    id,
                    skip,
                    playing: true,
                    ended: false,
                });
                if let Some(m) = &self.metrics {
                    m.increment_playbacks();
                }
                tracing::debug!(id, label = %asset.label, volume, "Playback started");
                let _ = self.events.send(PlaybackEvent::Started { id });
                Ok(id)
            }
            Err(e) => {
                sink.unload();
                if let Some(m) = &self.metrics {
                    m.increment_playback_failures();
                }
                tracing::warn!(id, label = %asset.label, error = %e, "Playback failed to start");
                let _ = self.events.send(PlaybackEvent::Failed {
                    id,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn begin(
        sink: &mut dyn PlaybackSink,
        asset: &ToneAsset,
        volume: f32,
        skip: Duration,
    ) -> Result<(), PlaybackError> {
        sink.load(asset, volume)?;
        let duration = sink.duration().unwrap_or(asset.duration);
        // Clips shorter than the lead-in play from the start instead.
        let seek_to = if duration <= skip { Duration::ZERO } else { skip };
        sink.seek(seek_to)?;
        sink.play()
    }

    /// Pause and reset to position zero, discarding the loaded tone.
    ///
    /// Safe to call repeatedly or when nothing is playing.
    pub fn stop(&self) {
        let mut active = self.active.lock();
        if active.take().is_none() {
            return;
        }
        let mut sink = self.sink.lock();
        let _ = sink.pause();
        let _ = sink.seek(Duration::ZERO);
        sink.unload();
    }

    /// Pause the current tone, or replay it from the lead-in mark.
    ///
    /// Returns whether the tone is now playing. Errors with `NotLoaded` when
    /// no playback is active (e.g. after a failed `start`), so the caller can
    /// re-present the question instead.
    pub fn toggle(&self) -> Result<bool, PlaybackError> {
        let mut active = self.active.lock();
        let playback = active.as_mut().ok_or(PlaybackError::NotLoaded)?;
        let mut sink = self.sink.lock();

        if playback.playing {
            sink.pause()?;
            playback.playing = false;
            Ok(false)
        } else {
            // Replaying seeks back to the lead-in mark rather than resuming
            // mid-tone, so the listener always hears the full measured tone.
            let duration = sink.duration().unwrap_or_default();
            let seek_to = if duration <= playback.skip {
                Duration::ZERO
            } else {
                playback.skip
            };
            sink.seek(seek_to)?;
            sink.play()?;
            playback.playing = true;
            playback.ended = false;
            Ok(true)
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.lock().map(|p| p.playing).unwrap_or(false)
    }

    pub fn current_playback(&self) -> Option<PlaybackId> {
        self.active.lock().map(|p| p.id)
    }

    /// Sample the sink once and emit progress/ended events for the active
    /// playback. Called by the poll task; exposed so tests can drive it.
    pub fn poll_once(&self) {
        let sampled = *self.active.lock();
        let Some(playback) = sampled else { return };
        if !playback.playing {
            return;
        }

        let (position, duration, ended) = {
            let sink = self.sink.lock();
            (sink.position(), sink.duration(), sink.is_ended())
        };
        let Some(duration) = duration else { return };
        let ratio = progress_ratio(position, duration, playback.skip);

        // The sink was sampled outside the active lock; a concurrent start()
        // may have superseded this playback in the meantime.
        let mut active = self.active.lock();
        match active.as_mut() {
            Some(current) if current.id == playback.id => {
                let _ = self.events.send(PlaybackEvent::Progress {
                    id: playback.id,
                    ratio,
                });
                if ended && !current.ended {
                    current.ended = true;
                    current.playing = false;
                    let _ = self.events.send(PlaybackEvent::Ended { id: playback.id });
                }
            }
            _ => {
                if let Some(m) = &self.metrics {
                    m.increment_stale_events();
                }
                tracing::trace!(id = playback.id, "Dropping events from superseded playback");
            }
        }
    }

    /// Spawn the position poll loop. Runs until `shutdown`.
    pub fn spawn_poller(self: &Arc<Self>) -> JoinHandle<()> {
        let player = Arc::clone(self);
        player.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&player.running);

        tokio::spawn(async move {
            tracing::debug!("Playback poll task started");
            let mut tick = tokio::time::interval(POLL_INTERVAL);
            while running.load(Ordering::SeqCst) {
                tick.tick().await;
                player.poll_once();
            }
            tracing::debug!("Playback poll task stopped");
        })
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop();
    }
}

/// Progress over the measured (post-lead-in) portion of the tone, clamped to
/// [0, 1]. Clips no longer than the skip use the unadjusted ratio.
pub fn progress_ratio(position: Duration, duration: Duration, skip: Duration) -> f32 {
    if duration.is_zero() {
        return 0.0;
    }
    if duration <= skip {
        (position.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
    } else {
        let adjusted = position.saturating_sub(skip);
        (adjusted.as_secs_f32() / (duration - skip).as_secs_f32()).clamp(0.0, 1.0)
    }
}

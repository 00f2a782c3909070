use std::time::Duration;

/// One test tone, reused across volume levels.
///
/// The deployed site ships one static clip per frequency and plays it at
/// three different volumes; here the clip is described by its parameters and
/// synthesized by the sink. The first `lead_in` of each clip is a calibration
/// stretch that playback skips past.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneAsset {
    pub label: String,
    pub frequency_hz: f32,
    pub lead_in: Duration,
    pub duration: Duration,
}

impl ToneAsset {
    pub fn new(label: impl Into<String>, frequency_hz: f32, lead_in: Duration, tone: Duration) -> Self {
        Self {
            label: label.into(),
            frequency_hz,
            lead_in,
            duration: lead_in + tone,
        }
    }
}

/// Number of active ticks (out of 5) on the volume indicator for a playback
/// volume in 0.0..=1.0.
pub fn volume_ticks(volume: f32) -> usize {
    const TICKS: usize = 5;
    ((volume * TICKS as f32).round() as usize).min(TICKS)
}

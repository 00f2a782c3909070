use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use otoscreen_audio::ToneAsset;

/// Default calibration lead-in at the head of every clip.
pub const DEFAULT_LEAD_IN: Duration = Duration::from_secs(10);
/// Default length of the measured tone after the lead-in.
pub const DEFAULT_TONE: Duration = Duration::from_secs(30);

const DEFAULT_FREQUENCIES: [(&str, f32); 3] =
    [("500 Hz", 500.0), ("1000 Hz", 1000.0), ("4000 Hz", 4000.0)];
const DEFAULT_VOLUMES: [f32; 3] = [0.8, 0.4, 0.2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyBand {
    Low,
    Mid,
    High,
}

impl FrequencyBand {
    pub fn classify(frequency_hz: f32) -> Self {
        if frequency_hz < 800.0 {
            Self::Low
        } else if frequency_hz < 2000.0 {
            Self::Mid
        } else {
            Self::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low frequency",
            Self::Mid => "Mid frequency",
            Self::High => "High frequency",
        }
    }
}

/// One (frequency, volume) combination presented during the test.
#[derive(Debug, Clone)]
pub struct StimulusQuestion {
    pub id: u32,
    pub frequency_label: String,
    pub band: FrequencyBand,
    pub volume: f32,
    pub asset: ToneAsset,
    pub instruction: String,
}

impl StimulusQuestion {
    /// Display label for the volume level, e.g. "80% volume".
    pub fn volume_label(&self) -> String {
        format!("{}% volume", (self.volume * 100.0).round() as u32)
    }
}

/// The ordered stimulus set: the cartesian product of the configured
/// frequencies and volumes, frequency-major.
#[derive(Debug, Clone)]
pub struct StimulusBank {
    questions: Vec<StimulusQuestion>,
}

impl StimulusBank {
    pub fn build(
        frequencies: &[(String, f32)],
        volumes: &[f32],
        lead_in: Duration,
        tone: Duration,
    ) -> Self {
        let mut questions = Vec::with_capacity(frequencies.len() * volumes.len());
        for (i, (label, hz)) in frequencies.iter().enumerate() {
            // One asset per frequency, shared by its volume levels.
            let asset = ToneAsset::new(label.clone(), *hz, lead_in, tone);
            for (j, &volume) in volumes.iter().enumerate() {
                questions.push(StimulusQuestion {
                    id: (i * volumes.len() + j + 1) as u32,
                    frequency_label: label.clone(),
                    band: FrequencyBand::classify(*hz),
                    volume,
                    asset: asset.clone(),
                    instruction: "Can you hear this tone? Press 'Yes' if you do.".into(),
                });
            }
        }
        Self { questions }
    }

    pub fn questions(&self) -> &[StimulusQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StimulusQuestion> {
        self.questions.get(index)
    }
}

static DEFAULT_BANK: Lazy<StimulusBank> = Lazy::new(|| {
    let frequencies: Vec<(String, f32)> = DEFAULT_FREQUENCIES
        .iter()
        .map(|(label, hz)| (label.to_string(), *hz))
        .collect();
    StimulusBank::build(&frequencies, &DEFAULT_VOLUMES, DEFAULT_LEAD_IN, DEFAULT_TONE)
});

/// The deployed stimulus set: {500, 1000, 4000} Hz at {80, 40, 20}% volume.
pub fn default_bank() -> &'static StimulusBank {
    &DEFAULT_BANK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bank_is_the_frequency_major_cartesian_product() {
        let bank = default_bank();
        assert_eq!(bank.len(), 9);

        let pairs: Vec<(&str, f32)> = bank
            .questions()
            .iter()
            .map(|q| (q.frequency_label.as_str(), q.volume))
            .collect();
        let expected: Vec<(&str, f32)> = DEFAULT_FREQUENCIES
            .iter()
            .flat_map(|(label, _)| DEFAULT_VOLUMES.iter().map(move |&v| (*label, v)))
            .collect();
        assert_eq!(pairs, expected);

        // Pairs are unique and IDs run 1..=9 in order.
        for (i, q) in bank.questions().iter().enumerate() {
            assert_eq!(q.id, i as u32 + 1);
        }
        let mut seen = std::collections::HashSet::new();
        for (label, volume) in &pairs {
            assert!(seen.insert((label.to_string(), (volume * 100.0) as u32)));
        }
    }

    #[test]
    fn assets_are_shared_per_frequency() {
        let bank = default_bank();
        let q = &bank.questions()[0];
        let same_freq = &bank.questions()[1];
        let other_freq = &bank.questions()[3];
        assert_eq!(q.asset, same_freq.asset);
        assert_ne!(q.asset.frequency_hz, other_freq.asset.frequency_hz);
    }

    #[test]
    fn bands_cover_the_three_test_frequencies() {
        assert_eq!(FrequencyBand::classify(500.0), FrequencyBand::Low);
        assert_eq!(FrequencyBand::classify(1000.0), FrequencyBand::Mid);
        assert_eq!(FrequencyBand::classify(4000.0), FrequencyBand::High);
    }

    #[test]
    fn volume_labels_render_as_percentages() {
        let bank = default_bank();
        assert_eq!(bank.questions()[0].volume_label(), "80% volume");
        assert_eq!(bank.questions()[2].volume_label(), "20% volume");
    }
}

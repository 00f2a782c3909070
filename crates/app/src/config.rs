//! Application configuration (TOML on disk, fully defaulted).
//!
//! Every field has a deployed default so the binary runs without a config
//! file; a file only needs the sections it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use otoscreen_foundation::AppError;
use otoscreen_intake::Branch;
use otoscreen_screening::StimulusBank;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub intake: IntakeConfig,
    pub flow: FlowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name, `None` for the system default.
    pub device: Option<String>,
    /// Silent calibration lead-in at the head of every clip, in seconds.
    pub lead_in_secs: u64,
    /// Length of the measured tone after the lead-in, in seconds.
    pub tone_secs: u64,
    pub frequencies: Vec<FrequencySpec>,
    /// Volume levels in (0, 1], presented per frequency in order.
    pub volumes: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencySpec {
    pub label: String,
    pub hz: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            lead_in_secs: 10,
            tone_secs: 30,
            frequencies: vec![
                FrequencySpec {
                    label: "500 Hz".into(),
                    hz: 500.0,
                },
                FrequencySpec {
                    label: "1000 Hz".into(),
                    hz: 1000.0,
                },
                FrequencySpec {
                    label: "4000 Hz".into(),
                    hz: 4000.0,
                },
            ],
            volumes: vec![0.8, 0.4, 0.2],
        }
    }
}

/// Which submission endpoint receives the contact payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeMode {
    /// Fire-and-forget POST of form fields to the third-party relay.
    Relay,
    /// JSON POST to the results API; the response status is checked.
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub mode: IntakeMode,
    pub relay_url: String,
    pub results_url: String,
    /// Digits-only contact identity behind the chat deep link.
    pub messaging_contact: String,
    pub branches: Vec<Branch>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            mode: IntakeMode::Relay,
            relay_url: "https://formsubmit.co/info@izmirses.example".into(),
            results_url: "http://127.0.0.1:3000/api/send-results".into(),
            messaging_contact: "905444020605".into(),
            branches: vec![
                Branch {
                    name: "Alsancak".into(),
                    address: "Şair Eşref Bulv. No:82/1 Alsancak / İzmir".into(),
                    phone: "0 (505) 035 99 90".into(),
                    email: "alsancak@izmirses.example".into(),
                },
                Branch {
                    name: "Karşıyaka".into(),
                    address: "Kemalpaşa Cad. No:57/A Karşıyaka / İzmir".into(),
                    phone: "0 (505) 035 99 91".into(),
                    email: "karsiyaka@izmirses.example".into(),
                },
                Branch {
                    name: "Buca".into(),
                    address: "Uğur Mumcu Cad. No:12 Buca / İzmir".into(),
                    phone: "0 (505) 035 99 92".into(),
                    email: "buca@izmirses.example".into(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Delay before the landing contact prompt fires, in milliseconds.
    pub landing_prompt_delay_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            landing_prompt_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| AppError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.audio.frequencies.is_empty() {
            return Err(AppError::Config(
                "audio.frequencies must list at least one frequency".into(),
            ));
        }
        if self.audio.volumes.is_empty() {
            return Err(AppError::Config(
                "audio.volumes must list at least one level".into(),
            ));
        }
        for &v in &self.audio.volumes {
            if !(v > 0.0 && v <= 1.0) {
                return Err(AppError::Config(format!(
                    "audio.volumes entries must be in (0, 1], got {v}"
                )));
            }
        }
        if self.audio.tone_secs == 0 {
            return Err(AppError::Config("audio.tone_secs must be non-zero".into()));
        }
        Url::parse(&self.intake.relay_url)
            .map_err(|e| AppError::Config(format!("intake.relay_url: {e}")))?;
        Url::parse(&self.intake.results_url)
            .map_err(|e| AppError::Config(format!("intake.results_url: {e}")))?;
        Ok(())
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_secs(self.audio.lead_in_secs)
    }

    /// Build the stimulus set this configuration describes.
    pub fn stimulus_bank(&self) -> StimulusBank {
        let frequencies: Vec<(String, f32)> = self
            .audio
            .frequencies
            .iter()
            .map(|f| (f.label.clone(), f.hz))
            .collect();
        StimulusBank::build(
            &frequencies,
            &self.audio.volumes,
            self.lead_in(),
            Duration::from_secs(self.audio.tone_secs),
        )
    }

    pub fn landing_prompt_delay(&self) -> Duration {
        Duration::from_millis(self.flow.landing_prompt_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate_and_build_the_nine_question_bank() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.stimulus_bank().len(), 9);
        assert_eq!(config.flow.landing_prompt_delay_ms, 1000);
        assert_eq!(config.intake.mode, IntakeMode::Relay);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[intake]
mode = "api"
results_url = "http://localhost:8080/results"

[flow]
landing_prompt_delay_ms = 250
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.intake.mode, IntakeMode::Api);
        assert_eq!(config.intake.results_url, "http://localhost:8080/results");
        assert_eq!(config.flow.landing_prompt_delay_ms, 250);
        // Untouched sections keep their defaults.
        assert_eq!(config.audio.lead_in_secs, 10);
        assert_eq!(config.audio.volumes, vec![0.8, 0.4, 0.2]);
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let mut config = AppConfig::default();
        config.audio.volumes = vec![0.8, 1.5];
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn bad_endpoint_url_is_rejected() {
        let mut config = AppConfig::default();
        config.intake.relay_url = "not a url".into();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}

//! Wires the configuration into a running session: playback sink selection,
//! the poll task, the submission backend and the flow controller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use otoscreen_audio::{device::DeviceSink, sim::SimulatedSink, PlaybackSink, TonePlayer};
use otoscreen_foundation::{real_clock, AppError};
use otoscreen_intake::{FormRelayBackend, ResultsApiBackend, SubmissionBackend};
use otoscreen_screening::{default_questions, SummaryStyle};
use otoscreen_telemetry::SessionMetrics;

use crate::config::{AppConfig, IntakeMode};
use crate::flow::{FlowController, LandingGate};
use crate::notify::Notifier;

pub struct RuntimeOptions {
    pub config: AppConfig,
    /// Use the clock-driven simulated sink instead of a real output device.
    pub simulate: bool,
    /// Output device override from the command line.
    pub device: Option<String>,
}

/// A fully wired session. The caller drives `flow` and `landing`; the poll
/// task runs until `shutdown`.
pub struct AppHandle {
    pub config: AppConfig,
    pub flow: FlowController,
    pub landing: LandingGate,
    pub player: Arc<TonePlayer>,
    pub backend: Arc<dyn SubmissionBackend>,
    pub metrics: Arc<SessionMetrics>,
    poller: JoinHandle<()>,
}

impl AppHandle {
    pub async fn shutdown(self) {
        self.player.shutdown();
        let _ = self.poller.await;
    }
}

/// Build the session. Must run inside a tokio runtime (spawns the poll task).
pub fn build_runtime(
    options: RuntimeOptions,
    notifier: Arc<dyn Notifier>,
) -> Result<AppHandle, AppError> {
    let config = options.config;
    config.validate()?;

    let sink: Box<dyn PlaybackSink> = if options.simulate {
        tracing::info!("Using simulated playback sink");
        Box::new(SimulatedSink::new(real_clock()))
    } else {
        let device = options
            .device
            .as_deref()
            .or(config.audio.device.as_deref());
        tracing::info!(device = device.unwrap_or("default"), "Opening output device");
        Box::new(DeviceSink::open(device)?)
    };

    let metrics = Arc::new(SessionMetrics::default());
    let player = Arc::new(TonePlayer::new(sink).with_metrics(metrics.clone()));
    let poller = player.spawn_poller();

    let backend: Arc<dyn SubmissionBackend> = match config.intake.mode {
        IntakeMode::Relay => {
            let url = Url::parse(&config.intake.relay_url)
                .map_err(|e| AppError::Config(format!("intake.relay_url: {e}")))?;
            Arc::new(FormRelayBackend::new(url))
        }
        IntakeMode::Api => {
            let url = Url::parse(&config.intake.results_url)
                .map_err(|e| AppError::Config(format!("intake.results_url: {e}")))?;
            Arc::new(ResultsApiBackend::new(url))
        }
    };
    // The relay gets semicolon-joined fields; the JSON route keeps one line
    // per answer.
    let summary_style = match config.intake.mode {
        IntakeMode::Relay => SummaryStyle::Compact,
        IntakeMode::Api => SummaryStyle::Multiline,
    };
    tracing::info!(backend = backend.id(), "Submission backend selected");

    let flow = FlowController::new(
        config.stimulus_bank(),
        default_questions().to_vec(),
        player.clone(),
        backend.clone(),
        notifier,
        metrics.clone(),
        summary_style,
    );
    let landing = LandingGate::new(real_clock(), config.landing_prompt_delay());

    Ok(AppHandle {
        config,
        flow,
        landing,
        player,
        backend,
        metrics,
        poller,
    })
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use otoscreen_app::config::AppConfig;
use otoscreen_app::notify::LogNotifier;
use otoscreen_app::runtime::{build_runtime, RuntimeOptions};
use otoscreen_app::wizard;
use otoscreen_audio::device::DeviceSink;
use otoscreen_foundation::{AppState, ShutdownHandler, StateManager};

#[derive(Parser, Debug)]
#[command(name = "otoscreen", about = "Interactive hearing self-screening flow")]
struct Cli {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long, env = "OTOSCREEN_CONFIG")]
    config: Option<PathBuf>,

    /// Output device name (overrides the config).
    #[arg(long)]
    device: Option<String>,

    /// Run with the simulated sink instead of a real output device.
    #[arg(long)]
    simulate: bool,

    /// List available output devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Drive the wizard from a script file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "otoscreen.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    // stdout belongs to the wizard; logs go to the file only.
    tracing_subscriber::fmt()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_env_filter(log_level)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().map_err(|e| anyhow::anyhow!("logging setup failed: {e}"))?;
    let cli = Cli::parse();

    if cli.list_devices {
        for name in DeviceSink::list_output_devices() {
            println!("{name}");
        }
        return Ok(());
    }

    tracing::info!("Starting otoscreen");
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let state_manager = StateManager::new();
    let shutdown = ShutdownHandler::new().install().await;

    let mut handle = match build_runtime(
        RuntimeOptions {
            config,
            simulate: cli.simulate,
            device: cli.device.clone(),
        },
        Arc::new(LogNotifier),
    ) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(strategy = ?e.recovery_strategy(), "Startup failed: {e}");
            return Err(e.into());
        }
    };

    state_manager.transition(AppState::Running)?;
    tracing::info!("Application state: {:?}", state_manager.current());

    wizard::run(&mut handle, &shutdown, cli.script.as_deref()).await?;

    state_manager.transition(AppState::Stopping)?;
    let snapshot = handle.metrics.snapshot();
    tracing::info!(?snapshot, "Session metrics at shutdown");
    handle.shutdown().await;
    state_manager.transition(AppState::Stopped)?;
    tracing::info!("Shutdown complete");
    Ok(())
}

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};

use otoscreen_foundation::PlaybackError;

use crate::asset::ToneAsset;
use crate::sink::PlaybackSink;

/// Real output-device sink.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated playback
/// thread; the sink side talks to it over a command channel and reads
/// position through shared atomics. The tone itself is synthesized in the
/// stream callback from the asset's parameters: silence over the calibration
/// lead-in, a sine at the asset frequency after it, scaled by the playback
/// volume.
pub struct DeviceSink {
    cmd_tx: Sender<SinkCmd>,
    shared: Arc<SinkShared>,
    join: Option<std::thread::JoinHandle<()>>,
}

struct SinkShared {
    sample_rate: AtomicU32,
    sample_pos: AtomicU64,
    total_samples: AtomicU64, // 0 = nothing loaded
    playing: AtomicBool,
    ended: AtomicBool,
}

enum SinkCmd {
    Load {
        asset: ToneAsset,
        volume: f32,
        reply: Sender<Result<(), PlaybackError>>,
    },
    Play {
        reply: Sender<Result<(), PlaybackError>>,
    },
    Pause {
        reply: Sender<Result<(), PlaybackError>>,
    },
    Seek(Duration),
    Unload,
    Shutdown,
}

impl DeviceSink {
    /// Open the named output device, or the host default when `None`.
    pub fn open(device_name: Option<&str>) -> Result<Self, PlaybackError> {
        let (cmd_tx, cmd_rx) = bounded::<SinkCmd>(16);
        let (ready_tx, ready_rx) = bounded::<Result<u32, PlaybackError>>(1);
        let shared = Arc::new(SinkShared {
            sample_rate: AtomicU32::new(0),
            sample_pos: AtomicU64::new(0),
            total_samples: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        });

        let name = device_name.map(str::to_owned);
        let thread_shared = Arc::clone(&shared);
        let join = std::thread::Builder::new()
            .name("tone-playback".into())
            .spawn(move || playback_thread(name, cmd_rx, ready_tx, thread_shared))
            .map_err(|e| PlaybackError::Backend(format!("spawn playback thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(rate)) => {
                shared.sample_rate.store(rate, Ordering::SeqCst);
                Ok(Self {
                    cmd_tx,
                    shared,
                    join: Some(join),
                })
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(PlaybackError::Backend("playback thread exited early".into()))
            }
        }
    }

    /// Names of the available output devices, default first.
    pub fn list_output_devices() -> Vec<String> {
        let host = cpal::default_host();
        let default_name = host
            .default_output_device()
            .and_then(|d| d.name().ok());

        let mut names = Vec::new();
        if let Some(name) = &default_name {
            names.push(name.clone());
        }
        if let Ok(devices) = host.output_devices() {
            for device in devices {
                if let Ok(name) = device.name() {
                    if Some(&name) != default_name.as_ref() {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    fn request(
        &self,
        make: impl FnOnce(Sender<Result<(), PlaybackError>>) -> SinkCmd,
    ) -> Result<(), PlaybackError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.cmd_tx
            .send(make(reply_tx))
            .map_err(|_| PlaybackError::Backend("playback thread gone".into()))?;
        reply_rx
            .recv()
            .map_err(|_| PlaybackError::Backend("playback thread gone".into()))?
    }
}

impl PlaybackSink for DeviceSink {
    fn load(&mut self, asset: &ToneAsset, volume: f32) -> Result<(), PlaybackError> {
        let asset = asset.clone();
        self.request(move |reply| SinkCmd::Load {
            asset,
            volume,
            reply,
        })
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.cmd_tx
            .send(SinkCmd::Seek(position))
            .map_err(|_| PlaybackError::Backend("playback thread gone".into()))
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.request(|reply| SinkCmd::Play { reply })
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.request(|reply| SinkCmd::Pause { reply })
    }

    fn position(&self) -> Duration {
        let rate = self.shared.sample_rate.load(Ordering::SeqCst);
        if rate == 0 {
            return Duration::ZERO;
        }
        let pos = self.shared.sample_pos.load(Ordering::SeqCst);
        Duration::from_secs_f64(pos as f64 / rate as f64)
    }

    fn duration(&self) -> Option<Duration> {
        let rate = self.shared.sample_rate.load(Ordering::SeqCst);
        let total = self.shared.total_samples.load(Ordering::SeqCst);
        if rate == 0 || total == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(total as f64 / rate as f64))
    }

    fn is_ended(&self) -> bool {
        self.shared.ended.load(Ordering::SeqCst)
    }

    fn unload(&mut self) {
        let _ = self.cmd_tx.send(SinkCmd::Unload);
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SinkCmd::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn find_output_device(name: Option<&str>) -> Result<cpal::Device, PlaybackError> {
    let host = cpal::default_host();
    match name {
        Some(wanted) => {
            if let Ok(devices) = host.output_devices() {
                for device in devices {
                    if device.name().map(|n| n == wanted).unwrap_or(false) {
                        return Ok(device);
                    }
                }
            }
            tracing::warn!(device = wanted, "Output device not found, using default");
            host.default_output_device()
                .ok_or(PlaybackError::DeviceNotFound {
                    name: Some(wanted.to_owned()),
                })
        }
        None => host
            .default_output_device()
            .ok_or(PlaybackError::DeviceNotFound { name: None }),
    }
}

fn playback_thread(
    device_name: Option<String>,
    cmd_rx: Receiver<SinkCmd>,
    ready_tx: Sender<Result<u32, PlaybackError>>,
    shared: Arc<SinkShared>,
) {
    let (device, supported) = match find_output_device(device_name.as_deref())
        .and_then(|d| {
            let cfg = d.default_output_config()?;
            Ok((d, cfg))
        }) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let rate = config.sample_rate.0;
    tracing::info!(
        device = %device.name().unwrap_or_else(|_| "<unknown>".into()),
        rate,
        ?sample_format,
        "Output device opened"
    );
    let _ = ready_tx.send(Ok(rate));

    let mut stream: Option<Stream> = None;
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            SinkCmd::Load {
                asset,
                volume,
                reply,
            } => {
                // Replace whatever was loaded; the old stream is dropped
                // before the new one exists, so no overlap is possible.
                stream = None;
                shared.sample_pos.store(0, Ordering::SeqCst);
                shared.playing.store(false, Ordering::SeqCst);
                shared.ended.store(false, Ordering::SeqCst);

                let total = (asset.duration.as_secs_f64() * rate as f64) as u64;
                let params = ToneParams {
                    frequency_hz: asset.frequency_hz,
                    lead_in_samples: (asset.lead_in.as_secs_f64() * rate as f64) as u64,
                    total_samples: total,
                    volume: volume.clamp(0.0, 1.0),
                    rate: rate as f32,
                    channels: config.channels as usize,
                };

                let built = match sample_format {
                    cpal::SampleFormat::F32 => {
                        build_tone_stream::<f32>(&device, &config, params, Arc::clone(&shared))
                    }
                    cpal::SampleFormat::I16 => {
                        build_tone_stream::<i16>(&device, &config, params, Arc::clone(&shared))
                    }
                    cpal::SampleFormat::U16 => {
                        build_tone_stream::<u16>(&device, &config, params, Arc::clone(&shared))
                    }
                    other => Err(PlaybackError::Backend(format!(
                        "unsupported sample format {other:?}"
                    ))),
                };

                let result = built.map(|s| {
                    shared.total_samples.store(total, Ordering::SeqCst);
                    stream = Some(s);
                });
                let _ = reply.send(result);
            }
            SinkCmd::Play { reply } => {
                let result = match &stream {
                    Some(s) => s.play().map_err(PlaybackError::from).map(|()| {
                        shared.playing.store(true, Ordering::SeqCst);
                    }),
                    None => Err(PlaybackError::NotLoaded),
                };
                let _ = reply.send(result);
            }
            SinkCmd::Pause { reply } => {
                shared.playing.store(false, Ordering::SeqCst);
                // Some hosts cannot pause a stream; the callback already
                // emits silence when not playing, so that is not fatal.
                if let Some(s) = &stream {
                    if let Err(e) = s.pause() {
                        tracing::debug!(error = %e, "Stream pause unsupported, relying on silence");
                    }
                }
                let _ = reply.send(Ok(()));
            }
            SinkCmd::Seek(position) => {
                let total = shared.total_samples.load(Ordering::SeqCst);
                let pos = ((position.as_secs_f64() * rate as f64) as u64).min(total);
                shared.sample_pos.store(pos, Ordering::SeqCst);
                if total == 0 || pos < total {
                    shared.ended.store(false, Ordering::SeqCst);
                }
            }
            SinkCmd::Unload => {
                stream = None;
                shared.playing.store(false, Ordering::SeqCst);
                shared.ended.store(false, Ordering::SeqCst);
                shared.sample_pos.store(0, Ordering::SeqCst);
                shared.total_samples.store(0, Ordering::SeqCst);
            }
            SinkCmd::Shutdown => break,
        }
    }
    tracing::debug!("Playback thread stopped");
}

#[derive(Clone, Copy)]
struct ToneParams {
    frequency_hz: f32,
    lead_in_samples: u64,
    total_samples: u64,
    volume: f32,
    rate: f32,
    channels: usize,
}

fn build_tone_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    params: ToneParams,
    shared: Arc<SinkShared>,
) -> Result<Stream, PlaybackError>
where
    T: SizedSample + FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            for frame in data.chunks_mut(params.channels) {
                let value = next_sample(&params, &shared);
                let sample = T::from_sample(value);
                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
        },
        |e| tracing::error!(error = %e, "Output stream error"),
        None,
    )?;
    // Loaded tones start paused; play() is explicit.
    if let Err(e) = stream.pause() {
        tracing::debug!(error = %e, "Stream pause unsupported at load");
    }
    Ok(stream)
}

fn next_sample(params: &ToneParams, shared: &SinkShared) -> f32 {
    if !shared.playing.load(Ordering::Relaxed) {
        return 0.0;
    }
    let n = shared.sample_pos.fetch_add(1, Ordering::Relaxed);
    if n >= params.total_samples {
        shared.ended.store(true, Ordering::Relaxed);
        shared.playing.store(false, Ordering::Relaxed);
        return 0.0;
    }
    if n < params.lead_in_samples {
        return 0.0;
    }
    let t = n as f32 / params.rate;
    (TAU * params.frequency_hz * t).sin() * params.volume
}

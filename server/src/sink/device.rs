//! Playback through the default output device using cpal.
//! Resamples from the clip rate to the device rate when they differ.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig};
use pcm_core::AudioBuffer;
use rubato::{FftFixedIn, Resampler};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::{AudioSink, EndedCallback, Playback, PreparedClip};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Opens the default output device for every clip.
///
/// cpal streams cannot cross threads on every platform, so each clip
/// gets its own thread that resamples, builds the stream and owns it
/// until the clip ends or the handle stops it.
pub struct DeviceSink {
    device_name: String,
}

impl DeviceSink {
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .context("no output device available")?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        info!(device = %device_name, "using audio output device");
        Ok(Self { device_name })
    }
}

enum Command {
    Start(EndedCallback),
    Stop,
}

/// Stream is built and paused on its own thread.
struct DeviceClip {
    commands: mpsc::Sender<Command>,
    started: Arc<AtomicBool>,
}

struct DevicePlayback {
    commands: Option<mpsc::Sender<Command>>,
}

impl Playback for DevicePlayback {
    fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Stop);
        }
    }
}

#[async_trait]
impl AudioSink for DeviceSink {
    async fn prepare(&self, buffer: AudioBuffer) -> Result<Box<dyn PreparedClip>> {
        let (commands, command_rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let started = Arc::new(AtomicBool::new(false));
        debug!(device = %self.device_name, frames = buffer.frames(), "preparing device playback");

        let gate = started.clone();
        std::thread::Builder::new()
            .name("audio-out".to_string())
            .spawn(move || {
                let finished = Arc::new(AtomicBool::new(false));
                let stream = match open_stream(&buffer, gate, finished.clone()) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_stream(stream, finished, command_rx);
            })
            .context("failed to spawn audio thread")?;

        ready_rx
            .await
            .context("audio thread exited before the stream was ready")??;

        Ok(Box::new(DeviceClip { commands, started }))
    }
}

impl PreparedClip for DeviceClip {
    fn start(self: Box<Self>, on_ended: EndedCallback) -> Result<Box<dyn Playback>> {
        let DeviceClip { commands, started } = *self;
        commands
            .send(Command::Start(on_ended))
            .map_err(|_| anyhow::anyhow!("audio thread is gone"))?;
        started.store(true, Ordering::SeqCst);
        // dropping the sender also stops the thread
        Ok(Box::new(DevicePlayback {
            commands: Some(commands),
        }))
    }
}

/// Owns `stream` until the clip ends, is stopped, or is dropped unstarted.
fn run_stream(stream: Stream, finished: Arc<AtomicBool>, commands: mpsc::Receiver<Command>) {
    let on_ended = match commands.recv() {
        Ok(Command::Start(on_ended)) => on_ended,
        Ok(Command::Stop) | Err(_) => return,
    };
    if let Err(e) = stream.play() {
        error!(error = ?e, "failed to start playback stream");
        drop(stream);
        on_ended();
        return;
    }

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return,
            Ok(Command::Start(_)) => {}
            Err(RecvTimeoutError::Timeout) => {
                if finished.load(Ordering::SeqCst) {
                    drop(stream);
                    on_ended();
                    return;
                }
            }
        }
    }
}

fn open_stream(
    buffer: &AudioBuffer,
    started: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
) -> Result<Stream> {
    let device = cpal::default_host()
        .default_output_device()
        .context("no output device available")?;
    let supported: SupportedStreamConfig = device
        .default_output_config()
        .context("failed to get default output config")?;

    let native_rate = supported.sample_rate().0;
    let native_channels = supported.channels() as usize;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let resampled = resample(buffer, native_rate)?;
    let samples = Arc::new(interleave_for_device(&resampled, native_channels));
    let position = Arc::new(AtomicUsize::new(0));

    let stream = match sample_format {
        SampleFormat::F32 => {
            build_stream::<f32>(&device, &config, samples, position, started, finished)?
        }
        SampleFormat::I16 => {
            build_stream::<i16>(&device, &config, samples, position, started, finished)?
        }
        SampleFormat::U16 => {
            build_stream::<u16>(&device, &config, samples, position, started, finished)?
        }
        format => anyhow::bail!("unsupported sample format: {:?}", format),
    };

    // Some hosts run a stream as soon as it is built; `started` keeps it
    // silent until the clip is started.
    let _ = stream.pause();
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Arc<Vec<f32>>,
    position: Arc<AtomicUsize>,
    started: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let silence = T::from_sample(0.0f32);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !started.load(Ordering::SeqCst) {
                    data.fill(silence);
                    return;
                }
                let pos = position.load(Ordering::SeqCst);
                let remaining = samples.len().saturating_sub(pos);

                if remaining == 0 {
                    data.fill(silence);
                    finished.store(true, Ordering::SeqCst);
                    return;
                }

                let to_copy = remaining.min(data.len());
                for (out, &sample) in data.iter_mut().zip(&samples[pos..pos + to_copy]) {
                    *out = T::from_sample(sample);
                }
                if to_copy < data.len() {
                    data[to_copy..].fill(silence);
                }

                position.store(pos + to_copy, Ordering::SeqCst);
            },
            move |err| {
                error!(error = ?err, "playback stream error");
            },
            None,
        )
        .context("failed to build output stream")
}

/// Resample every channel of `buffer` to `target_rate`.
fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<Vec<Vec<f32>>> {
    let channels: Vec<Vec<f32>> = (0..buffer.num_channels())
        .map(|c| buffer.channel_data(c).to_vec())
        .collect();
    if buffer.sample_rate() == target_rate || buffer.is_empty() {
        return Ok(channels);
    }

    let chunk_size = 1024;
    let mut resampler = FftFixedIn::<f32>::new(
        buffer.sample_rate() as usize,
        target_rate as usize,
        chunk_size,
        2,
        channels.len(),
    )
    .context("failed to create resampler")?;

    let mut output = vec![Vec::new(); channels.len()];
    let mut pos = 0;
    let total = buffer.frames();

    while pos < total {
        let frames_needed = resampler.input_frames_next();
        let end = (pos + frames_needed).min(total);

        let input: Vec<Vec<f32>> = channels
            .iter()
            .map(|channel| {
                let mut chunk = channel[pos..end].to_vec();
                chunk.resize(frames_needed, 0.0);
                chunk
            })
            .collect();

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| anyhow::anyhow!("resampling failed: {:?}", e))?;
        for (out, chunk) in output.iter_mut().zip(resampled) {
            out.extend(chunk);
        }

        pos = end;
    }

    Ok(output)
}

/// Interleave for a device with `device_channels` outputs. Mono is
/// copied to every output; otherwise channels wrap around.
fn interleave_for_device(channels: &[Vec<f32>], device_channels: usize) -> Vec<f32> {
    let frames = channels.first().map(Vec::len).unwrap_or(0);
    let mut out = Vec::with_capacity(frames * device_channels);
    for i in 0..frames {
        for c in 0..device_channels {
            out.push(channels[c % channels.len()][i]);
        }
    }
    out
}

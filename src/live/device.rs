//! Speaker and microphone backed by cpal.
//!
//! cpal streams are not `Send` on every platform, so each stream lives on a
//! dedicated thread that holds it until stopped. The playback side mixes
//! scheduled sources against a frame clock advanced by the output callback.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::error::{AssistantError, Result};

use super::capture::{CaptureDevice, CaptureHandle, FrameChunker, FrameSender};
use super::playback::{AudioOutput, SourceId};

struct Voice {
    id: SourceId,
    start_frame: u64,
    samples: Vec<f32>,
    pos: usize,
}

#[derive(Default)]
struct Mixer {
    rate: u32,
    clock: u64,
    next_id: SourceId,
    voices: Vec<Voice>,
    finished: Vec<SourceId>,
}

impl Mixer {
    fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let mut acc = 0.0f32;
            for voice in &mut self.voices {
                if self.clock >= voice.start_frame && voice.pos < voice.samples.len() {
                    acc += voice.samples[voice.pos];
                    voice.pos += 1;
                }
            }
            frame.fill(acc.clamp(-1.0, 1.0));
            self.clock += 1;
        }
        let finished = &mut self.finished;
        self.voices.retain(|voice| {
            let done = voice.pos >= voice.samples.len();
            if done {
                finished.push(voice.id);
            }
            !done
        });
    }
}

/// Default output device.
pub struct CpalOutput {
    mixer: Arc<Mutex<Mixer>>,
    stop_tx: std_mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the default output device at its native rate.
    ///
    /// # Errors
    ///
    /// [`AssistantError::AudioError`] if no device is available or the
    /// stream cannot start.
    pub fn open_default() -> Result<Self> {
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread_mixer = Arc::clone(&mixer);
        let thread = std::thread::Builder::new()
            .name("storefront-playback".into())
            .spawn(move || match build_output_stream(thread_mixer) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AssistantError::AudioError(format!("cannot spawn playback thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| AssistantError::AudioError("playback thread exited during setup".into()))??;

        Ok(Self {
            mixer,
            stop_tx,
            thread: Some(thread),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl AudioOutput for CpalOutput {
    fn current_time(&self) -> f64 {
        let mixer = self.lock();
        if mixer.rate == 0 {
            return 0.0;
        }
        mixer.clock as f64 / f64::from(mixer.rate)
    }

    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> Result<SourceId> {
        let mut mixer = self.lock();
        let samples = resample(&samples, sample_rate, mixer.rate);
        mixer.next_id += 1;
        let id = mixer.next_id;
        let start_frame = (start_at.max(0.0) * f64::from(mixer.rate)).round() as u64;
        mixer.voices.push(Voice {
            id,
            start_frame,
            samples,
            pos: 0,
        });
        Ok(id)
    }

    fn stop(&self, id: SourceId) {
        self.lock().voices.retain(|voice| voice.id != id);
    }

    fn drain_finished(&self) -> Vec<SourceId> {
        std::mem::take(&mut self.lock().finished)
    }
}

fn build_output_stream(mixer: Arc<Mutex<Mixer>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AssistantError::AudioError("no default output device".into()))?;
    let default_config = device
        .default_output_config()
        .map_err(|e| AssistantError::AudioError(format!("no default output config: {e}")))?;

    let rate = default_config.sample_rate();
    let channels = default_config.channels();
    let stream_config = StreamConfig {
        channels,
        sample_rate: rate,
        buffer_size: cpal::BufferSize::Default,
    };
    mixer.lock().unwrap_or_else(|e| e.into_inner()).rate = rate;

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut mixer = match mixer.lock() {
                    Ok(m) => m,
                    Err(_) => return,
                };
                mixer.render(data, usize::from(channels));
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AssistantError::AudioError(format!("failed to build output stream: {e}")))?;
    stream
        .play()
        .map_err(|e| AssistantError::AudioError(format!("failed to start output stream: {e}")))?;

    info!("playback started: {rate}Hz, {channels} channels");
    Ok(stream)
}

/// Default input device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCapture;

struct CpalCaptureHandle {
    stop_tx: std_mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle for CpalCaptureHandle {
    fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalCaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CaptureDevice for CpalCapture {
    fn open(&self, sample_rate: u32, frame_size: usize, frames: FrameSender) -> Result<Box<dyn CaptureHandle>> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("storefront-capture".into())
            .spawn(move || match build_input_stream(sample_rate, frame_size, frames) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    let _ = stop_rx.recv();
                    drop(stream);
                    info!("audio capture stopped");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AssistantError::AudioError(format!("cannot spawn capture thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| AssistantError::AudioError("capture thread exited during setup".into()))??;

        Ok(Box::new(CpalCaptureHandle {
            stop_tx,
            thread: Some(thread),
        }))
    }
}

fn build_input_stream(target_rate: u32, frame_size: usize, frames: FrameSender) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AssistantError::AudioError("no default input device".into()))?;
    let default_config = device
        .default_input_config()
        .map_err(|e| AssistantError::AudioError(format!("no default input config: {e}")))?;

    let native_rate = default_config.sample_rate();
    let native_channels = default_config.channels();
    let stream_config = StreamConfig {
        channels: native_channels,
        sample_rate: native_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let mut chunker = FrameChunker::new(frame_size);
    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = if native_channels > 1 {
                    to_mono(data, native_channels)
                } else {
                    data.to_vec()
                };
                let samples = resample(&mono, native_rate, target_rate);
                for frame in chunker.push(&samples) {
                    // Receiver gone means recording stopped.
                    let _ = frames.send(frame);
                }
            },
            move |err| {
                error!("audio input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AssistantError::AudioError(format!("failed to build input stream: {e}")))?;
    stream
        .play()
        .map_err(|e| AssistantError::AudioError(format!("failed to start input stream: {e}")))?;

    info!("audio capture started: native {native_rate}Hz -> target {target_rate}Hz");
    Ok(stream)
}

fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    let ch = usize::from(channels);
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear-interpolation resampler, either direction.
fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || src_rate == 0 || dst_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(src_rate) / f64::from(dst_rate);
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            f64::from(samples[idx]) * (1.0 - frac) + f64::from(samples[idx + 1]) * frac
        } else {
            f64::from(samples[idx.min(samples.len() - 1)])
        };
        output.push(sample as f32);
    }
    output
}

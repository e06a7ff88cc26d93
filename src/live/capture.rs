//! Microphone capture seam and the recorder that owns the active handle.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::error::Result;

/// Fixed-size mono frames at the requested rate.
pub type FrameSender = mpsc::UnboundedSender<Vec<f32>>;

/// Something that can open a microphone stream.
pub trait CaptureDevice: Send + Sync {
    /// Start delivering frames of exactly `frame_size` samples at
    /// `sample_rate` until the returned handle is stopped.
    fn open(&self, sample_rate: u32, frame_size: usize, frames: FrameSender) -> Result<Box<dyn CaptureHandle>>;
}

/// A running capture stream.
pub trait CaptureHandle: Send {
    /// Stop capturing and release the device.
    fn stop(&mut self);
}

/// Starts and stops capture; at most one stream is open at a time.
pub struct Recorder {
    device: Arc<dyn CaptureDevice>,
    sample_rate: u32,
    frame_size: usize,
    handle: Mutex<Option<Box<dyn CaptureHandle>>>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("sample_rate", &self.sample_rate)
            .field("frame_size", &self.frame_size)
            .field("recording", &self.is_recording())
            .finish()
    }
}

impl Recorder {
    pub fn new(device: Arc<dyn CaptureDevice>, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            device,
            sample_rate,
            frame_size,
            handle: Mutex::new(None),
        }
    }

    /// Start capturing into `frames`.
    ///
    /// Returns `false` without touching the device when already recording.
    ///
    /// # Errors
    ///
    /// Propagates device errors.
    pub fn start(&self, frames: FrameSender) -> Result<bool> {
        let mut handle = self.lock();
        if handle.is_some() {
            tracing::debug!("start ignored: already recording");
            return Ok(false);
        }
        *handle = Some(self.device.open(self.sample_rate, self.frame_size, frames)?);
        tracing::info!(sample_rate = self.sample_rate, frame_size = self.frame_size, "recording started");
        Ok(true)
    }

    /// Stop capturing. Returns `false` when nothing was recording.
    pub fn stop(&self) -> bool {
        let Some(mut handle) = self.lock().take() else {
            return false;
        };
        handle.stop();
        tracing::info!("recording stopped");
        true
    }

    pub fn is_recording(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn CaptureHandle>>> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Regroups arbitrarily sized device buffers into fixed-size frames.
#[derive(Debug)]
pub struct FrameChunker {
    frame_size: usize,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    /// Returns every frame completed by `samples`.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_size {
            let rest = self.pending.split_off(self.frame_size);
            frames.push(std::mem::replace(&mut self.pending, rest));
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDevice {
        opened: AtomicUsize,
        stopped: Arc<AtomicUsize>,
    }

    struct CountingHandle {
        stopped: Arc<AtomicUsize>,
    }

    impl CaptureHandle for CountingHandle {
        fn stop(&mut self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CaptureDevice for CountingDevice {
        fn open(&self, _rate: u32, frame_size: usize, frames: FrameSender) -> Result<Box<dyn CaptureHandle>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            frames.send(vec![0.0; frame_size]).ok();
            Ok(Box::new(CountingHandle {
                stopped: Arc::clone(&self.stopped),
            }))
        }
    }

    #[test]
    fn start_while_recording_is_noop() {
        let device = Arc::new(CountingDevice::default());
        let recorder = Recorder::new(device.clone(), 16_000, 4);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(recorder.start(tx.clone()).unwrap());
        assert!(!recorder.start(tx).unwrap());
        assert_eq!(device.opened.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_recv().unwrap().len(), 4);

        assert!(recorder.stop());
        assert!(!recorder.stop());
        assert_eq!(device.stopped.load(Ordering::SeqCst), 1);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn chunker_emits_fixed_frames() {
        let mut chunker = FrameChunker::new(4);
        assert!(chunker.push(&[1.0, 2.0, 3.0]).is_empty());
        let frames = chunker.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(frames, vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]);
        assert!(chunker.push(&[10.0, 11.0]).is_empty());
        assert_eq!(chunker.push(&[12.0]), vec![vec![9.0, 10.0, 11.0, 12.0]]);
    }
}

//! Gapless playback scheduling for streamed audio chunks.
//!
//! Each chunk starts at `max(next_start_time, output.current_time())` and
//! pushes the cursor to `start + duration`, so chunks play back to back even
//! when they arrive early. An interruption stops every scheduled source and
//! resets the cursor to zero.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;

/// Handle of one scheduled chunk.
pub type SourceId = u64;

/// An audio sink with its own clock.
pub trait AudioOutput: Send + Sync {
    /// Output clock in seconds.
    fn current_time(&self) -> f64;

    /// Schedule mono `samples` at `sample_rate` to start at `start_at`
    /// seconds on the output clock.
    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> Result<SourceId>;

    /// Stop a source. Unknown or finished ids are ignored.
    fn stop(&self, id: SourceId);

    /// Sources that finished since the last call.
    fn drain_finished(&self) -> Vec<SourceId> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
struct State {
    next_start_time: f64,
    sources: HashSet<SourceId>,
}

/// Orders incoming chunks on an [`AudioOutput`].
pub struct PlaybackScheduler {
    output: Arc<dyn AudioOutput>,
    state: Mutex<State>,
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PlaybackScheduler")
            .field("next_start_time", &state.next_start_time)
            .field("sources", &state.sources.len())
            .finish()
    }
}

impl PlaybackScheduler {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            state: Mutex::new(State::default()),
        }
    }

    /// Schedule a chunk after everything already queued.
    ///
    /// Empty chunks are skipped and return `None`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`AudioOutput::schedule`]; the cursor is left
    /// unchanged.
    pub fn enqueue(&self, samples: Vec<f32>, sample_rate: u32) -> Result<Option<SourceId>> {
        if samples.is_empty() || sample_rate == 0 {
            return Ok(None);
        }
        self.reap();
        let duration = samples.len() as f64 / f64::from(sample_rate);

        let mut state = self.lock();
        let start = state.next_start_time.max(self.output.current_time());
        let id = self.output.schedule(samples, sample_rate, start)?;
        state.next_start_time = start + duration;
        state.sources.insert(id);
        Ok(Some(id))
    }

    /// Forget a source that finished playing.
    pub fn on_complete(&self, id: SourceId) {
        self.lock().sources.remove(&id);
    }

    /// Stop all scheduled sources and reset the cursor.
    pub fn interrupt(&self) {
        let stopped: Vec<SourceId> = {
            let mut state = self.lock();
            state.next_start_time = 0.0;
            state.sources.drain().collect()
        };
        for id in &stopped {
            self.output.stop(*id);
        }
        tracing::debug!(stopped = stopped.len(), "playback interrupted");
    }

    pub fn next_start_time(&self) -> f64 {
        self.lock().next_start_time
    }

    /// Number of sources scheduled and not yet finished.
    pub fn active_sources(&self) -> usize {
        self.reap();
        self.lock().sources.len()
    }

    fn reap(&self) {
        let finished = self.output.drain_finished();
        if finished.is_empty() {
            return;
        }
        let mut state = self.lock();
        for id in finished {
            state.sources.remove(&id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

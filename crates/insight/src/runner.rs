//! Drives one logical analysis across a bounded number of attempts
//!
//! Each attempt opens a fresh stream, feeds chunks into its own buffer and
//! pushes changed results to the sink immediately. Terminal failures (stream
//! error, timeout, buffer overflow, or completion with no usable result)
//! burn a retry with a simplified prompt; exhausting the budget surfaces an
//! explicit failure through the sink, never an error past the boundary.

use crate::streaming::{
    create_processor, AnalysisMode, AnalysisOutcome, AnalysisSink, AnalysisUpdate, ChunkBuffer,
};
use anyhow::Result;
use llm::{CompletionRequest, StreamSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Extra attempts after the first, each with the simplified prompt
pub const MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub attempt_timeout: Duration,
    pub buffer_cap: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_backoff: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
            buffer_cap: crate::streaming::DEFAULT_BUFFER_CAP,
        }
    }
}

/// Shared token that disarms an attempt once it has been superseded
///
/// Checked before every sink write, so late chunks of a cancelled attempt
/// can never reach the consumer. Cancellation is advisory: the underlying
/// stream is not forcibly closed.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptState {
    Running,
    Retrying,
    Succeeded,
    Failed,
    Cancelled,
}

/// One try at the stream-and-extract cycle
struct Attempt {
    number: u32,
    buffer: ChunkBuffer,
    state: AttemptState,
    started_at: Instant,
}

impl Attempt {
    fn new(number: u32, buffer_cap: usize) -> Self {
        Self {
            number,
            buffer: ChunkBuffer::with_cap(buffer_cap),
            state: AttemptState::Running,
            started_at: Instant::now(),
        }
    }

    fn transition(&mut self, next: AttemptState) {
        debug!(
            "Attempt {}: {:?} -> {:?} after {:?}",
            self.number,
            self.state,
            next,
            self.started_at.elapsed()
        );
        self.state = next;
    }
}

/// Clears the busy flag on every exit path, including task abort
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AnalysisRunner {
    source: Arc<dyn StreamSource>,
    config: RunnerConfig,
    busy: Arc<AtomicBool>,
}

impl AnalysisRunner {
    pub fn new(source: Arc<dyn StreamSource>, config: RunnerConfig) -> Self {
        Self {
            source,
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a logical run is currently live
    pub fn is_analyzing(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Run unless another logical run is already live; returns whether the
    /// run was started. Superseding an in-flight run goes through
    /// cancellation first (see `DebouncedAnalyzer`).
    pub async fn try_run(
        &self,
        build_prompt: &(dyn Fn(u32) -> CompletionRequest + Send + Sync),
        mode: AnalysisMode,
        sink: Arc<dyn AnalysisSink>,
        cancel: CancellationToken,
    ) -> bool {
        // The guard must be taken before the first await so overlapping
        // invocations on one runner cannot interleave.
        if self.busy.swap(true, Ordering::SeqCst) {
            warn!("Analysis already running, ignoring trigger");
            return false;
        }
        let _guard = BusyGuard(self.busy.clone());

        self.run_to_completion(build_prompt, mode, sink, cancel)
            .await;
        true
    }

    async fn run_to_completion(
        &self,
        build_prompt: &(dyn Fn(u32) -> CompletionRequest + Send + Sync),
        mode: AnalysisMode,
        sink: Arc<dyn AnalysisSink>,
        cancel: CancellationToken,
    ) {
        let mut attempt_number = 0;

        loop {
            let request = build_prompt(attempt_number);
            let mut attempt = Attempt::new(attempt_number, self.config.buffer_cap);
            info!(
                "Starting analysis attempt {}/{}",
                attempt_number + 1,
                self.config.max_retries + 1
            );

            let result = self
                .run_attempt(&mut attempt, &request, mode, &*sink, &cancel)
                .await;

            if cancel.is_cancelled() {
                attempt.transition(AttemptState::Cancelled);
                debug!("Run superseded, discarding attempt {}", attempt_number);
                return;
            }

            match result {
                Ok(Some(update)) => {
                    attempt.transition(AttemptState::Succeeded);
                    self.deliver_final(&*sink, &cancel, AnalysisOutcome::Completed(update));
                    return;
                }
                Ok(None) => warn!(
                    "Attempt {} completed without a usable result ({} bytes buffered)",
                    attempt_number,
                    attempt.buffer.len()
                ),
                Err(e) => warn!("Attempt {} stream failure: {e:#}", attempt_number),
            }

            if attempt_number < self.config.max_retries {
                attempt.transition(AttemptState::Retrying);
                tokio::time::sleep(self.config.retry_backoff).await;
                attempt_number += 1;
            } else {
                attempt.transition(AttemptState::Failed);
                self.deliver_final(&*sink, &cancel, AnalysisOutcome::Failed);
                return;
            }
        }
    }

    /// Ok(Some) = clean completion with a result, Ok(None) = clean completion
    /// without one, Err = stream error / timeout / buffer overflow.
    async fn run_attempt(
        &self,
        attempt: &mut Attempt,
        request: &CompletionRequest,
        mode: AnalysisMode,
        sink: &dyn AnalysisSink,
        cancel: &CancellationToken,
    ) -> Result<Option<AnalysisUpdate>> {
        let mut processor = create_processor(mode);
        // The deadline covers the whole attempt, opening included
        let deadline = Instant::now() + self.config.attempt_timeout;

        let mut stream =
            match tokio::time::timeout_at(deadline, self.source.open_stream(request)).await {
                Err(_) => anyhow::bail!(
                    "Opening the stream timed out after {:?}",
                    self.config.attempt_timeout
                ),
                Ok(stream) => stream?,
            };

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let chunk = match tokio::time::timeout_at(deadline, stream.next_chunk()).await {
                Err(_) => anyhow::bail!(
                    "Attempt timed out after {:?}",
                    self.config.attempt_timeout
                ),
                Ok(next) => next?,
            };

            match chunk {
                Some(chunk) => {
                    attempt.buffer.append(&chunk)?;
                    if let Some(update) = processor.inspect(attempt.buffer.snapshot()) {
                        self.deliver_partial(sink, cancel, &update);
                    }
                }
                None => {
                    return Ok(processor.finish(attempt.buffer.snapshot()));
                }
            }
        }
    }

    fn deliver_partial(
        &self,
        sink: &dyn AnalysisSink,
        cancel: &CancellationToken,
        update: &AnalysisUpdate,
    ) {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = sink.on_partial(update) {
            warn!("Sink rejected partial update: {e}");
        }
    }

    fn deliver_final(
        &self,
        sink: &dyn AnalysisSink,
        cancel: &CancellationToken,
        outcome: AnalysisOutcome,
    ) {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = sink.on_final(&outcome) {
            warn!("Sink rejected final outcome: {e}");
        }
    }
}

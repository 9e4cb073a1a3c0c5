//! Debounced trigger coalescing bursts of transcript changes into one run
//!
//! Each analyzer instance owns its own timer generation and live-run state,
//! so independent analyzers can coexist without cross-talk. Only the newest
//! trigger inside the debounce window survives; starting a run cancels the
//! attempt it supersedes, and at most one attempt's output ever reaches the
//! sink.

use crate::prompts;
use crate::runner::{AnalysisRunner, CancellationToken, RunnerConfig};
use crate::streaming::{AnalysisMode, AnalysisSink};
use llm::{Message, StreamSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub debounce: Duration,
    pub runner: RunnerConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            runner: RunnerConfig::default(),
        }
    }
}

struct LiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    runner: Arc<AnalysisRunner>,
    sink: Arc<dyn AnalysisSink>,
    debounce: Duration,
    generation: AtomicU64,
    live: tokio::sync::Mutex<Option<LiveRun>>,
}

/// Watches transcript updates and schedules a structured analysis run once
/// the transcript has been quiescent for the debounce interval
pub struct DebouncedAnalyzer {
    inner: Arc<Inner>,
}

impl DebouncedAnalyzer {
    pub fn new(
        source: Arc<dyn StreamSource>,
        sink: Arc<dyn AnalysisSink>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner: Arc::new(AnalysisRunner::new(source, config.runner)),
                sink,
                debounce: config.debounce,
                generation: AtomicU64::new(0),
                live: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Notify the analyzer that the transcript changed
    ///
    /// Resets the debounce timer; when it elapses with no newer notification,
    /// any in-flight run is cancelled and a fresh one starts with this
    /// transcript snapshot.
    pub fn notify(&self, transcript: Vec<Message>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();

        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;

            if inner.generation.load(Ordering::SeqCst) != generation {
                // A newer notification restarted the window
                return;
            }

            debug!(
                "Debounce window elapsed for generation {}, starting analysis",
                generation
            );
            Inner::start_run(inner, transcript).await;
        });
    }

    /// Whether an analysis run is currently live
    pub fn is_analyzing(&self) -> bool {
        self.inner.runner.is_analyzing()
    }

    /// Cancel any pending or in-flight run without starting a new one
    pub async fn shutdown(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.inner.live.lock().await.take();
        if let Some(run) = previous {
            run.cancel.cancel();
            run.handle.abort();
            let _ = run.handle.await;
        }
    }
}

impl Inner {
    async fn start_run(inner: Arc<Inner>, transcript: Vec<Message>) {
        // The lock is held from taking the superseded run until the new one
        // is stored, so interleaved starts cannot leave a stale LiveRun
        // behind. Disarm the old attempt and wait for its task to wind down
        // so the busy guard has been released before the replacement starts.
        let mut live = inner.live.lock().await;
        if let Some(run) = live.take() {
            run.cancel.cancel();
            run.handle.abort();
            let _ = run.handle.await;
        }

        let cancel = CancellationToken::new();
        let runner = inner.runner.clone();
        let sink = inner.sink.clone();
        let run_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let build_prompt =
                move |attempt: u32| prompts::analysis_request(&transcript, attempt);
            runner
                .try_run(&build_prompt, AnalysisMode::Structured, sink, run_cancel)
                .await;
        });

        *live = Some(LiveRun { cancel, handle });
    }
}

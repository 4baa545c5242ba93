//! Run orchestration.
//!
//! The [`Orchestrator`] owns everything that outlives a single run: the
//! lookup implementation, the domain list, the run history and the
//! `Idle`/`Running` state. A run fans out one probe runner per selected
//! provider, waits for all of them, ranks the results and publishes the
//! report.

#![allow(clippy::missing_errors_doc)]

use crate::dns::history::RunHistory;
use crate::dns::probe::{ProbeRunner, ProbeTally, ProgressFn};
use crate::dns::resolver::Lookup;
use crate::dns::sink::ResultSink;
use crate::dns::types::{Latency, Provider, ProviderResult, RunConfig, RunReport};
use crate::error::{Error, Result};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Status shown when a run finishes.
pub const STATUS_COMPLETED: &str = "Testing completed";

/// Status shown when a run starts.
pub const STATUS_TESTING: &str = "Testing DNS servers...";

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Ready to accept a run
    Idle,
    /// A run is in progress
    Running,
}

/// Fans out probes, ranks providers and records history.
///
/// Cloning is cheap and every clone shares the same state, history and
/// cancellation token.
#[derive(Clone)]
pub struct Orchestrator {
    lookup: Arc<dyn Lookup>,
    domains: Arc<[String]>,
    running: Arc<AtomicBool>,
    history: Arc<Mutex<RunHistory>>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl Orchestrator {
    /// Create an orchestrator probing `domains` through `lookup`.
    pub fn new(lookup: Arc<dyn Lookup>, domains: Vec<String>) -> Self {
        Self::with_history(lookup, domains, RunHistory::new())
    }

    pub fn with_history(lookup: Arc<dyn Lookup>, domains: Vec<String>, history: RunHistory) -> Self {
        Self {
            lookup,
            domains: domains.into(),
            running: Arc::new(AtomicBool::new(false)),
            history: Arc::new(Mutex::new(history)),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        if self.running.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Probes a run over `provider_count` providers will perform.
    #[must_use]
    pub fn total_tests(&self, provider_count: usize, config: &RunConfig) -> usize {
        provider_count * config.probes_per_provider(self.domains.len())
    }

    /// Snapshot of the run history, oldest first.
    #[must_use]
    pub fn history(&self) -> RunHistory {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Cancel every probe of the run in progress.
    ///
    /// Cancelled probes count as failures; the run still completes and is
    /// recorded. The next run gets a fresh token.
    pub fn cancel(&self) {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner).cancel();
    }

    /// Start a run in the background and return immediately.
    ///
    /// The empty-selection and already-running checks happen before this
    /// returns, so callers learn about them synchronously.
    pub fn start(
        &self,
        selected: Vec<Provider>,
        config: RunConfig,
        sink: Arc<dyn ResultSink>,
    ) -> Result<JoinHandle<RunReport>> {
        let guard = self.begin(&selected, &config, sink.as_ref())?;
        let this = self.clone();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            this.execute(selected, config, sink).await
        }))
    }

    /// Run every selected provider to completion and return the ranked
    /// report.
    pub async fn run_all(
        &self,
        selected: Vec<Provider>,
        config: RunConfig,
        sink: Arc<dyn ResultSink>,
    ) -> Result<RunReport> {
        let _guard = self.begin(&selected, &config, sink.as_ref())?;
        Ok(self.execute(selected, config, sink).await)
    }

    /// Validate the request and move from `Idle` to `Running`.
    fn begin(&self, selected: &[Provider], config: &RunConfig, sink: &dyn ResultSink) -> Result<RunGuard> {
        if selected.is_empty() {
            let err = Error::NoProviders;
            sink.status(&err.to_string());
            return Err(err);
        }
        if let Err(err) = config.validate() {
            sink.status(&err.to_string());
            return Err(err);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Ignoring run request while a run is in progress");
            return Err(Error::AlreadyRunning);
        }

        let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            *cancel = CancellationToken::new();
        }

        Ok(RunGuard {
            running: Arc::clone(&self.running),
        })
    }

    async fn execute(&self, selected: Vec<Provider>, config: RunConfig, sink: Arc<dyn ResultSink>) -> RunReport {
        let timestamp = Local::now();
        let total = self.total_tests(selected.len(), &config);
        let per_provider = config.probes_per_provider(self.domains.len());
        let cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner).clone();

        tracing::info!(
            "Starting run: {} providers, {} domains, {} probes ({}, {}, {})",
            selected.len(),
            self.domains.len(),
            total,
            config.transport,
            config.family,
            if config.parallel { "parallel" } else { "sequential" }
        );
        sink.status(STATUS_TESTING);
        sink.run_started(total);

        let done = Arc::new(Mutex::new(0usize));
        let mut handles = Vec::with_capacity(selected.len());

        for provider in &selected {
            let runner = ProbeRunner::new(Arc::clone(&self.lookup), Arc::clone(&self.domains), cancel.clone());
            let on_progress = progress_callback(Arc::clone(&done), total, Arc::clone(&sink));
            let provider = provider.clone();

            handles.push(tokio::spawn(async move {
                runner.run(&provider, &config, on_progress).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (provider, joined) in selected.into_iter().zip(futures::future::join_all(handles).await) {
            // A selected provider always appears in the report.
            let tally = joined.unwrap_or_else(|e| {
                tracing::warn!("Provider task for {} failed: {e}", provider.name);
                ProbeTally {
                    latency: Latency::Failed,
                    success_count: 0,
                    total_probes: per_provider,
                }
            });
            results.push(ProviderResult {
                address: provider.address(config.family),
                provider,
                latency: tally.latency,
                timeout: config.timeout,
                success_count: tally.success_count,
                total_probes: tally.total_probes,
                timestamp,
            });
        }

        rank(&mut results);
        debug_assert!(results.iter().all(|r| r.total_probes == per_provider));

        let report = RunReport {
            timestamp,
            config,
            results,
        };

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(report.clone());

        tracing::info!(
            "Run finished: {}/{} providers answered",
            report.results.iter().filter(|r| r.success()).count(),
            report.results.len()
        );
        sink.probe_completed(total, total);
        sink.status(STATUS_COMPLETED);
        sink.completed(&report);

        report
    }
}

/// Stable ascending sort by ranking latency.
///
/// Failed providers rank at the configured timeout, after every working
/// provider, and keep their relative order.
pub fn rank(results: &mut [ProviderResult]) {
    results.sort_by_key(ProviderResult::effective_latency);
}

/// Build the per-probe callback feeding the shared progress counter.
///
/// The sink is called while the counter is held, so `done` values reach
/// the sink in increasing order.
fn progress_callback(done: Arc<Mutex<usize>>, total: usize, sink: Arc<dyn ResultSink>) -> ProgressFn {
    Arc::new(move || {
        let mut done = done.lock().unwrap_or_else(PoisonError::into_inner);
        *done += 1;
        sink.probe_completed((*done).min(total), total);
    })
}

/// Returns the orchestrator to `Idle` when the run ends, however it ends.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

//! Per-provider probe execution.
//!
//! A [`ProbeRunner`] performs every lookup one provider needs in a run
//! (`domains × tests_per_domain` of them) and folds the outcomes into a
//! [`ProbeTally`]. Individual failures never escape as errors: they are
//! only counted.

use crate::dns::resolver::Lookup;
use crate::dns::types::{Latency, ProbeOutcome, Provider, RunConfig};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Callback invoked once after every probe, successful or not.
pub type ProgressFn = Arc<dyn Fn() + Send + Sync>;

/// Aggregate of one provider's probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTally {
    /// Mean of the successful probes, or `Failed`
    pub latency: Latency,
    /// Probes that succeeded
    pub success_count: usize,
    /// Probes attempted
    pub total_probes: usize,
}

impl ProbeTally {
    /// Fold probe outcomes into a tally.
    ///
    /// The mean uses `Duration` integer division, so it truncates to
    /// whole nanoseconds.
    #[must_use]
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        let (total, success_count) = outcomes
            .iter()
            .filter(|o| o.ok)
            .fold((Duration::ZERO, 0usize), |(sum, n), o| (sum + o.elapsed, n + 1));

        let latency = if success_count == 0 {
            Latency::Failed
        } else {
            Latency::Mean(total / success_count as u32)
        };

        Self {
            latency,
            success_count,
            total_probes: outcomes.len(),
        }
    }

    #[must_use]
    pub fn any_success(&self) -> bool {
        self.success_count > 0
    }
}

/// Runs all probes of one provider.
pub struct ProbeRunner {
    lookup: Arc<dyn Lookup>,
    domains: Arc<[String]>,
    cancel: CancellationToken,
}

impl ProbeRunner {
    pub fn new(lookup: Arc<dyn Lookup>, domains: Arc<[String]>, cancel: CancellationToken) -> Self {
        Self {
            lookup,
            domains,
            cancel,
        }
    }

    /// Probe `provider` against every domain, `config.tests_per_domain`
    /// times each.
    ///
    /// In sequential mode probes run one by one in domain order. In
    /// parallel mode each probe is its own task and the runner waits for
    /// all of them before aggregating.
    pub async fn run(&self, provider: &Provider, config: &RunConfig, on_progress: ProgressFn) -> ProbeTally {
        let outcomes = if config.parallel {
            self.run_parallel(provider, config, on_progress).await
        } else {
            self.run_sequential(provider, config, &on_progress).await
        };

        let tally = ProbeTally::from_outcomes(&outcomes);
        tracing::debug!(
            "{}: {}/{} probes succeeded, latency {:?}",
            provider.name,
            tally.success_count,
            tally.total_probes,
            tally.latency
        );
        tally
    }

    async fn run_sequential(
        &self,
        provider: &Provider,
        config: &RunConfig,
        on_progress: &ProgressFn,
    ) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(config.probes_per_provider(self.domains.len()));

        for domain in self.domains.iter() {
            for _ in 0..config.tests_per_domain {
                let outcome = AssertUnwindSafe(self.lookup.lookup(domain, provider, config, &self.cancel))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        tracing::warn!("Probe of {domain} via {} panicked", provider.name);
                        ProbeOutcome::failure(config.timeout)
                    });
                outcomes.push(outcome);
                on_progress();
            }
        }

        outcomes
    }

    async fn run_parallel(
        &self,
        provider: &Provider,
        config: &RunConfig,
        on_progress: ProgressFn,
    ) -> Vec<ProbeOutcome> {
        let mut handles = Vec::with_capacity(config.probes_per_provider(self.domains.len()));

        for domain in self.domains.iter() {
            for _ in 0..config.tests_per_domain {
                let lookup = Arc::clone(&self.lookup);
                let domain = domain.clone();
                let provider = provider.clone();
                let config = *config;
                let cancel = self.cancel.clone();
                let on_progress = Arc::clone(&on_progress);

                handles.push(tokio::spawn(async move {
                    let outcome = lookup.lookup(&domain, &provider, &config, &cancel).await;
                    on_progress();
                    outcome
                }));
            }
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // The task died before reporting, so report for it.
                    tracing::warn!("Probe task for {} failed: {e}", provider.name);
                    on_progress();
                    outcomes.push(ProbeOutcome::failure(config.timeout));
                }
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::testing::ScriptedLookup;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn domains(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|d| (*d).to_string()).collect()
    }

    fn counter() -> (Arc<AtomicUsize>, ProgressFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_tally_mean_of_successes_only() {
        let outcomes = [
            ProbeOutcome::success(Duration::from_millis(10)),
            ProbeOutcome::failure(Duration::from_secs(3)),
            ProbeOutcome::success(Duration::from_millis(20)),
            ProbeOutcome::success(Duration::from_millis(31)),
        ];
        let tally = ProbeTally::from_outcomes(&outcomes);

        assert_eq!(tally.success_count, 3);
        assert_eq!(tally.total_probes, 4);
        assert_eq!(tally.latency, Latency::Mean(Duration::from_nanos(20_333_333)));
    }

    #[test]
    fn test_tally_all_failed() {
        let outcomes = [ProbeOutcome::failure(Duration::from_secs(1)); 5];
        let tally = ProbeTally::from_outcomes(&outcomes);

        assert!(!tally.any_success());
        assert_eq!(tally.latency, Latency::Failed);
        assert_eq!(tally.total_probes, 5);
    }

    #[tokio::test]
    async fn test_probe_count_and_progress() {
        let lookup = Arc::new(ScriptedLookup::constant(ProbeOutcome::success(Duration::from_millis(5))));
        let runner = ProbeRunner::new(lookup.clone(), domains(&["a.com", "b.com", "c.com"]), CancellationToken::new());
        let provider = Provider::new("A", Ipv4Addr::new(192, 0, 2, 1));

        for parallel in [false, true] {
            lookup.reset();
            let config = RunConfig {
                tests_per_domain: 4,
                parallel,
                ..RunConfig::default()
            };
            let (progress, on_progress) = counter();

            let tally = runner.run(&provider, &config, on_progress).await;

            assert_eq!(tally.total_probes, 12);
            assert_eq!(tally.success_count, 12);
            assert_eq!(lookup.calls(), 12);
            assert_eq!(progress.load(Ordering::SeqCst), 12);
        }
    }

    #[tokio::test]
    async fn test_panicking_lookup_counts_as_failure() {
        let lookup = Arc::new(ScriptedLookup::constant(ProbeOutcome::success(Duration::from_millis(5))).panics_for("B"));
        let runner = ProbeRunner::new(lookup, domains(&["a.com", "b.com"]), CancellationToken::new());
        let provider = Provider::new("B", Ipv4Addr::new(192, 0, 2, 2));

        for parallel in [false, true] {
            let config = RunConfig {
                tests_per_domain: 3,
                parallel,
                ..RunConfig::default()
            };
            let (progress, on_progress) = counter();

            let tally = runner.run(&provider, &config, on_progress).await;

            assert_eq!(tally.total_probes, 6);
            assert_eq!(tally.success_count, 0);
            assert_eq!(tally.latency, Latency::Failed);
            assert_eq!(progress.load(Ordering::SeqCst), 6);
        }
    }

    #[tokio::test]
    async fn test_sequential_preserves_domain_order() {
        let lookup = Arc::new(ScriptedLookup::constant(ProbeOutcome::success(Duration::from_millis(1))));
        let runner = ProbeRunner::new(lookup.clone(), domains(&["x.com", "y.com"]), CancellationToken::new());
        let provider = Provider::new("A", Ipv4Addr::new(192, 0, 2, 1));
        let config = RunConfig {
            tests_per_domain: 2,
            parallel: false,
            ..RunConfig::default()
        };
        let (_, on_progress) = counter();

        runner.run(&provider, &config, on_progress).await;

        assert_eq!(lookup.domains_seen(), vec!["x.com", "x.com", "y.com", "y.com"]);
    }

    #[tokio::test]
    async fn test_parallel_and_sequential_agree() {
        let lookup = Arc::new(ScriptedLookup::by_domain(&[
            ("x.com", ProbeOutcome::success(Duration::from_millis(40))),
            ("y.com", ProbeOutcome::failure(Duration::from_secs(3))),
            ("z.com", ProbeOutcome::success(Duration::from_millis(70))),
        ]));
        let runner = ProbeRunner::new(lookup, domains(&["x.com", "y.com", "z.com"]), CancellationToken::new());
        let provider = Provider::new("A", Ipv4Addr::new(192, 0, 2, 1));

        let mut tallies = Vec::new();
        for parallel in [false, true] {
            let config = RunConfig {
                tests_per_domain: 3,
                parallel,
                ..RunConfig::default()
            };
            let (_, on_progress) = counter();
            tallies.push(runner.run(&provider, &config, on_progress).await);
        }

        assert_eq!(tallies[0], tallies[1]);
        assert_eq!(tallies[0].success_count, 6);
        assert_eq!(tallies[0].latency, Latency::Mean(Duration::from_millis(55)));
    }
}

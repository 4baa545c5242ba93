//! DNS types and data structures.
//!
//! This module provides the core types used for provider representation,
//! run configuration, per-probe outcomes and per-provider results.

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Smallest allowed number of repetitions per domain.
pub const MIN_TESTS_PER_DOMAIN: usize = 1;

/// Largest allowed number of repetitions per domain.
pub const MAX_TESTS_PER_DOMAIN: usize = 10;

/// Shortest allowed probe timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest allowed probe timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(10);

/// Step used by the timeout +/- controls.
const TIMEOUT_STEP: Duration = Duration::from_secs(1);

/// A DNS resolver endpoint under test.
///
/// The identity is immutable. Whether a provider takes part in a run is
/// decided by the caller handing it to the orchestrator, not by a flag on
/// the provider itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Provider {
    /// Provider name (e.g., "Cloudflare", "Quad9 Secondary")
    pub name: String,
    /// IPv4 address of the resolver
    pub ipv4: Ipv4Addr,
    /// IPv6 address of the resolver, if it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6Addr>,
}

impl Provider {
    /// Create a new IPv4-only provider.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let provider = Provider::new("Cloudflare", Ipv4Addr::new(1, 1, 1, 1));
    /// ```
    pub fn new(name: impl Into<String>, ipv4: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ipv4,
            ipv6: None,
        }
    }

    /// Attach an IPv6 address to the provider.
    #[must_use]
    pub fn with_ipv6(mut self, ipv6: Ipv6Addr) -> Self {
        self.ipv6 = Some(ipv6);
        self
    }

    /// Address to probe for the given family.
    ///
    /// Falls back to IPv4 when IPv6 is preferred but the provider has no
    /// IPv6 address.
    #[must_use]
    pub fn address(&self, family: AddressFamily) -> IpAddr {
        match (family, self.ipv6) {
            (AddressFamily::V6, Some(v6)) => IpAddr::V6(v6),
            _ => IpAddr::V4(self.ipv4),
        }
    }

    /// Check if the provider can be reached over IPv6.
    #[must_use]
    pub fn has_ipv6(&self) -> bool {
        self.ipv6.is_some()
    }
}

/// Transport used for DNS queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Plain DNS over UDP
    #[default]
    Udp,
    /// Plain DNS over TCP
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// Preferred address family for reaching a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4
    #[default]
    V4,
    /// IPv6 when the provider has an IPv6 address
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Settings for one run.
///
/// A run takes a copy of this value at start, so later edits made by the
/// UI never affect a run in progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Lookups per domain, between 1 and 10
    pub tests_per_domain: usize,
    /// Hard deadline for each lookup, between 1s and 10s
    pub timeout: Duration,
    /// UDP or TCP
    pub transport: Transport,
    /// IPv4 or IPv6
    pub family: AddressFamily,
    /// Run one provider's probes concurrently instead of one by one
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tests_per_domain: 3,
            timeout: Duration::from_secs(3),
            transport: Transport::Udp,
            family: AddressFamily::V4,
            parallel: true,
        }
    }
}

impl RunConfig {
    /// Check that every setting is within its allowed range.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TESTS_PER_DOMAIN..=MAX_TESTS_PER_DOMAIN).contains(&self.tests_per_domain) {
            return Err(Error::config(format!(
                "tests per domain must be between {} and {}, got {}",
                MIN_TESTS_PER_DOMAIN, MAX_TESTS_PER_DOMAIN, self.tests_per_domain
            )));
        }
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&self.timeout) {
            return Err(Error::config(format!(
                "timeout must be between {:?} and {:?}, got {:?}",
                MIN_TIMEOUT, MAX_TIMEOUT, self.timeout
            )));
        }
        Ok(())
    }

    /// Number of probes one provider performs over `domain_count` domains.
    #[must_use]
    pub fn probes_per_provider(&self, domain_count: usize) -> usize {
        domain_count * self.tests_per_domain
    }

    pub fn increase_tests(&mut self) {
        if self.tests_per_domain < MAX_TESTS_PER_DOMAIN {
            self.tests_per_domain += 1;
        }
    }

    pub fn decrease_tests(&mut self) {
        if self.tests_per_domain > MIN_TESTS_PER_DOMAIN {
            self.tests_per_domain -= 1;
        }
    }

    pub fn increase_timeout(&mut self) {
        if self.timeout < MAX_TIMEOUT {
            self.timeout = (self.timeout + TIMEOUT_STEP).min(MAX_TIMEOUT);
        }
    }

    pub fn decrease_timeout(&mut self) {
        if self.timeout > MIN_TIMEOUT {
            self.timeout = self.timeout.saturating_sub(TIMEOUT_STEP).max(MIN_TIMEOUT);
        }
    }
}

/// Result of one DNS lookup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Wall-clock time the lookup took
    pub elapsed: Duration,
    /// Whether the lookup succeeded within the timeout
    pub ok: bool,
}

impl ProbeOutcome {
    #[must_use]
    pub fn success(elapsed: Duration) -> Self {
        Self { elapsed, ok: true }
    }

    #[must_use]
    pub fn failure(elapsed: Duration) -> Self {
        Self { elapsed, ok: false }
    }
}

/// Mean latency of a provider, or the fact that none of its probes worked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "status", content = "mean")]
pub enum Latency {
    /// Average over the successful probes
    Mean(Duration),
    /// Every probe failed
    Failed,
}

impl Latency {
    /// The mean, if any probe succeeded.
    #[must_use]
    pub fn mean(&self) -> Option<Duration> {
        match self {
            Self::Mean(d) => Some(*d),
            Self::Failed => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Aggregate over one provider's probes in one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderResult {
    /// Provider that was tested
    pub provider: Provider,
    /// Address the probes were sent to
    pub address: IpAddr,
    /// Mean latency of the successful probes
    pub latency: Latency,
    /// Configured timeout of the run, ranking latency of failed providers
    pub timeout: Duration,
    /// Probes that succeeded
    pub success_count: usize,
    /// Probes attempted
    pub total_probes: usize,
    /// Start of the run this result belongs to
    pub timestamp: DateTime<Local>,
}

impl ProviderResult {
    /// True iff at least one probe succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.latency.is_failed()
    }

    /// Latency used for ranking.
    ///
    /// This is the mean for a working provider and exactly the configured
    /// timeout for a failed one, so failures rank after every success.
    #[must_use]
    pub fn effective_latency(&self) -> Duration {
        self.latency.mean().unwrap_or(self.timeout)
    }

    /// Fraction of probes that succeeded, in `[0, 1]`.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_probes == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total_probes as f64
        }
    }
}

/// One completed run: the ranked results sharing one timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    /// Start of the run
    pub timestamp: DateTime<Local>,
    /// Settings the run used
    pub config: RunConfig,
    /// Results, fastest first
    pub results: Vec<ProviderResult>,
}

impl RunReport {
    /// Probes attempted across all providers.
    #[must_use]
    pub fn total_probes(&self) -> usize {
        self.results.iter().map(|r| r.total_probes).sum()
    }

    /// Fastest working provider, if any.
    #[must_use]
    pub fn fastest(&self) -> Option<&ProviderResult> {
        self.results.first().filter(|r| r.success())
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.results)
    }
}

/// Overall statistics of one run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunSummary {
    /// Number of providers tested
    pub total: usize,
    /// Providers with at least one successful probe
    pub success: usize,
    /// Providers where every probe failed
    pub failed: usize,
    /// Average of the successful means
    pub avg_latency: Option<Duration>,
    /// Best mean
    pub min_latency: Option<Duration>,
    /// Worst mean among working providers
    pub max_latency: Option<Duration>,
}

impl RunSummary {
    /// Summarize a set of provider results.
    #[must_use]
    pub fn from_results(results: &[ProviderResult]) -> Self {
        let means: Vec<Duration> = results.iter().filter_map(|r| r.latency.mean()).collect();

        let avg_latency = if means.is_empty() {
            None
        } else {
            Some(means.iter().sum::<Duration>() / means.len() as u32)
        };

        Self {
            total: results.len(),
            success: means.len(),
            failed: results.len() - means.len(),
            avg_latency,
            min_latency: means.iter().min().copied(),
            max_latency: means.iter().max().copied(),
        }
    }

    /// Calculate success rate as a percentage.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, latency: Latency) -> ProviderResult {
        let provider = Provider::new(name, Ipv4Addr::new(192, 0, 2, 1));
        ProviderResult {
            address: provider.address(AddressFamily::V4),
            provider,
            latency,
            timeout: Duration::from_secs(3),
            success_count: usize::from(!latency.is_failed()),
            total_probes: 1,
            timestamp: Local::now(),
        }
    }

    #[test]
    fn test_provider_address_family() {
        let v4_only = Provider::new("Comodo", Ipv4Addr::new(8, 26, 56, 26));
        assert_eq!(
            v4_only.address(AddressFamily::V6),
            IpAddr::V4(Ipv4Addr::new(8, 26, 56, 26))
        );

        let dual = Provider::new("Quad9", Ipv4Addr::new(9, 9, 9, 9))
            .with_ipv6("2620:fe::fe".parse().unwrap());
        assert!(dual.address(AddressFamily::V6).is_ipv6());
        assert!(dual.address(AddressFamily::V4).is_ipv4());
    }

    #[test]
    fn test_config_validation() {
        assert!(RunConfig::default().validate().is_ok());

        let mut config = RunConfig::default();
        config.tests_per_domain = 0;
        assert!(config.validate().is_err());
        config.tests_per_domain = 11;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.timeout = Duration::from_millis(500);
        assert!(config.validate().is_err());
        config.timeout = Duration::from_secs(11);
        assert!(config.validate().is_err());
        config.timeout = Duration::from_secs(10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_stepping_is_clamped() {
        let mut config = RunConfig::default();
        for _ in 0..20 {
            config.increase_tests();
            config.increase_timeout();
        }
        assert_eq!(config.tests_per_domain, MAX_TESTS_PER_DOMAIN);
        assert_eq!(config.timeout, MAX_TIMEOUT);

        for _ in 0..20 {
            config.decrease_tests();
            config.decrease_timeout();
        }
        assert_eq!(config.tests_per_domain, MIN_TESTS_PER_DOMAIN);
        assert_eq!(config.timeout, MIN_TIMEOUT);
    }

    #[test]
    fn test_effective_latency_sentinel() {
        let ok = result("A", Latency::Mean(Duration::from_millis(50)));
        assert!(ok.success());
        assert_eq!(ok.effective_latency(), Duration::from_millis(50));

        let failed = result("B", Latency::Failed);
        assert!(!failed.success());
        assert_eq!(failed.effective_latency(), Duration::from_secs(3));
    }

    #[test]
    fn test_run_summary() {
        let results = vec![
            result("A", Latency::Mean(Duration::from_millis(10))),
            result("B", Latency::Mean(Duration::from_millis(20))),
            result("C", Latency::Failed),
        ];
        let summary = RunSummary::from_results(&results);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.avg_latency, Some(Duration::from_millis(15)));
        assert_eq!(summary.min_latency, Some(Duration::from_millis(10)));
        assert_eq!(summary.max_latency, Some(Duration::from_millis(20)));
    }
}

//! Single DNS lookups against one provider.
//!
//! [`Lookup`] is the seam between the measurement engine and the network:
//! the engine only ever sees a [`ProbeOutcome`], so tests can drive it
//! with a scripted implementation while [`SystemLookup`] talks to real
//! resolvers through `trust-dns-resolver`.

#![allow(clippy::missing_errors_doc)]

use crate::dns::types::{Provider, ProbeOutcome, RunConfig, Transport};
use crate::error::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::config::{NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// DNS port every provider is queried on.
pub const DNS_PORT: u16 = 53;

/// Performs one DNS lookup for a domain against a provider.
///
/// Implementations must not retry: one call is one probe. Any error,
/// including cancellation, is reported as `ok = false`.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(
        &self,
        domain: &str,
        provider: &Provider,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> ProbeOutcome;
}

/// Lookup backed by a dedicated `trust-dns-resolver` instance per probe.
///
/// Each probe builds its own resolver with caching and the hosts file
/// disabled, so every measurement is a round trip to the provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl SystemLookup {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a resolver that only talks to `provider` with `config`'s
    /// transport and address family.
    fn build_resolver(provider: &Provider, config: &RunConfig) -> Result<TokioAsyncResolver> {
        let servers = name_servers(provider, config);

        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        let resolver = TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], servers), opts)?;
        Ok(resolver)
    }
}

#[async_trait]
impl Lookup for SystemLookup {
    async fn lookup(
        &self,
        domain: &str,
        provider: &Provider,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> ProbeOutcome {
        let resolver = match Self::build_resolver(provider, config) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Resolver setup failed for {}: {e}", provider.name);
                return ProbeOutcome::failure(Duration::ZERO);
            }
        };

        let fqdn = fully_qualified(domain);
        let start = Instant::now();

        let result = tokio::select! {
            () = cancel.cancelled() => None,
            r = timeout(config.timeout, resolver.lookup_ip(fqdn.as_str())) => Some(r),
        };
        let elapsed = start.elapsed();

        classify(result, elapsed, config.timeout, &format!("{domain} via {}", provider.name))
    }
}

/// The single name server for `provider`, reached over `config`'s
/// transport and address family.
fn name_servers(provider: &Provider, config: &RunConfig) -> NameServerConfigGroup {
    let protocol = match config.transport {
        Transport::Udp => Protocol::Udp,
        Transport::Tcp => Protocol::Tcp,
    };

    let mut servers =
        NameServerConfigGroup::from_ips_clear(&[provider.address(config.family)], DNS_PORT, true);
    servers.retain(|ns| ns.protocol == protocol);
    servers
}

/// Turn a raced lookup into a probe outcome.
///
/// `None` means the probe was cancelled. An answer only counts when it
/// arrived strictly before the timeout.
fn classify<T, E: std::fmt::Display>(
    result: Option<std::result::Result<std::result::Result<T, E>, Elapsed>>,
    elapsed: Duration,
    timeout: Duration,
    target: &str,
) -> ProbeOutcome {
    match result {
        Some(Ok(Ok(_))) if elapsed < timeout => ProbeOutcome::success(elapsed),
        Some(Ok(Ok(_))) => {
            tracing::debug!("{target} answered at the deadline");
            ProbeOutcome::failure(elapsed)
        }
        Some(Ok(Err(e))) => {
            tracing::debug!("{target} failed: {e}");
            ProbeOutcome::failure(elapsed)
        }
        Some(Err(_)) => {
            tracing::debug!("{target} timed out");
            ProbeOutcome::failure(elapsed)
        }
        None => ProbeOutcome::failure(elapsed),
    }
}

/// Append the root label so no search domain is ever tried.
fn fully_qualified(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    }
}

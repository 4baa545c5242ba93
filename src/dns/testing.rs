//! Scripted lookups for driving the engine without a network.

use crate::dns::resolver::Lookup;
use crate::dns::types::{ProbeOutcome, Provider, RunConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Returns canned outcomes keyed by provider name or domain.
pub struct ScriptedLookup {
    by_provider: HashMap<String, ProbeOutcome>,
    by_domain: HashMap<String, ProbeOutcome>,
    fallback: ProbeOutcome,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    panics_for: Option<String>,
}

impl ScriptedLookup {
    pub fn constant(outcome: ProbeOutcome) -> Self {
        Self {
            by_provider: HashMap::new(),
            by_domain: HashMap::new(),
            fallback: outcome,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: None,
            panics_for: None,
        }
    }

    pub fn by_provider(entries: &[(&str, ProbeOutcome)]) -> Self {
        let mut lookup = Self::constant(ProbeOutcome::failure(RunConfig::default().timeout));
        lookup.by_provider = entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        lookup
    }

    pub fn by_domain(entries: &[(&str, ProbeOutcome)]) -> Self {
        let mut lookup = Self::constant(ProbeOutcome::failure(RunConfig::default().timeout));
        lookup.by_domain = entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        lookup
    }

    /// Block every lookup until the returned semaphore gets permits.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Panic inside every lookup against the named provider.
    pub fn panics_for(mut self, provider: &str) -> Self {
        self.panics_for = Some(provider.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn domains_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.seen.lock().unwrap().clear();
    }
}

#[async_trait]
impl Lookup for ScriptedLookup {
    async fn lookup(
        &self,
        domain: &str,
        provider: &Provider,
        _config: &RunConfig,
        _cancel: &CancellationToken,
    ) -> ProbeOutcome {
        if self.panics_for.as_deref() == Some(provider.name.as_str()) {
            panic!("lookup against {} blew up", provider.name);
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(domain.to_string());

        self.by_provider
            .get(&provider.name)
            .or_else(|| self.by_domain.get(domain))
            .copied()
            .unwrap_or(self.fallback)
    }
}

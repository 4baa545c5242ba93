//! Provider and domain catalog.

use crate::dns::types::Provider;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Domains probed when no catalog file overrides them.
pub const DEFAULT_DOMAINS: &[&str] = &[
    "www.google.com",
    "www.amazon.com",
    "www.netflix.com",
    "www.facebook.com",
    "www.microsoft.com",
    "www.apple.com",
    "www.github.com",
];

/// Immutable table of known providers and the domains used to probe them.
///
/// Loaded once at startup and handed to whoever needs it; selections are
/// made by copying providers out of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    /// Known providers, in display order
    pub providers: Vec<Provider>,
    /// Probe targets
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
}

impl Catalog {
    #[must_use]
    pub fn new(providers: Vec<Provider>, domains: Vec<String>) -> Self {
        Self { providers, domains }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers whose name matches one of `names`, case-insensitively,
    /// in catalog order. An empty `names` selects everything.
    #[must_use]
    pub fn select(&self, names: &[String]) -> Vec<Provider> {
        if names.is_empty() {
            return self.providers.clone();
        }
        self.providers
            .iter()
            .filter(|p| names.iter().any(|n| n.eq_ignore_ascii_case(&p.name)))
            .cloned()
            .collect()
    }

    /// Providers at the given catalog positions, in catalog order.
    #[must_use]
    pub fn select_indices(&self, selected: &[bool]) -> Vec<Provider> {
        self.providers
            .iter()
            .zip(selected)
            .filter(|(_, on)| **on)
            .map(|(p, _)| p.clone())
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            domains: default_domains(),
        }
    }
}

fn default_domains() -> Vec<String> {
    DEFAULT_DOMAINS.iter().map(|d| (*d).to_string()).collect()
}

fn dual(name: &str, v4: [u8; 4], v6: [u16; 8]) -> Provider {
    Provider::new(name, Ipv4Addr::from(v4)).with_ipv6(Ipv6Addr::from(v6))
}

/// Well-known public resolvers.
#[must_use]
pub fn default_providers() -> Vec<Provider> {
    vec![
        dual("Cloudflare", [1, 1, 1, 1], [0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1111]),
        dual("Cloudflare Secondary", [1, 0, 0, 1], [0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1001]),
        dual("Google", [8, 8, 8, 8], [0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888]),
        dual("Google Secondary", [8, 8, 4, 4], [0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8844]),
        dual("Quad9", [9, 9, 9, 9], [0x2620, 0xfe, 0, 0, 0, 0, 0, 0xfe]),
        dual("Quad9 Secondary", [149, 112, 112, 112], [0x2620, 0xfe, 0, 0, 0, 0, 0, 0x9]),
        dual("OpenDNS", [208, 67, 222, 222], [0x2620, 0x119, 0x35, 0, 0, 0, 0, 0x35]),
        dual("OpenDNS Secondary", [208, 67, 220, 220], [0x2620, 0x119, 0x53, 0, 0, 0, 0, 0x53]),
        Provider::new("Comodo", Ipv4Addr::new(8, 26, 56, 26)),
        Provider::new("Comodo Secondary", Ipv4Addr::new(8, 20, 247, 20)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.domains.len(), 7);
        assert_eq!(catalog.providers.iter().filter(|p| p.has_ipv6()).count(), 8);

        let quad9 = &catalog.providers[4];
        assert_eq!(quad9.ipv6, Some("2620:fe::fe".parse().unwrap()));
        let cloudflare = &catalog.providers[0];
        assert_eq!(cloudflare.ipv6, Some("2606:4700:4700::1111".parse().unwrap()));
    }

    #[test]
    fn test_select_by_name() {
        let catalog = Catalog::default();
        let selected = catalog.select(&["quad9".to_string(), "Google".to_string()]);
        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Google", "Quad9"]);

        assert_eq!(catalog.select(&[]).len(), catalog.len());
        assert!(catalog.select(&["nope".to_string()]).is_empty());
    }

    #[test]
    fn test_select_indices() {
        let catalog = Catalog::default();
        let mut flags = vec![false; catalog.len()];
        flags[1] = true;
        flags[8] = true;
        let names: Vec<String> = catalog
            .select_indices(&flags)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Cloudflare Secondary", "Comodo"]);
    }
}

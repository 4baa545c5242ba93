//! Catalog configuration loader.
//!
//! This module provides functionality to load the provider/domain catalog
//! from JSON files, command-line arguments, or the default location.

use crate::config::catalog::Catalog;
use crate::dns::types::Provider;
use crate::error::{Error, Result};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// File name of the catalog inside the config directory.
const CATALOG_FILE: &str = "catalog.json";

/// Catalog configuration loader.
///
/// Provides various methods to load, build and save catalogs.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it
    /// lists no providers or no domains.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let catalog = ConfigLoader::load_from_file("catalog.json")?;
    /// for provider in &catalog.providers {
    ///     println!("{}: {}", provider.name, provider.ipv4);
    /// }
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Catalog> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog: Catalog = serde_json::from_str(&content)?;

        if catalog.providers.is_empty() {
            return Err(Error::config(format!(
                "{} lists no providers",
                path.as_ref().display()
            )));
        }
        if catalog.domains.is_empty() {
            return Err(Error::config(format!(
                "{} lists no domains",
                path.as_ref().display()
            )));
        }

        tracing::debug!(
            "Loaded {} providers from {}",
            catalog.providers.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    /// Load the catalog from the default location.
    ///
    /// Uses `$CONFIG_DIR/dnslat/catalog.json` when it exists, otherwise
    /// the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Catalog> {
        let path = Self::config_dir().join(CATALOG_FILE);
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Catalog::default())
        }
    }

    /// Load from `file` if given, else from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(file: Option<&Path>) -> Result<Catalog> {
        match file {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Get the config directory path.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dnslat")
    }

    /// Write a catalog as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(catalog: &Catalog, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(catalog)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Create providers from command-line arguments.
    ///
    /// Each entry is `IPv4#Name` or `IPv4,IPv6#Name`; without a name the
    /// IPv4 address is used as the name.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is missing, invalid, or of the
    /// wrong family.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let args = vec!["8.8.8.8#Google".to_string(), "9.9.9.9,2620:fe::fe#Quad9".to_string()];
    /// let providers = ConfigLoader::from_args(&args)?;
    /// ```
    pub fn from_args(entries: &[String]) -> Result<Vec<Provider>> {
        entries.iter().map(|s| Self::parse_provider(s)).collect()
    }

    fn parse_provider(entry: &str) -> Result<Provider> {
        let (addrs, name) = match entry.split_once('#') {
            Some((addrs, name)) => (addrs.trim(), Some(name.trim())),
            None => (entry.trim(), None),
        };
        let (v4, v6) = match addrs.split_once(',') {
            Some((v4, v6)) => (v4.trim(), Some(v6.trim())),
            None => (addrs, None),
        };

        let ipv4 = match v4.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => ip,
            Ok(IpAddr::V6(_)) => {
                return Err(Error::parse(format!(
                    "Expected an IPv4 address first, got {v4}"
                )))
            }
            Err(_) => return Err(Error::parse(format!("Invalid IP address: {v4}"))),
        };

        let name = name.filter(|n| !n.is_empty()).map_or_else(|| v4.to_string(), str::to_string);
        let mut provider = Provider::new(name, ipv4);

        if let Some(v6) = v6 {
            match v6.parse::<IpAddr>() {
                Ok(IpAddr::V6(ip)) => provider = provider.with_ipv6(ip),
                _ => return Err(Error::parse(format!("Invalid IPv6 address: {v6}"))),
            }
        }

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_config_from_args() {
        let args = vec![
            "8.8.8.8#Google".to_string(),
            "9.9.9.9,2620:fe::fe#Quad9".to_string(),
            "1.1.1.1".to_string(),
        ];
        let providers = ConfigLoader::from_args(&args).unwrap();
        assert_eq!(providers.len(), 3);
        assert_eq!(providers[0].name, "Google");
        assert_eq!(providers[0].ipv4, Ipv4Addr::new(8, 8, 8, 8));
        assert!(!providers[0].has_ipv6());
        assert_eq!(providers[1].ipv6, Some("2620:fe::fe".parse().unwrap()));
        assert_eq!(providers[2].name, "1.1.1.1");
    }

    #[test]
    fn test_config_from_args_invalid_ip() {
        assert!(ConfigLoader::from_args(&["invalid_ip#Test".to_string()]).is_err());
        assert!(ConfigLoader::from_args(&["::1#V6First".to_string()]).is_err());
        assert!(ConfigLoader::from_args(&["1.1.1.1,8.8.8.8#Bad".to_string()]).is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let catalog = Catalog::default();
        ConfigLoader::save(&catalog, &path).unwrap();
        let loaded = ConfigLoader::load_from_file(&path).unwrap();

        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_load_uses_default_domains_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(
            &path,
            r#"{"providers": [{"name": "Local", "ipv4": "127.0.0.1"}]}"#,
        )
        .unwrap();

        let catalog = ConfigLoader::load(Some(path.as_path())).unwrap();
        assert_eq!(catalog.providers.len(), 1);
        assert_eq!(catalog.domains, Catalog::default().domains);
    }

    #[test]
    fn test_load_rejects_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"providers": []}"#).unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(Error::Config(_))
        ));
    }
}

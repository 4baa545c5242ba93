//! dnslat - concurrent DNS resolver latency benchmark.
//!
//! This crate provides both a library API and a CLI tool for:
//! - Measuring how quickly public DNS providers resolve a set of domains
//! - Ranking providers by mean lookup latency, failed providers last
//! - Keeping a bounded history of recent runs
//! - Interactive TUI for easy navigation
//! - Multiple output formats (table, JSON, CSV, TSV)
//!
//! # Library Usage
//!
//! ```ignore
//! use dnslat::{Catalog, NullSink, Orchestrator, RunConfig, SystemLookup};
//! use std::sync::Arc;
//!
//! let catalog = Catalog::default();
//! let orchestrator = Orchestrator::new(Arc::new(SystemLookup::new()), catalog.domains.clone());
//! let report = orchestrator
//!     .run_all(catalog.providers.clone(), RunConfig::default(), Arc::new(NullSink))
//!     .await?;
//! println!("{}", dnslat::dns::report::render_report(&report));
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Interactive TUI mode (default)
//! dnslat
//!
//! # Latency run
//! dnslat run
//! dnslat run -p Cloudflare -p Quad9 --count 5 --timeout 2
//! dnslat run --dns 192.168.1.1#Router --tcp --csv results.csv
//!
//! # List providers
//! dnslat list --ipv6
//!
//! # Export the catalog
//! dnslat export --output mycatalog.json
//! ```

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod tui;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::{Catalog, ConfigLoader};
pub use dns::types::{
    AddressFamily, Latency, Provider, ProviderResult, RunConfig, RunReport, RunSummary, Transport,
};
pub use dns::{ChannelSink, NullSink, Orchestrator, ResultSink, RunEvent, RunHistory, SystemLookup};
pub use error::{Error, Result};

//! Configuration module.
//!
//! This module provides the provider/domain catalog and the functionality
//! for loading it from various sources.

pub mod catalog;
pub mod loader;

pub use catalog::Catalog;
pub use loader::ConfigLoader;

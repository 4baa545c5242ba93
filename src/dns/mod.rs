//! DNS module.
//!
//! This module provides the latency-measurement engine:
//! - Single lookups against one provider (`resolver`)
//! - Per-provider probe execution (`probe`)
//! - Run orchestration and ranking (`orchestrator`)
//! - Progress/result delivery (`sink`) and run history (`history`)
//! - Text and CSV rendering (`report`)
//! - Core data types (`types`)

pub mod history;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod resolver;
pub mod sink;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use history::RunHistory;
pub use orchestrator::{Orchestrator, RunState};
pub use probe::{ProbeRunner, ProbeTally};
pub use resolver::{Lookup, SystemLookup};
pub use sink::{ChannelSink, NullSink, ResultSink, RunEvent};
pub use types::*;

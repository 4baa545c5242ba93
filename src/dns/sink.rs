//! Progress and result delivery to the presentation layer.

use crate::dns::types::RunReport;
use tokio::sync::mpsc;

/// Receives everything a run publishes.
///
/// Calls may arrive from many tasks at once. `probe_completed` is called
/// exactly once per probe with a `done` count that only ever grows.
pub trait ResultSink: Send + Sync {
    /// A run was accepted and will perform `total` probes.
    fn run_started(&self, _total: usize) {}

    /// One more probe finished; `done` of `total` are complete.
    fn probe_completed(&self, done: usize, total: usize);

    /// Human-readable status line.
    fn status(&self, _message: &str) {}

    /// The ranked report of a finished run.
    fn completed(&self, report: &RunReport);
}

/// Messages sent from a run to its single consumer.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Run accepted.
    Started { total: usize },
    /// Progress update.
    Progress { done: usize, total: usize },
    /// Status line.
    Status(String),
    /// Run finished with this ranked report.
    Completed(Box<RunReport>),
}

impl RunEvent {
    /// Overall completion in `[0, 1]` carried by this event, if any.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Started { .. } => Some(0.0),
            Self::Progress { done, total } if *total > 0 => Some((*done as f64 / *total as f64).min(1.0)),
            Self::Completed(_) => Some(1.0),
            _ => None,
        }
    }
}

/// Forwards run events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that consumes its events.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    #[must_use]
    pub fn from_sender(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: RunEvent) {
        // A closed receiver means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

impl ResultSink for ChannelSink {
    fn run_started(&self, total: usize) {
        self.send(RunEvent::Started { total });
    }

    fn probe_completed(&self, done: usize, total: usize) {
        self.send(RunEvent::Progress { done, total });
    }

    fn status(&self, message: &str) {
        self.send(RunEvent::Status(message.to_string()));
    }

    fn completed(&self, report: &RunReport) {
        self.send(RunEvent::Completed(Box::new(report.clone())));
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn probe_completed(&self, _done: usize, _total: usize) {}

    fn completed(&self, _report: &RunReport) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_fraction() {
        assert_eq!(RunEvent::Started { total: 4 }.fraction(), Some(0.0));
        assert_eq!(RunEvent::Progress { done: 1, total: 4 }.fraction(), Some(0.25));
        assert_eq!(RunEvent::Progress { done: 0, total: 0 }.fraction(), None);
        assert_eq!(RunEvent::Status("x".into()).fraction(), None);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.run_started(2);
        sink.probe_completed(1, 2);
        sink.status("halfway");

        assert!(matches!(rx.recv().await, Some(RunEvent::Started { total: 2 })));
        assert!(matches!(rx.recv().await, Some(RunEvent::Progress { done: 1, total: 2 })));
        assert!(matches!(rx.recv().await, Some(RunEvent::Status(s)) if s == "halfway"));
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.probe_completed(1, 1);
    }
}

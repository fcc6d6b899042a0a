//! Records coordinator lifecycle events so mutation and reload behavior can be inspected.

#[cfg(feature = "telemetry")]
use parking_lot::Mutex;

use crate::coordinator::MutationKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ReloadCompleted { collection: &'static str, count: usize },
    ReloadFailed { collection: &'static str, error: String },
    MutationStarted(MutationKind),
    MutationApplied(MutationKind),
    MutationFailed { kind: MutationKind, error: String },
    MutationRejected { kind: MutationKind, reason: String },
    Compensated(MutationKind),
}

#[derive(Debug, Default)]
pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::ReloadCompleted { collection, count } => {
                    tracing::debug!(collection, count, "telemetry reload completed")
                }
                Event::ReloadFailed { collection, error } => {
                    tracing::debug!(collection, error = %error, "telemetry reload failed")
                }
                Event::MutationStarted(kind) => {
                    tracing::debug!(kind = kind.label(), "telemetry mutation started")
                }
                Event::MutationApplied(kind) => {
                    tracing::debug!(kind = kind.label(), "telemetry mutation applied")
                }
                Event::MutationFailed { kind, error } => tracing::debug!(
                    kind = kind.label(),
                    error = %error,
                    "telemetry mutation failed"
                ),
                Event::MutationRejected { kind, reason } => tracing::debug!(
                    kind = kind.label(),
                    reason = reason.as_str(),
                    "telemetry mutation rejected"
                ),
                Event::Compensated(kind) => {
                    tracing::debug!(kind = kind.label(), "telemetry optimistic update reverted")
                }
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }

    /// Recorded events, oldest first. Empty when the feature is off.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_when_enabled() {
        let handle = Handle::new();
        handle.record(Event::ReloadCompleted {
            collection: "items",
            count: 2,
        });
        handle.record(Event::MutationApplied(MutationKind::DeleteItem));
        if handle.is_enabled() {
            assert_eq!(handle.events().len(), 2);
        } else {
            assert!(handle.events().is_empty());
        }
    }
}

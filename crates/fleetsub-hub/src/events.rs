//! Observability events
//!
//! Creates and updates of hub Deployables are reported as `Deploy` events
//! attached to the subscription. Events never feed back into status.

use fleetsub_types::ObjectKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventReason {
    Deploy,
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventReason::Deploy => f.write_str("Deploy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    Success,
    Failure,
}

/// Event attached to a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Subscription the event is about
    pub involved: ObjectKey,
    pub reason: EventReason,
    pub outcome: EventOutcome,
    pub message: String,
}

impl HubEvent {
    /// Event for an operation that returned `result`; a failure carries the
    /// error text after the message
    pub fn deploy<T, E: fmt::Display>(
        involved: &ObjectKey,
        message: impl Into<String>,
        result: &Result<T, E>,
    ) -> Self {
        let message = message.into();
        let (outcome, message) = match result {
            Ok(_) => (EventOutcome::Success, message),
            Err(e) => (EventOutcome::Failure, format!("{message}: {e}")),
        };
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            involved: involved.clone(),
            reason: EventReason::Deploy,
            outcome,
            message,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == EventOutcome::Failure
    }
}

/// Sink for hub events
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: HubEvent);
}

/// Publishes events on a broadcast channel and mirrors them to tracing
pub struct BroadcastEventRecorder {
    tx: broadcast::Sender<HubEvent>,
}

impl BroadcastEventRecorder {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }
}

impl EventRecorder for BroadcastEventRecorder {
    fn record(&self, event: HubEvent) {
        if event.is_failure() {
            warn!(subscription = %event.involved, reason = %event.reason, "{}", event.message);
        } else {
            info!(subscription = %event.involved, reason = %event.reason, "{}", event.message);
        }
        // No receivers is fine
        let _ = self.tx.send(event);
    }
}

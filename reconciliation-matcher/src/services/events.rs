//! Reconciliation domain events.
//!
//! The bus is constructed once at startup and handed to whoever publishes or
//! listens; there is no process-wide registry.

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationEvent {
    MatchPassCompleted {
        tenant_id: Uuid,
        auto_approved: usize,
        requires_review: usize,
        unmatched: usize,
    },
    Settled {
        tenant_id: Uuid,
        statement_id: Uuid,
        receivable_id: Uuid,
        origin: SettlementOrigin,
    },
    SettlementRejected {
        tenant_id: Uuid,
        statement_id: Uuid,
        receivable_id: Uuid,
        reason: &'static str,
    },
    ApprovalRequested {
        tenant_id: Uuid,
        approval_id: Uuid,
        candidates: usize,
        total_value: Decimal,
    },
    ApprovalDecided {
        tenant_id: Uuid,
        approval_id: Uuid,
        status: String,
        actor: Option<String>,
    },
    ApprovalExecuted {
        tenant_id: Uuid,
        approval_id: Uuid,
        succeeded: usize,
        failed: usize,
    },
}

/// Which path triggered a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOrigin {
    /// Matcher auto-settlement during a pass.
    MatchPass,
    /// High-confidence entry of an approval submission.
    Submission,
    /// Execution of an approved request.
    Approval,
}

impl SettlementOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatchPass => "match_pass",
            Self::Submission => "submission",
            Self::Approval => "approval",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReconciliationEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to current subscribers; having none is not an error.
    pub fn publish(&self, event: ReconciliationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReconciliationEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Spawn a task that writes every event to the log.
pub fn spawn_event_logger(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Event logger lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &ReconciliationEvent) {
    match event {
        ReconciliationEvent::MatchPassCompleted {
            tenant_id,
            auto_approved,
            requires_review,
            unmatched,
        } => tracing::info!(
            tenant_id = %tenant_id,
            auto_approved = auto_approved,
            requires_review = requires_review,
            unmatched = unmatched,
            "Match pass completed"
        ),
        ReconciliationEvent::Settled {
            tenant_id,
            statement_id,
            receivable_id,
            origin,
        } => tracing::info!(
            tenant_id = %tenant_id,
            statement_id = %statement_id,
            receivable_id = %receivable_id,
            origin = origin.as_str(),
            "Statement line settled"
        ),
        ReconciliationEvent::SettlementRejected {
            tenant_id,
            statement_id,
            receivable_id,
            reason,
        } => tracing::warn!(
            tenant_id = %tenant_id,
            statement_id = %statement_id,
            receivable_id = %receivable_id,
            reason = reason,
            "Settlement rejected"
        ),
        ReconciliationEvent::ApprovalRequested {
            tenant_id,
            approval_id,
            candidates,
            total_value,
        } => tracing::info!(
            tenant_id = %tenant_id,
            approval_id = %approval_id,
            candidates = candidates,
            total_value = %total_value,
            "Approval requested"
        ),
        ReconciliationEvent::ApprovalDecided {
            tenant_id,
            approval_id,
            status,
            actor,
        } => tracing::info!(
            tenant_id = %tenant_id,
            approval_id = %approval_id,
            status = %status,
            actor = actor.as_deref().unwrap_or("-"),
            "Approval decided"
        ),
        ReconciliationEvent::ApprovalExecuted {
            tenant_id,
            approval_id,
            succeeded,
            failed,
        } => tracing::info!(
            tenant_id = %tenant_id,
            approval_id = %approval_id,
            succeeded = succeeded,
            failed = failed,
            "Approval executed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = ReconciliationEvent::MatchPassCompleted {
            tenant_id: Uuid::new_v4(),
            auto_approved: 1,
            requires_review: 2,
            unmatched: 3,
        };
        bus.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(ReconciliationEvent::ApprovalExecuted {
            tenant_id: Uuid::nil(),
            approval_id: Uuid::nil(),
            succeeded: 0,
            failed: 0,
        });
    }

    #[tokio::test]
    async fn separate_buses_are_isolated() {
        let a = EventBus::default();
        let b = EventBus::default();
        let mut rx_b = b.subscribe();

        a.publish(ReconciliationEvent::ApprovalExecuted {
            tenant_id: Uuid::nil(),
            approval_id: Uuid::nil(),
            succeeded: 1,
            failed: 0,
        });

        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}

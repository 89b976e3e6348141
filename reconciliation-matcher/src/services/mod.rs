//! Services module for reconciliation-matcher.

pub mod database;
pub mod events;
pub mod memory;
pub mod metrics;
pub mod reconciler;
pub mod store;

pub use database::Database;
pub use events::{spawn_event_logger, EventBus, ReconciliationEvent, SettlementOrigin};
pub use memory::InMemoryStore;
pub use metrics::{
    get_metrics, init_metrics, record_approval_operation, record_classification, record_error,
    record_settlement,
};
pub use reconciler::{
    ExecutionReport, MatchReport, MatchSubmission, Reconciler, SubmissionReport,
};
pub use store::ReconciliationStore;

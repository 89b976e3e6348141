//! HTTP handlers for reconciliation-matcher.

pub mod approvals;
pub mod health;
pub mod matching;
pub mod workflow;

pub use approvals::*;
pub use health::*;
pub use matching::*;
pub use workflow::*;

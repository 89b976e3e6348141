//! Domain models for reconciliation-matcher.

#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Statement Line Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Pending,
    Reconciled,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reconciled => "reconciled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "reconciled" => Some(Self::Reconciled),
            _ => None,
        }
    }
}

/// One imported bank transaction awaiting reconciliation.
#[derive(Debug, Clone, FromRow)]
pub struct StatementLine {
    pub line_id: Uuid,
    pub tenant_id: Uuid,
    pub bank_account_id: Uuid,
    pub line_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub direction: String,
    pub status: String,
    pub receivable_id: Option<Uuid>,
    pub external_id: Option<String>,
}

impl StatementLine {
    pub fn is_pending_credit(&self) -> bool {
        self.status == LineStatus::Pending.as_str() && self.direction == Direction::Credit.as_str()
    }
}

// ============================================================================
// Receivable Models
// ============================================================================

/// An amount owed to the tenant, joined with the customer's display name.
#[derive(Debug, Clone, FromRow)]
pub struct Receivable {
    pub receivable_id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub net_amount: Decimal,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
}

impl Receivable {
    pub fn is_open(&self) -> bool {
        self.payment_date.is_none()
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Result of settling one statement line against one receivable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { payment_date: NaiveDate },
    /// The line is unknown or no longer pending.
    LineNotPending,
    /// The line is an outgoing debit and cannot pay a receivable.
    LineNotCredit,
    /// The receivable is unknown or already carries a payment date.
    ReceivableNotOpen,
}

impl SettlementOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settled { .. } => "settled",
            Self::LineNotPending => "line_not_pending",
            Self::LineNotCredit => "line_not_credit",
            Self::ReceivableNotOpen => "receivable_not_open",
        }
    }
}

// ============================================================================
// Approval Models
// ============================================================================

/// Workflow entity type under which approval requests are registered.
pub const APPROVAL_ENTITY_TYPE: &str = "reconciliation_approval";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "executed" => Some(Self::Executed),
            _ => None,
        }
    }
}

/// Workflow actions driving the approval lifecycle.
pub mod approval_actions {
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";
    pub const EXECUTE: &str = "execute";
}

/// Reviewer verdict on a pending approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Approve => approval_actions::APPROVE,
            Self::Reject => approval_actions::REJECT,
        }
    }

    pub fn target_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Actor recorded when the low-value rule approves a request.
pub const AUTO_RULE_ACTOR: &str = "auto-rule";

/// A statement line / receivable pair held in an approval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalCandidate {
    pub statement_id: Uuid,
    pub transaction_id: Uuid,
    pub confidence: u8,
    pub amount: Decimal,
}

/// Approval request; `status` is the state of its workflow instance.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalRequest {
    pub approval_id: Uuid,
    pub tenant_id: Uuid,
    pub status: String,
    pub candidates: Json<Vec<ApprovalCandidate>>,
    pub total_value: Decimal,
    pub requested_by: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn status(&self) -> Option<ApprovalStatus> {
        ApprovalStatus::from_str(&self.status)
    }
}

// ============================================================================
// Workflow Models
// ============================================================================

/// Response contract of the `workflow_transition` stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub success: bool,
    #[serde(default)]
    pub from_state: Option<String>,
    #[serde(default)]
    pub to_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransitionOutcome {
    pub fn succeeded(from_state: &str, to_state: &str) -> Self {
        Self {
            success: true,
            from_state: Some(from_state.to_string()),
            to_state: Some(to_state.to_string()),
            error: None,
        }
    }

    pub fn failed(from_state: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            from_state: from_state.map(|s| s.to_string()),
            to_state: None,
            error: Some(reason.into()),
        }
    }

    pub fn failure_reason(&self) -> &str {
        self.error.as_deref().unwrap_or("transition rejected")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_outcome_decodes_procedure_json() {
        let raw = serde_json::json!({
            "success": false,
            "fromState": "pending",
            "error": "transition pending -> executed via execute is not allowed"
        });

        let outcome: TransitionOutcome = serde_json::from_value(raw).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.from_state.as_deref(), Some("pending"));
        assert_eq!(outcome.to_state, None);
        assert_eq!(
            outcome.failure_reason(),
            "transition pending -> executed via execute is not allowed"
        );
    }

    #[test]
    fn decisions_map_to_workflow_actions() {
        let approve: ApprovalDecision = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(approve.action(), "approve");
        assert_eq!(approve.target_status(), ApprovalStatus::Approved);
        assert_eq!(ApprovalDecision::Reject.target_status().as_str(), "rejected");
        assert!(serde_json::from_str::<ApprovalDecision>("\"maybe\"").is_err());
    }

    #[test]
    fn unknown_status_strings_are_rejected() {
        assert_eq!(ApprovalStatus::from_str("archived"), None);
        assert_eq!(LineStatus::from_str("reconciled"), Some(LineStatus::Reconciled));
        assert_eq!(Direction::from_str("debit"), Some(Direction::Debit));
    }
}

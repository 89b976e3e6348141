//! Approval submission, decision and execution bodies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{ApprovalCandidate, ApprovalDecision, ApprovalRequest};
use crate::services::{ExecutionReport, MatchSubmission, SubmissionReport};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedMatch {
    pub statement_id: Uuid,
    pub transaction_id: Uuid,
    #[validate(range(max = 100, message = "Confidence must be between 0 and 100"))]
    pub confidence: u8,
}

impl From<&SubmittedMatch> for MatchSubmission {
    fn from(m: &SubmittedMatch) -> Self {
        Self {
            statement_id: m.statement_id,
            transaction_id: m.transaction_id,
            confidence: m.confidence,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitApprovalRequest {
    #[validate(length(min = 1, message = "At least one match is required"), nested)]
    pub matches: Vec<SubmittedMatch>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApprovalResponse {
    pub executed: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<Uuid>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub auto_approved_by_rule: bool,
}

impl From<SubmissionReport> for SubmitApprovalResponse {
    fn from(report: SubmissionReport) -> Self {
        Self {
            executed: report.executed,
            failed: report.failed,
            approval_id: report.approval_id,
            total_value: report.total_value,
            auto_approved_by_rule: report.auto_approved_by_rule,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalCandidateView {
    pub statement_id: Uuid,
    pub transaction_id: Uuid,
    pub confidence: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl From<&ApprovalCandidate> for ApprovalCandidateView {
    fn from(c: &ApprovalCandidate) -> Self {
        Self {
            statement_id: c.statement_id,
            transaction_id: c.transaction_id,
            confidence: c.confidence,
            amount: c.amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub approval_id: Uuid,
    pub status: String,
    pub candidates: Vec<ApprovalCandidateView>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub requested_by: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<ApprovalRequest> for ApprovalResponse {
    fn from(approval: ApprovalRequest) -> Self {
        Self {
            approval_id: approval.approval_id,
            candidates: approval.candidates.iter().map(ApprovalCandidateView::from).collect(),
            status: approval.status,
            total_value: approval.total_value,
            requested_by: approval.requested_by,
            created_utc: approval.created_utc,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ApprovalDecision,
}

#[derive(Debug, Serialize)]
pub struct ExecutionResponse {
    pub succeeded: usize,
    pub failed: usize,
}

impl From<ExecutionReport> for ExecutionResponse {
    fn from(report: ExecutionReport) -> Self {
        Self {
            succeeded: report.succeeded,
            failed: report.failed,
        }
    }
}

//! Matching pass request and review candidates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::PlannedMatch;
use crate::services::MatchReport;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub bank_account_id: Option<Uuid>,
}

/// A pairing that needs a human decision.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub statement_id: Uuid,
    pub transaction_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_amount: Decimal,
    pub statement_date: NaiveDate,
    pub due_date: NaiveDate,
    pub description: String,
    pub customer_name: String,
    pub confidence: u8,
    pub match_reason: String,
}

impl From<&PlannedMatch> for MatchCandidate {
    fn from(planned: &PlannedMatch) -> Self {
        Self {
            statement_id: planned.line.line_id,
            transaction_id: planned.receivable.receivable_id,
            amount: planned.line.amount,
            expected_amount: planned.receivable.net_amount,
            statement_date: planned.line.line_date,
            due_date: planned.receivable.due_date,
            description: planned.line.description.clone(),
            customer_name: planned.receivable.customer_name.clone(),
            confidence: planned.score.total,
            match_reason: planned.score.reason_text(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub auto_approved: usize,
    pub requires_review: Vec<MatchCandidate>,
    pub unmatched: usize,
}

impl From<MatchReport> for MatchResponse {
    fn from(report: MatchReport) -> Self {
        Self {
            auto_approved: report.auto_settled.len(),
            requires_review: report.requires_review.iter().map(MatchCandidate::from).collect(),
            unmatched: report.unmatched,
        }
    }
}

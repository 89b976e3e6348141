//! Matching engine: scores pending statement credits against open
//! receivables and classifies each best pairing.
//!
//! Everything here is pure. The [`plan_pass`] output is handed to the
//! reconciler, which performs the writes.

pub mod scoring;
pub mod selection;

pub use scoring::{score_pair, AmountMatch, DateMatch, Score};
pub use selection::{best_candidate, Candidate, TieBreak};

use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{Receivable, StatementLine};

/// Score cutoffs for auto-settlement and human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub auto_approve: u8,
    pub review: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            auto_approve: 95,
            review: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    AutoApprove,
    RequiresReview,
    Unmatched,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApprove => "auto_approved",
            Self::RequiresReview => "requires_review",
            Self::Unmatched => "unmatched",
        }
    }
}

impl Thresholds {
    pub fn classify(&self, score: u8) -> Classification {
        if score >= self.auto_approve {
            Classification::AutoApprove
        } else if score >= self.review {
            Classification::RequiresReview
        } else {
            Classification::Unmatched
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchPolicy {
    pub thresholds: Thresholds,
    pub tie_break: TieBreak,
}

/// A statement line paired with its chosen receivable.
#[derive(Debug, Clone)]
pub struct PlannedMatch {
    pub line: StatementLine,
    pub receivable: Receivable,
    pub score: Score,
}

/// Classification of one matching pass, in statement-line order.
#[derive(Debug, Clone, Default)]
pub struct MatchPlan {
    pub auto_settle: Vec<PlannedMatch>,
    pub review: Vec<PlannedMatch>,
    pub unmatched: Vec<Uuid>,
}

/// Classify every line against the receivable pool.
///
/// A receivable chosen for auto-settlement is withdrawn from the pool for
/// the lines that follow, so one pass never settles a receivable twice.
/// Review candidates do not reserve their receivable.
pub fn plan_pass(
    lines: &[StatementLine],
    receivables: &[Receivable],
    policy: &MatchPolicy,
) -> MatchPlan {
    let mut plan = MatchPlan::default();
    let mut claimed: HashSet<Uuid> = HashSet::new();

    for line in lines {
        let pool = receivables
            .iter()
            .filter(|r| !claimed.contains(&r.receivable_id));

        let Some(candidate) = best_candidate(line, pool, policy.tie_break) else {
            plan.unmatched.push(line.line_id);
            continue;
        };

        let planned = PlannedMatch {
            line: line.clone(),
            receivable: candidate.receivable.clone(),
            score: candidate.score,
        };

        match policy.thresholds.classify(planned.score.total) {
            Classification::AutoApprove => {
                claimed.insert(planned.receivable.receivable_id);
                plan.auto_settle.push(planned);
            }
            Classification::RequiresReview => plan.review.push(planned),
            Classification::Unmatched => plan.unmatched.push(line.line_id),
        }
    }

    plan
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::{Direction, LineStatus, Receivable, StatementLine};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn line(amount: Decimal, line_date: &str, description: &str) -> StatementLine {
        StatementLine {
            line_id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            bank_account_id: Uuid::nil(),
            line_date: date(line_date),
            description: description.to_string(),
            amount,
            direction: Direction::Credit.as_str().to_string(),
            status: LineStatus::Pending.as_str().to_string(),
            receivable_id: None,
            external_id: None,
        }
    }

    pub fn debit_line(amount: Decimal, line_date: &str, description: &str) -> StatementLine {
        StatementLine {
            direction: Direction::Debit.as_str().to_string(),
            ..line(amount, line_date, description)
        }
    }

    pub fn receivable(net_amount: Decimal, due_date: &str, customer_name: &str) -> Receivable {
        Receivable {
            receivable_id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            customer_id: Uuid::new_v4(),
            customer_name: customer_name.to_string(),
            net_amount,
            due_date: date(due_date),
            payment_date: None,
        }
    }
}

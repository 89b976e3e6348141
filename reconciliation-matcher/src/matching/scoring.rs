//! Confidence scoring for a statement line / receivable pair.
//!
//! The score is the sum of three independent signals (amount, date
//! proximity, customer name in the description) and tops out at 100.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Receivable, StatementLine};

/// Differences strictly below one cent count as the exact amount.
const EXACT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// Relative differences strictly below 2% count as approximate.
const APPROXIMATE_RATIO: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

const NEAR_DAYS: i64 = 3;
const SAME_WEEK_DAYS: i64 = 7;

const NAME_POINTS: u8 = 20;
const NAME_REASON: &str = "nome do cliente";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountMatch {
    Exact,
    Approximate,
    Mismatch,
}

impl AmountMatch {
    pub fn points(&self) -> u8 {
        match self {
            Self::Exact => 50,
            Self::Approximate => 30,
            Self::Mismatch => 0,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Exact => Some("valor exato"),
            Self::Approximate => Some("valor aproximado"),
            Self::Mismatch => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatch {
    Near,
    SameWeek,
    Distant,
}

impl DateMatch {
    pub fn points(&self) -> u8 {
        match self {
            Self::Near => 30,
            Self::SameWeek => 15,
            Self::Distant => 0,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Near => Some("data próxima"),
            Self::SameWeek => Some("data na semana"),
            Self::Distant => None,
        }
    }
}

/// Compare a received amount with the amount due.
pub fn amount_match(received: Decimal, expected: Decimal) -> AmountMatch {
    let diff = (received - expected).abs();
    if diff < EXACT_TOLERANCE {
        return AmountMatch::Exact;
    }
    if expected > Decimal::ZERO && diff / expected < APPROXIMATE_RATIO {
        return AmountMatch::Approximate;
    }
    AmountMatch::Mismatch
}

/// Compare the statement date with the due date, in either direction.
pub fn date_match(statement_date: NaiveDate, due_date: NaiveDate) -> DateMatch {
    let days = (statement_date - due_date).num_days().abs();
    if days <= NEAR_DAYS {
        DateMatch::Near
    } else if days <= SAME_WEEK_DAYS {
        DateMatch::SameWeek
    } else {
        DateMatch::Distant
    }
}

/// True when the description mentions the first word of the customer name.
pub fn name_matches(description: &str, customer_name: &str) -> bool {
    match customer_name.split_whitespace().next() {
        Some(first) => description
            .to_lowercase()
            .contains(&first.to_lowercase()),
        None => false,
    }
}

/// Total confidence and the reason tokens that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub total: u8,
    pub reasons: Vec<&'static str>,
}

impl Score {
    /// Reasons joined for display, e.g. `valor exato, data próxima`.
    pub fn reason_text(&self) -> String {
        self.reasons.join(", ")
    }
}

pub fn score_pair(line: &StatementLine, receivable: &Receivable) -> Score {
    let amount = amount_match(line.amount, receivable.net_amount);
    let date = date_match(line.line_date, receivable.due_date);
    let name = name_matches(&line.description, &receivable.customer_name);

    let mut total = amount.points() + date.points();
    let mut reasons: Vec<&'static str> = [amount.reason(), date.reason()]
        .into_iter()
        .flatten()
        .collect();

    if name {
        total += NAME_POINTS;
        reasons.push(NAME_REASON);
    }

    Score { total, reasons }
}

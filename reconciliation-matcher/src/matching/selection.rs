//! Best-candidate selection among scored receivables.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::matching::scoring::{score_pair, Score};
use crate::models::{Receivable, StatementLine};

/// How to choose between receivables that reach the same top score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Smallest absolute amount difference, then earliest due date, then id.
    #[default]
    SmallestAmountDifference,
    /// Earliest due date, then id.
    EarliestDueDate,
    /// The first receivable reaching the score in input order.
    FirstSeen,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmallestAmountDifference => "smallest_amount_difference",
            Self::EarliestDueDate => "earliest_due_date",
            Self::FirstSeen => "first_seen",
        }
    }

    /// Ordering of two equally scored receivables; `Less` means `a` wins.
    fn compare(&self, line: &StatementLine, a: &Receivable, b: &Receivable) -> Ordering {
        match self {
            Self::SmallestAmountDifference => {
                let diff_a = (line.amount - a.net_amount).abs();
                let diff_b = (line.amount - b.net_amount).abs();
                diff_a
                    .cmp(&diff_b)
                    .then(a.due_date.cmp(&b.due_date))
                    .then(a.receivable_id.cmp(&b.receivable_id))
            }
            Self::EarliestDueDate => a
                .due_date
                .cmp(&b.due_date)
                .then(a.receivable_id.cmp(&b.receivable_id)),
            Self::FirstSeen => Ordering::Equal,
        }
    }
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smallest_amount_difference" => Ok(Self::SmallestAmountDifference),
            "earliest_due_date" => Ok(Self::EarliestDueDate),
            "first_seen" => Ok(Self::FirstSeen),
            other => Err(format!("unknown tie-break policy '{}'", other)),
        }
    }
}

/// A receivable together with its score against one statement line.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub receivable: &'a Receivable,
    pub score: Score,
}

/// Highest-scoring receivable for `line`, or `None` when there are none.
pub fn best_candidate<'a, I>(
    line: &StatementLine,
    receivables: I,
    tie_break: TieBreak,
) -> Option<Candidate<'a>>
where
    I: IntoIterator<Item = &'a Receivable>,
{
    let mut best: Option<Candidate<'a>> = None;

    for receivable in receivables {
        let score = score_pair(line, receivable);
        let replace = match &best {
            None => true,
            Some(current) => match score.total.cmp(&current.score.total) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => {
                    tie_break.compare(line, receivable, current.receivable) == Ordering::Less
                }
            },
        };

        if replace {
            best = Some(Candidate { receivable, score });
        }
    }

    best
}

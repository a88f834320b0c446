//! Linked-button calculations.
//!
//! A button may point at a partner through `linked_button_id`. The link is
//! one-directional in the data but treated as an undirected pair here: pairs
//! are keyed by their sorted id tuple and each key is computed once, no
//! matter which side declared the link or how many buttons point at the same
//! partner.
//!
//! When both sides declare an enabled link, the first declaring button in
//! input order owns the pair: its operator is used and its clicks are `a`.

#[cfg(test)]
#[path = "calc_test.rs"]
mod calc_test;

use std::collections::{HashMap, HashSet};

use crate::consts::DISPLAY_DECIMALS;
use crate::model::{Button, ButtonId, CalcOp};

/// Order-independent key for a linked pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(ButtonId, ButtonId);

impl PairKey {
    #[must_use]
    pub fn new(a: ButtonId, b: ButtonId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Derived value for one linked pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkedResult {
    pub pair: PairKey,
    /// The button that declared the link; its clicks are operand `a`.
    pub button_a: ButtonId,
    /// The partner; its clicks are operand `b`.
    pub button_b: ButtonId,
    pub op: CalcOp,
    /// Full-precision result.
    pub value: f64,
}

impl LinkedResult {
    /// The value rounded for display.
    #[must_use]
    pub fn display_value(&self) -> f64 {
        round_to(self.value, DISPLAY_DECIMALS)
    }

    /// The display value formatted with a fixed number of decimals.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!("{:.2}", self.display_value())
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Apply `op` to two click counters. Percentage of a zero partner is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn apply_op(op: CalcOp, a: u64, b: u64) -> f64 {
    let (a, b) = (a as f64, b as f64);
    match op {
        CalcOp::Add => a + b,
        CalcOp::Subtract => a - b,
        CalcOp::Multiply => a * b,
        CalcOp::Percentage => {
            if b > 0.0 {
                (a / b) * 100.0
            } else {
                0.0
            }
        }
    }
}

/// Compute every linked pair across `buttons`, in input order.
///
/// Pairs whose partner is missing from `buttons`, and self-links, are skipped.
pub fn compute_all<'a, I>(buttons: I) -> Vec<LinkedResult>
where
    I: IntoIterator<Item = &'a Button>,
{
    let buttons: Vec<&Button> = buttons.into_iter().collect();
    let by_id: HashMap<ButtonId, &Button> = buttons.iter().map(|b| (b.id, *b)).collect();
    let mut seen: HashSet<PairKey> = HashSet::new();
    let mut out = Vec::new();

    for button in &buttons {
        let Some(partner_id) = button.linked_button_id else {
            continue;
        };
        if !button.calculation.enabled || partner_id == button.id {
            continue;
        }
        let pair = PairKey::new(button.id, partner_id);
        if seen.contains(&pair) {
            continue;
        }
        let Some(partner) = by_id.get(&partner_id) else {
            continue;
        };
        seen.insert(pair);
        let op = button.calculation.op;
        out.push(LinkedResult {
            pair,
            button_a: button.id,
            button_b: partner.id,
            op,
            value: apply_op(op, button.clicks, partner.clicks),
        });
    }
    out
}

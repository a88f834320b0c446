#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::model::Calculation;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn linked(n: u128, partner: Option<u128>, op: CalcOp, clicks: u64) -> Button {
    let mut button = Button::new(id(n), id(1000));
    button.linked_button_id = partner.map(id);
    button.calculation = Calculation { op, enabled: partner.is_some() };
    button.clicks = clicks;
    button
}

// =============================================================
// Operators
// =============================================================

#[test]
fn operators_follow_click_arithmetic() {
    assert_eq!(apply_op(CalcOp::Add, 3, 4), 7.0);
    assert_eq!(apply_op(CalcOp::Subtract, 3, 4), -1.0);
    assert_eq!(apply_op(CalcOp::Multiply, 3, 4), 12.0);
    assert_eq!(apply_op(CalcOp::Percentage, 1, 4), 25.0);
}

#[test]
fn percentage_of_zero_partner_is_zero() {
    let value = apply_op(CalcOp::Percentage, 5, 0);
    assert_eq!(value, 0.0);
    assert!(value.is_finite());
}

#[test]
fn display_rounds_to_two_decimals_but_keeps_full_value() {
    let result = LinkedResult {
        pair: PairKey::new(id(1), id(2)),
        button_a: id(1),
        button_b: id(2),
        op: CalcOp::Percentage,
        value: apply_op(CalcOp::Percentage, 1, 3),
    };
    assert_eq!(result.display_value(), 33.33);
    assert_eq!(result.formatted(), "33.33");
    assert!((result.value - 100.0 / 3.0).abs() < 1e-12);
}

// =============================================================
// Pairing
// =============================================================

#[test]
fn pair_key_is_order_independent() {
    assert_eq!(PairKey::new(id(2), id(1)), PairKey::new(id(1), id(2)));
    assert_eq!(PairKey::new(id(2), id(1)), PairKey(id(1), id(2)));
}

#[test]
fn mutual_links_yield_one_result() {
    let buttons = vec![linked(1, Some(2), CalcOp::Add, 2), linked(2, Some(1), CalcOp::Add, 5)];
    let results = compute_all(&buttons);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value, 7.0);
}

#[test]
fn initiating_button_owns_operator_and_operand_order() {
    let buttons = vec![linked(2, Some(1), CalcOp::Subtract, 10), linked(1, Some(2), CalcOp::Multiply, 4)];
    let results = compute_all(&buttons);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].op, CalcOp::Subtract);
    assert_eq!(results[0].button_a, id(2));
    assert_eq!(results[0].button_b, id(1));
    assert_eq!(results[0].value, 6.0);
}

#[test]
fn several_buttons_pointing_at_one_partner_form_distinct_pairs() {
    let buttons = vec![
        linked(1, Some(3), CalcOp::Add, 1),
        linked(2, Some(3), CalcOp::Add, 2),
        linked(3, None, CalcOp::Add, 10),
    ];
    let results = compute_all(&buttons);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].value, 11.0);
    assert_eq!(results[1].value, 12.0);
}

#[test]
fn disabled_calculation_is_skipped() {
    let mut a = linked(1, Some(2), CalcOp::Add, 1);
    a.calculation.enabled = false;
    let buttons = vec![a, linked(2, None, CalcOp::Add, 1)];
    assert!(compute_all(&buttons).is_empty());
}

#[test]
fn disabled_side_does_not_block_enabled_side() {
    let mut a = linked(1, Some(2), CalcOp::Add, 1);
    a.calculation.enabled = false;
    let buttons = vec![a, linked(2, Some(1), CalcOp::Multiply, 3)];
    let results = compute_all(&buttons);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].button_a, id(2));
    assert_eq!(results[0].value, 3.0);
}

#[test]
fn unresolved_partner_is_skipped() {
    let buttons = vec![linked(1, Some(99), CalcOp::Add, 1)];
    assert!(compute_all(&buttons).is_empty());
}

#[test]
fn self_link_is_not_a_pair() {
    let buttons = vec![linked(1, Some(1), CalcOp::Add, 1)];
    assert!(compute_all(&buttons).is_empty());
}

#[test]
fn computing_does_not_touch_clicks() {
    let buttons = vec![linked(1, Some(2), CalcOp::Add, 2), linked(2, None, CalcOp::Add, 5)];
    let before = buttons.clone();
    compute_all(&buttons);
    assert_eq!(buttons, before);
}

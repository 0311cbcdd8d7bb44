//! Field-level receipt checks.
//!
//! Each validator climbs from the field it is attached to and reads the
//! sibling values it needs. Absent or non-numeric siblings count as zero. A
//! validator that cannot find the structure it expects (a row copied out of
//! its receipt) reports nothing.

use tally_forms::validator::error;
use tally_forms::{ControlRef, Validator};

use crate::model::{
    amounts_differ, grand_total_mismatch_message, overall_mismatch_message, total_mismatch_message,
};

pub const OVERALL_MISMATCH: &str = "overallMismatch";
pub const TOTAL_MISMATCH: &str = "totalMismatch";
pub const GRAND_TOTAL_MISMATCH: &str = "grandTotalMismatch";

/// Error kinds that restate a `validate_receipt` check.
pub const MISMATCH_KINDS: [&str; 3] = [OVERALL_MISMATCH, TOTAL_MISMATCH, GRAND_TOTAL_MISMATCH];

fn number_or_zero(control: Option<ControlRef<'_>>) -> f64 {
    control
        .and_then(|c| c.number())
        .filter(|n| !n.is_nan())
        .unwrap_or(0.0)
}

fn sum_rows(list: Option<ControlRef<'_>>, field: &str) -> f64 {
    list.map(|rows| {
        rows.controls()
            .into_iter()
            .map(|row| number_or_zero(row.get(field)))
            .sum()
    })
    .unwrap_or(0.0)
}

/// From a leaf in `total.totals` up to the receipt root.
fn receipt_root<'a>(control: &ControlRef<'a>) -> Option<ControlRef<'a>> {
    let root = control.parent()?.parent()?.parent()?;
    root.get("positions").map(|_| root)
}

/// `overallMismatch` unless `overall == quantity * price` within tolerance.
pub fn overall_matches_quantity_price() -> Validator {
    Validator::new("overallMatchesQuantityPrice", |control| {
        let position = control.parent()?;
        let overall = control.number()?;
        let quantity = number_or_zero(position.get("quantity"));
        let price = number_or_zero(position.get("price"));
        let expected = quantity * price;
        amounts_differ(overall, expected).then(|| {
            error(
                OVERALL_MISMATCH,
                overall_mismatch_message(overall, quantity, price, expected),
            )
        })
    })
}

/// `totalMismatch` unless the total equals the sum of position overalls.
pub fn total_matches_positions_sum() -> Validator {
    Validator::new("totalMatchesPositionsSum", |control| {
        let root = receipt_root(control)?;
        let total = control.number()?;
        let expected = sum_rows(root.get("positions"), "overall");
        amounts_differ(total, expected)
            .then(|| error(TOTAL_MISMATCH, total_mismatch_message(total, expected)))
    })
}

/// `grandTotalMismatch` unless `grandTotal == total + fees - discounts`.
pub fn grand_total_matches_calculation() -> Validator {
    Validator::new("grandTotalMatchesCalculation", |control| {
        let root = receipt_root(control)?;
        let grand_total = control.number()?;
        let total = number_or_zero(root.get("total.totals.total"));
        let fees = sum_rows(root.get("total.fees"), "value");
        let discounts = sum_rows(root.get("total.discounts"), "value");
        let expected = total + fees - discounts;
        amounts_differ(grand_total, expected).then(|| {
            error(
                GRAND_TOTAL_MISMATCH,
                grand_total_mismatch_message(grand_total, total, fees, discounts, expected),
            )
        })
    })
}

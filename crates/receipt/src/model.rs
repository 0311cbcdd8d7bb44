//! Receipt values and the pure arithmetic checks.
//!
//! Three checks describe a consistent receipt:
//! 1. every position's `overall` equals `quantity * price`
//! 2. `totals.total` equals the sum of all position `overall` values
//! 3. `totals.grandTotal` equals `total + fees - discounts`
//!
//! The same checks run per field inside the form (see `validators`); both
//! sides build their messages with the helpers at the bottom of this module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tally_forms::{format_number, Value};

use crate::error::ReceiptError;

/// Amounts closer than this are considered equal.
pub const TOLERANCE: f64 = 0.01;

/// Slack for binary rounding, so that a difference of exactly one cent
/// (`20.01 - 20`) is still within tolerance.
const ROUNDING_SLACK: f64 = 1e-9;

// ──────────────────────────────────────────────
// Values
// ──────────────────────────────────────────────

/// One line item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub overall: f64,
}

/// A fee or discount. Which one is decided by the list it sits in; the sign
/// of `value` is never interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total: f64,
    pub grand_total: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TotalSection {
    pub fees: Vec<Modifier>,
    pub discounts: Vec<Modifier>,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Receipt {
    pub positions: Vec<Position>,
    pub total: TotalSection,
}

/// Result of `validate_receipt`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

// ──────────────────────────────────────────────
// Conversion to and from form values
// ──────────────────────────────────────────────

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn shape(prefix: &str, key: &str, expected: &'static str) -> ReceiptError {
    ReceiptError::Shape {
        path: join(prefix, key),
        expected,
    }
}

fn number_at(value: &Value, prefix: &str, key: &str) -> Result<f64, ReceiptError> {
    value
        .get(key)
        .and_then(Value::as_number)
        .ok_or_else(|| shape(prefix, key, "number"))
}

fn text_at(value: &Value, prefix: &str, key: &str) -> Result<String, ReceiptError> {
    value
        .get(key)
        .and_then(Value::as_text)
        .map(str::to_string)
        .ok_or_else(|| shape(prefix, key, "text"))
}

fn list_at<'a>(value: &'a Value, prefix: &str, key: &str) -> Result<&'a [Value], ReceiptError> {
    value
        .get(key)
        .and_then(Value::as_list)
        .ok_or_else(|| shape(prefix, key, "list"))
}

fn record_at<'a>(value: &'a Value, prefix: &str, key: &str) -> Result<&'a Value, ReceiptError> {
    value
        .get(key)
        .filter(|v| v.as_record().is_some())
        .ok_or_else(|| shape(prefix, key, "record"))
}

fn record(fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::Record(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

impl Position {
    fn from_value(value: &Value, prefix: &str) -> Result<Position, ReceiptError> {
        Ok(Position {
            name: text_at(value, prefix, "name")?,
            quantity: number_at(value, prefix, "quantity")?,
            price: number_at(value, prefix, "price")?,
            overall: number_at(value, prefix, "overall")?,
        })
    }

    pub fn to_value(&self) -> Value {
        record([
            ("name", Value::from(self.name.as_str())),
            ("quantity", Value::Number(self.quantity)),
            ("price", Value::Number(self.price)),
            ("overall", Value::Number(self.overall)),
        ])
    }
}

impl Modifier {
    fn from_value(value: &Value, prefix: &str) -> Result<Modifier, ReceiptError> {
        Ok(Modifier {
            name: text_at(value, prefix, "name")?,
            value: number_at(value, prefix, "value")?,
        })
    }

    pub fn to_value(&self) -> Value {
        record([
            ("name", Value::from(self.name.as_str())),
            ("value", Value::Number(self.value)),
        ])
    }
}

fn modifiers_from(items: &[Value], prefix: &str) -> Result<Vec<Modifier>, ReceiptError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| Modifier::from_value(item, &join(prefix, &i.to_string())))
        .collect()
}

impl Receipt {
    /// Read a receipt out of a form value (normally a `raw_value`).
    pub fn from_value(value: &Value) -> Result<Receipt, ReceiptError> {
        let positions = list_at(value, "", "positions")?
            .iter()
            .enumerate()
            .map(|(i, item)| Position::from_value(item, &format!("positions.{}", i)))
            .collect::<Result<Vec<_>, _>>()?;
        let section = record_at(value, "", "total")?;
        let totals = record_at(section, "total", "totals")?;
        Ok(Receipt {
            positions,
            total: TotalSection {
                fees: modifiers_from(list_at(section, "total", "fees")?, "total.fees")?,
                discounts: modifiers_from(
                    list_at(section, "total", "discounts")?,
                    "total.discounts",
                )?,
                totals: Totals {
                    total: number_at(totals, "total.totals", "total")?,
                    grand_total: number_at(totals, "total.totals", "grandTotal")?,
                },
            },
        })
    }

    pub fn to_value(&self) -> Value {
        let modifiers = |items: &[Modifier]| Value::List(items.iter().map(Modifier::to_value).collect());
        record([
            (
                "positions",
                Value::List(self.positions.iter().map(Position::to_value).collect()),
            ),
            (
                "total",
                record([
                    ("fees", modifiers(&self.total.fees)),
                    ("discounts", modifiers(&self.total.discounts)),
                    (
                        "totals",
                        record([
                            ("total", Value::Number(self.total.totals.total)),
                            ("grandTotal", Value::Number(self.total.totals.grand_total)),
                        ]),
                    ),
                ]),
            ),
        ])
    }
}

// ──────────────────────────────────────────────
// Arithmetic
// ──────────────────────────────────────────────

/// True when two amounts differ by more than `TOLERANCE`.
///
/// `NaN` on either side never differs; the input validators catch those.
pub fn amounts_differ(actual: f64, expected: f64) -> bool {
    (expected - actual).abs() > TOLERANCE + ROUNDING_SLACK
}

pub fn calculate_positions_total(positions: &[Position]) -> f64 {
    positions.iter().map(|p| p.overall).sum()
}

pub fn sum_modifiers(modifiers: &[Modifier]) -> f64 {
    modifiers.iter().map(|m| m.value).sum()
}

/// `total + fees - discounts`, using the stated total.
pub fn calculate_grand_total(receipt: &Receipt) -> f64 {
    receipt.total.totals.total + sum_modifiers(&receipt.total.fees)
        - sum_modifiers(&receipt.total.discounts)
}

/// Message for a position whose `overall` is not `quantity * price`.
pub fn validate_position(position: &Position) -> Option<String> {
    let expected = position.quantity * position.price;
    amounts_differ(position.overall, expected).then(|| {
        format!(
            "Position {}: overall value {} doesn't match quantity * price ({} * {} = {})",
            position.name,
            format_number(position.overall),
            format_number(position.quantity),
            format_number(position.price),
            format_number(expected)
        )
    })
}

pub fn validate_all_positions(positions: &[Position]) -> Vec<String> {
    positions
        .iter()
        .enumerate()
        .filter_map(|(index, position)| {
            validate_position(position).map(|message| format!("{} at index {}", message, index))
        })
        .collect()
}

pub fn validate_total(receipt: &Receipt) -> Option<String> {
    let expected = calculate_positions_total(&receipt.positions);
    let total = receipt.total.totals.total;
    amounts_differ(total, expected).then(|| total_mismatch_message(total, expected))
}

pub fn validate_grand_total(receipt: &Receipt) -> Option<String> {
    let totals = &receipt.total.totals;
    let fees = sum_modifiers(&receipt.total.fees);
    let discounts = sum_modifiers(&receipt.total.discounts);
    let expected = calculate_grand_total(receipt);
    amounts_differ(totals.grand_total, expected).then(|| {
        grand_total_mismatch_message(totals.grand_total, totals.total, fees, discounts, expected)
    })
}

/// Run all three checks; `is_valid` iff no message was produced.
pub fn validate_receipt(receipt: &Receipt) -> ReceiptValidation {
    let mut errors = validate_all_positions(&receipt.positions);
    errors.extend(validate_total(receipt));
    errors.extend(validate_grand_total(receipt));
    ReceiptValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

// ──────────────────────────────────────────────
// Shared message formats
// ──────────────────────────────────────────────

pub(crate) fn overall_mismatch_message(overall: f64, quantity: f64, price: f64, expected: f64) -> String {
    format!(
        "Overall value {} doesn't match quantity * price ({} * {} = {})",
        format_number(overall),
        format_number(quantity),
        format_number(price),
        format_number(expected)
    )
}

pub(crate) fn total_mismatch_message(total: f64, expected: f64) -> String {
    format!(
        "Total {} doesn't match the sum of all position overall values ({})",
        format_number(total),
        format_number(expected)
    )
}

pub(crate) fn grand_total_mismatch_message(
    grand_total: f64,
    total: f64,
    fees: f64,
    discounts: f64,
    expected: f64,
) -> String {
    format!(
        "Final grand total {} doesn't match total + fees - discounts ({} + {} - {} = {})",
        format_number(grand_total),
        format_number(total),
        format_number(fees),
        format_number(discounts),
        format_number(expected)
    )
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

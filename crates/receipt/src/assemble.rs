//! Receipt form assembly and scenario selection.
//!
//! A receipt that passes `validate_receipt` is opened in the editing
//! scenario: computed fields (`overall`, `total`, `grandTotal`) are disabled
//! and kept up to date by calculators. A receipt that fails is opened in the
//! validation scenario: every field stays editable and the mismatch
//! validators re-run on every edit until the user has reconciled the values.

use std::fmt;

use serde::Serialize;
use tally_forms::{
    number_more_than_zero, string_not_empty, Calculator, ControlId, ControlKey, ControlKind,
    ControlSpec, FieldError, Form, FormError, UpdateOptions, Value,
};
use tracing::{debug, info};

use crate::error::ReceiptError;
use crate::input::parse_decimal_input;
use crate::model::{validate_receipt, Modifier, Position, Receipt, ReceiptValidation};
use crate::validators::{
    grand_total_matches_calculation, overall_matches_quantity_price, total_matches_positions_sum,
};

/// How a receipt form is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Consistent data: computed fields locked and recalculated.
    Editing,
    /// Inconsistent data: everything editable, mismatches reported.
    Validation,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Editing => f.write_str("editing"),
            ScenarioKind::Validation => f.write_str("validation"),
        }
    }
}

pub fn select_scenario(receipt: &Receipt) -> ScenarioKind {
    if validate_receipt(receipt).is_valid {
        ScenarioKind::Editing
    } else {
        ScenarioKind::Validation
    }
}

// ──────────────────────────────────────────────
// Row and tree specs
// ──────────────────────────────────────────────

fn child(form: &Form, id: ControlId, path: &str) -> Result<ControlId, FormError> {
    form.get_path(id, path).ok_or_else(|| FormError::MissingControl {
        key: ControlKey::Name(path.to_string()),
    })
}

fn number_field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_number).unwrap_or(f64::NAN)
}

fn sum_field(list: Option<&Value>, key: &str) -> f64 {
    list.and_then(Value::as_list)
        .map(|rows| rows.iter().map(|row| number_field(row, key)).sum())
        .unwrap_or(0.0)
}

/// Keeps a position's `overall` at `quantity * price`.
fn overall_calculator() -> Calculator {
    Calculator::new("overall", |form, position| {
        let raw = form.raw_value(position)?;
        let product = number_field(&raw, "quantity") * number_field(&raw, "price");
        let overall = child(form, position, "overall")?;
        if form.set_calculated(overall, Value::Number(product))? {
            debug!(control = %overall, overall = product, "recalculated position");
        }
        Ok(())
    })
}

/// Keeps `total` and `grandTotal` in step with positions and modifiers.
fn totals_calculator() -> Calculator {
    Calculator::new("totals", |form, root| {
        let raw = form.raw_value(root)?;
        let section = raw.get("total");
        let total = sum_field(raw.get("positions"), "overall");
        let fees = sum_field(section.and_then(|s| s.get("fees")), "value");
        let discounts = sum_field(section.and_then(|s| s.get("discounts")), "value");
        let grand_total = total + fees - discounts;

        let total_id = child(form, root, "total.totals.total")?;
        let grand_id = child(form, root, "total.totals.grandTotal")?;
        let changed = form.set_calculated(total_id, Value::Number(total))?
            | form.set_calculated(grand_id, Value::Number(grand_total))?;
        if changed {
            debug!(total, grand_total, "recalculated totals");
            // Groups between the leaves and the root cache stale aggregates;
            // each refresh emits once without bubbling to the root.
            for path in ["total.totals", "total"] {
                let id = child(form, root, path)?;
                form.update_value_and_validity(id, UpdateOptions::only_self())?;
            }
        }
        Ok(())
    })
}

pub fn position_spec(position: &Position, scenario: ScenarioKind) -> ControlSpec {
    let editing = scenario == ScenarioKind::Editing;
    let spec = ControlSpec::group([
        (
            "name",
            ControlSpec::leaf(position.name.as_str()).with_validator(string_not_empty()),
        ),
        (
            "quantity",
            ControlSpec::leaf(position.quantity).with_validator(number_more_than_zero()),
        ),
        (
            "price",
            ControlSpec::leaf(position.price).with_validator(number_more_than_zero()),
        ),
        (
            "overall",
            ControlSpec::leaf(position.overall)
                .with_validator(overall_matches_quantity_price())
                .with_disabled(editing),
        ),
    ]);
    if editing {
        spec.with_calculator(overall_calculator())
    } else {
        // A detached row draft has no root calculator to refresh `overall`.
        spec.with_calculator(Calculator::revalidate())
    }
}

pub fn modifier_spec(modifier: &Modifier) -> ControlSpec {
    ControlSpec::group([
        (
            "name",
            ControlSpec::leaf(modifier.name.as_str()).with_validator(string_not_empty()),
        ),
        (
            "value",
            ControlSpec::leaf(modifier.value).with_validator(number_more_than_zero()),
        ),
    ])
}

fn receipt_spec(receipt: &Receipt, scenario: ScenarioKind) -> ControlSpec {
    let editing = scenario == ScenarioKind::Editing;
    let totals = &receipt.total.totals;
    let modifiers = |items: &[Modifier]| ControlSpec::array(items.iter().map(modifier_spec));
    let spec = ControlSpec::group([
        (
            "positions",
            ControlSpec::array(receipt.positions.iter().map(|p| position_spec(p, scenario))),
        ),
        (
            "total",
            ControlSpec::group([
                ("fees", modifiers(&receipt.total.fees)),
                ("discounts", modifiers(&receipt.total.discounts)),
                (
                    "totals",
                    ControlSpec::group([
                        (
                            "total",
                            ControlSpec::leaf(totals.total)
                                .with_validator(total_matches_positions_sum())
                                .with_disabled(editing),
                        ),
                        (
                            "grandTotal",
                            ControlSpec::leaf(totals.grand_total)
                                .with_validator(grand_total_matches_calculation())
                                .with_disabled(editing),
                        ),
                    ]),
                ),
            ]),
        ),
    ]);
    if editing {
        spec.with_calculator(totals_calculator())
    } else {
        spec.with_calculator(Calculator::revalidate())
    }
}

/// Computed fields locked, recalculated on every change.
pub fn build_editing_form(receipt: &Receipt) -> Form {
    Form::new(receipt_spec(receipt, ScenarioKind::Editing))
}

/// Everything editable, mismatch messages refreshed on every change.
pub fn build_validation_form(receipt: &Receipt) -> Form {
    Form::new(receipt_spec(receipt, ScenarioKind::Validation))
}

// ──────────────────────────────────────────────
// ReceiptForm
// ──────────────────────────────────────────────

/// A receipt form together with the scenario it was built for.
#[derive(Debug)]
pub struct ReceiptForm {
    pub(crate) form: Form,
    scenario: ScenarioKind,
}

impl ReceiptForm {
    /// Build the form, choosing the scenario from the receipt's consistency.
    pub fn new(receipt: &Receipt) -> Self {
        ReceiptForm::with_scenario(receipt, select_scenario(receipt))
    }

    pub fn with_scenario(receipt: &Receipt, scenario: ScenarioKind) -> Self {
        let form = match scenario {
            ScenarioKind::Editing => build_editing_form(receipt),
            ScenarioKind::Validation => build_validation_form(receipt),
        };
        info!(
            %scenario,
            positions = receipt.positions.len(),
            "receipt form built"
        );
        ReceiptForm { form, scenario }
    }

    pub fn scenario(&self) -> ScenarioKind {
        self.scenario
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    pub fn root(&self) -> ControlId {
        self.form.root()
    }

    /// Control at a dot-separated path (`positions.0.price`).
    pub fn field(&self, path: &str) -> Result<ControlId, ReceiptError> {
        self.form
            .get_path(self.form.root(), path)
            .ok_or_else(|| ReceiptError::UnknownField {
                path: path.to_string(),
            })
    }

    pub fn positions(&self) -> Result<ControlId, ReceiptError> {
        self.field("positions")
    }

    pub fn fees(&self) -> Result<ControlId, ReceiptError> {
        self.field("total.fees")
    }

    pub fn discounts(&self) -> Result<ControlId, ReceiptError> {
        self.field("total.discounts")
    }

    pub fn total(&self) -> Result<ControlId, ReceiptError> {
        self.field("total.totals.total")
    }

    pub fn grand_total(&self) -> Result<ControlId, ReceiptError> {
        self.field("total.totals.grandTotal")
    }

    pub fn position(&self, index: usize) -> Option<ControlId> {
        let positions = self.positions().ok()?;
        self.form.at(positions, index)
    }

    /// Row group of a fee, discount or position.
    pub fn modifier(&self, list: crate::rows::RowList, index: usize) -> Option<ControlId> {
        let array = self.list(list).ok()?;
        self.form.at(array, index)
    }

    /// The current receipt, disabled fields included.
    pub fn receipt(&self) -> Result<Receipt, ReceiptError> {
        Receipt::from_value(&self.form.raw_value(self.form.root())?)
    }

    /// `validate_receipt` on the current raw value.
    pub fn validation(&self) -> Result<ReceiptValidation, ReceiptError> {
        Ok(validate_receipt(&self.receipt()?))
    }

    pub fn is_valid(&self) -> bool {
        self.form.is_valid(self.form.root()).unwrap_or(false)
    }

    /// Every field message in the form.
    pub fn errors(&self) -> Result<Vec<FieldError>, ReceiptError> {
        Ok(self.form.collect_errors(self.form.root())?)
    }

    /// Apply user input to one leaf.
    ///
    /// Numeric fields go through `parse_decimal_input`; the field is marked
    /// touched and dirty. Computed fields of the editing scenario refuse
    /// input.
    pub fn apply_input(&mut self, path: &str, input: &str) -> Result<(), ReceiptError> {
        let id = self.field(path)?;
        if self.form.kind(id)? != ControlKind::Leaf {
            return Err(ReceiptError::Shape {
                path: path.to_string(),
                expected: "leaf",
            });
        }
        if self.form.is_disabled(id)? {
            return Err(ReceiptError::FieldDisabled {
                path: path.to_string(),
            });
        }
        let value = input_value(self.form.value(id)?, input);
        debug!(path, input, "applying input");
        let opts = UpdateOptions::default();
        self.form.mark_as_touched(id, opts)?;
        self.form.mark_as_dirty(id, opts)?;
        self.form.set_value(id, value, opts)?;
        Ok(())
    }
}

/// Parse `input` according to the kind of value the field currently holds.
pub(crate) fn input_value(current: &Value, input: &str) -> Value {
    match current {
        Value::Number(_) => Value::Number(parse_decimal_input(input)),
        _ => Value::from(input),
    }
}

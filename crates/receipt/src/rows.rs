//! Row drafts: adding, editing and removing positions, fees and discounts.
//!
//! A draft is an independent form holding one row. Edits to the draft never
//! reach the receipt form until `ReceiptForm::commit`; dropping the draft
//! discards them.

use std::fmt;
use std::str::FromStr;

use tally_forms::{ControlId, FieldError, Form, FormError, UpdateOptions, Value};
use tracing::debug;

use crate::assemble::{input_value, modifier_spec, position_spec, ReceiptForm, ScenarioKind};
use crate::error::ReceiptError;
use crate::model::{Modifier, Position};

/// The three row arrays of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowList {
    Positions,
    Fees,
    Discounts,
}

impl RowList {
    /// Path of the array inside the receipt form.
    pub fn path(self) -> &'static str {
        match self {
            RowList::Positions => "positions",
            RowList::Fees => "total.fees",
            RowList::Discounts => "total.discounts",
        }
    }

    /// A blank row: empty name, zero amounts.
    fn blank_spec(self, scenario: ScenarioKind) -> tally_forms::ControlSpec {
        match self {
            RowList::Positions => position_spec(&Position::default(), scenario),
            RowList::Fees | RowList::Discounts => modifier_spec(&Modifier::default()),
        }
    }
}

impl fmt::Display for RowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowList::Positions => f.write_str("positions"),
            RowList::Fees => f.write_str("fees"),
            RowList::Discounts => f.write_str("discounts"),
        }
    }
}

impl FromStr for RowList {
    type Err = ReceiptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "position" | "positions" => Ok(RowList::Positions),
            "fee" | "fees" => Ok(RowList::Fees),
            "discount" | "discounts" => Ok(RowList::Discounts),
            other => Err(ReceiptError::UnknownList {
                name: other.to_string(),
            }),
        }
    }
}

/// Where a committed draft lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    /// Patched back into the row at this index.
    Existing(usize),
    /// Inserted at the front of the list.
    New,
}

/// A staged copy of one row.
#[derive(Debug)]
pub struct RowDraft {
    list: RowList,
    target: RowTarget,
    form: Form,
}

impl RowDraft {
    pub fn list(&self) -> RowList {
        self.list
    }

    pub fn target(&self) -> RowTarget {
        self.target
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn value(&self) -> Result<Value, ReceiptError> {
        Ok(self.form.raw_value(self.form.root())?)
    }

    /// Apply user input to one field of the row.
    pub fn set_field(&mut self, name: &str, input: &str) -> Result<(), ReceiptError> {
        let id = self
            .form
            .get(self.form.root(), name)
            .ok_or_else(|| ReceiptError::UnknownField {
                path: name.to_string(),
            })?;
        if self.form.is_disabled(id)? {
            return Err(ReceiptError::FieldDisabled {
                path: name.to_string(),
            });
        }
        let value = input_value(self.form.value(id)?, input);
        let opts = UpdateOptions::default();
        self.form.mark_as_touched(id, opts)?;
        self.form.mark_as_dirty(id, opts)?;
        self.form.set_value(id, value, opts)?;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.form.is_valid(self.form.root()).unwrap_or(false)
    }

    pub fn errors(&self) -> Result<Vec<FieldError>, ReceiptError> {
        Ok(self.form.collect_errors(self.form.root())?)
    }

    /// Fields in error with their messages.
    ///
    /// With `hide_until_touched`, untouched fields of a brand-new row are
    /// left out; `overall` and rows being edited always show their errors.
    pub fn visible_errors(&self, hide_until_touched: bool) -> Vec<(String, Vec<String>)> {
        let hide = hide_until_touched && self.target == RowTarget::New;
        let Ok(fields) = self.form.controls(self.form.root()) else {
            return Vec::new();
        };
        fields
            .into_iter()
            .filter_map(|(key, id)| {
                let name = key.segment();
                let errors = self.form.errors(id).ok().flatten()?;
                let touched = self.form.touched(id).unwrap_or(false);
                if hide && name != "overall" && !touched {
                    return None;
                }
                Some((name, errors.values().cloned().collect()))
            })
            .collect()
    }
}

impl ReceiptForm {
    /// The array control of a row list.
    pub fn list(&self, list: RowList) -> Result<ControlId, ReceiptError> {
        self.field(list.path())
    }

    pub fn row_count(&self, list: RowList) -> Result<usize, ReceiptError> {
        Ok(self.form.len(self.list(list)?)?)
    }

    fn row(&self, list: RowList, index: usize) -> Result<ControlId, ReceiptError> {
        let array = self.list(list)?;
        let len = self.form.len(array)?;
        self.form
            .at(array, index)
            .ok_or(ReceiptError::Form(FormError::IndexOutOfRange { index, len }))
    }

    /// Stage a copy of an existing row for editing.
    pub fn edit_row(&self, list: RowList, index: usize) -> Result<RowDraft, ReceiptError> {
        let row = self.row(list, index)?;
        let form = self.form.copy_control(row)?;
        debug!(%list, index, "editing row");
        Ok(RowDraft {
            list,
            target: RowTarget::Existing(index),
            form,
        })
    }

    /// Stage a blank row built for this form's scenario.
    pub fn new_row(&self, list: RowList) -> RowDraft {
        debug!(%list, "new row");
        RowDraft {
            list,
            target: RowTarget::New,
            form: Form::new(list.blank_spec(self.scenario())),
        }
    }

    /// Write a draft back. Invalid drafts are refused.
    ///
    /// An edited row is patched in place in one pass; a new row is inserted
    /// at index 0. Returns the id of the affected row.
    pub fn commit(&mut self, draft: RowDraft) -> Result<ControlId, ReceiptError> {
        if !draft.is_valid() {
            return Err(ReceiptError::DraftInvalid {
                errors: draft.errors()?,
            });
        }
        let opts = UpdateOptions::default();
        let row = match draft.target {
            RowTarget::Existing(index) => {
                let row = self.row(draft.list, index)?;
                self.form.patch_value(row, draft.value()?, opts)?;
                row
            }
            RowTarget::New => {
                let array = self.list(draft.list)?;
                let spec = draft.form.spec_of(draft.form.root())?;
                self.form.insert(array, 0, spec, opts)?
            }
        };
        debug!(list = %draft.list, target = ?draft.target, "row committed");
        Ok(row)
    }

    pub fn remove_row(&mut self, list: RowList, index: usize) -> Result<(), ReceiptError> {
        let array = self.list(list)?;
        self.form.remove_at(array, index, UpdateOptions::default())?;
        debug!(%list, index, "row removed");
        Ok(())
    }
}

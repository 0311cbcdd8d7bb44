//! The two-stage receipt session.
//!
//! A session starts in `Review` with a form built from the submitted
//! receipt. `proceed` reads the raw value back out and builds a brand-new
//! form for `Confirmation`; the review form is dropped rather than rewired,
//! since the two scenarios differ in which fields are disabled and which
//! calculators run.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::assemble::ReceiptForm;
use crate::error::ReceiptError;
use crate::model::{validate_receipt, Receipt};
use crate::validators::MISMATCH_KINDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Review,
    Confirmation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Review => f.write_str("review"),
            Stage::Confirmation => f.write_str("confirmation"),
        }
    }
}

#[derive(Debug)]
pub struct ReceiptSession {
    stage: Stage,
    form: ReceiptForm,
}

impl ReceiptSession {
    pub fn new(receipt: &Receipt) -> Self {
        ReceiptSession {
            stage: Stage::Review,
            form: ReceiptForm::new(receipt),
        }
    }

    /// Parse receipt JSON and open a session on it.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ReceiptError> {
        let receipt: Receipt = serde_json::from_value(json.clone())?;
        Ok(ReceiptSession::new(&receipt))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn form(&self) -> &ReceiptForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ReceiptForm {
        &mut self.form
    }

    /// Messages that keep the receipt from moving on: every failed
    /// arithmetic check, then every other field error.
    pub fn blocking_errors(&self) -> Result<Vec<String>, ReceiptError> {
        let receipt = self.form.receipt()?;
        let mut errors = validate_receipt(&receipt).errors;
        errors.extend(
            self.form
                .errors()?
                .into_iter()
                .filter(|e| !MISMATCH_KINDS.contains(&e.kind.as_str()))
                .map(|e| format!("{}: {}", e.path, e.message)),
        );
        Ok(errors)
    }

    fn checked_receipt(&self) -> Result<Receipt, ReceiptError> {
        let errors = self.blocking_errors()?;
        if !errors.is_empty() {
            warn!(stage = %self.stage, errors = errors.len(), "receipt blocked");
            return Err(ReceiptError::ProceedBlocked { errors });
        }
        self.form.receipt()
    }

    /// Move from review to confirmation with a freshly built form.
    pub fn proceed(&mut self) -> Result<(), ReceiptError> {
        if self.stage == Stage::Confirmation {
            return Err(ReceiptError::NoNextStage);
        }
        let receipt = self.checked_receipt()?;
        self.form = ReceiptForm::new(&receipt);
        self.stage = Stage::Confirmation;
        info!(stage = %self.stage, scenario = %self.form.scenario(), "stage changed");
        Ok(())
    }

    /// The finished receipt, subject to the same checks as `proceed`.
    pub fn finish(self) -> Result<Receipt, ReceiptError> {
        self.checked_receipt()
    }
}

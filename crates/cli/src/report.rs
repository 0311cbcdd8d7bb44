//! Receipt reports in text or JSON.

use std::fmt::Write as _;

use serde::Serialize;
use tally_forms::{format_number, FieldError};
use tally_receipt::validators::MISMATCH_KINDS;
use tally_receipt::{validate_receipt, Modifier, ReceiptError, ReceiptForm, ScenarioKind, Stage};

use crate::{Context, OutputFormat};

#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub stage: Stage,
    pub scenario: ScenarioKind,
    pub valid: bool,
    pub receipt: tally_receipt::Receipt,
    /// Failed arithmetic checks of the whole receipt.
    pub checks: Vec<String>,
    /// Every field message in the form.
    pub fields: Vec<FieldError>,
}

impl Report {
    pub fn build(stage: Stage, form: &ReceiptForm) -> Result<Report, ReceiptError> {
        let receipt = form.receipt()?;
        let checks = validate_receipt(&receipt).errors;
        let fields = form.errors()?;
        Ok(Report {
            stage,
            scenario: form.scenario(),
            valid: checks.is_empty() && fields.is_empty(),
            receipt,
            checks,
            fields,
        })
    }

    pub fn render(&self, ctx: &Context) -> String {
        match ctx.output {
            OutputFormat::Text => self.to_text(),
            OutputFormat::Json => {
                let rendered = if ctx.pretty {
                    serde_json::to_string_pretty(self)
                } else {
                    serde_json::to_string(self)
                };
                rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
            }
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        let verdict = if self.valid { "valid" } else { "invalid" };
        let _ = writeln!(out, "receipt: {} ({}, {})", verdict, self.scenario, self.stage);

        let _ = writeln!(out, "positions:");
        if self.receipt.positions.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for p in &self.receipt.positions {
            let _ = writeln!(
                out,
                "  {}: {} x {} = {}",
                p.name,
                format_number(p.quantity),
                format_number(p.price),
                format_number(p.overall)
            );
        }
        write_modifiers(&mut out, "fees", &self.receipt.total.fees);
        write_modifiers(&mut out, "discounts", &self.receipt.total.discounts);

        let totals = &self.receipt.total.totals;
        let _ = writeln!(out, "total: {}", format_number(totals.total));
        let _ = writeln!(out, "grand total: {}", format_number(totals.grand_total));

        if !self.valid {
            let _ = writeln!(out, "errors:");
            for check in &self.checks {
                let _ = writeln!(out, "  - {}", check);
            }
            // Mismatch messages on fields repeat the checks above.
            for field in self
                .fields
                .iter()
                .filter(|f| !MISMATCH_KINDS.contains(&f.kind.as_str()))
            {
                let _ = writeln!(out, "  - {}: {}", field.path, field.message);
            }
        }
        out
    }
}

fn write_modifiers(out: &mut String, label: &str, modifiers: &[Modifier]) {
    let _ = writeln!(out, "{}:", label);
    if modifiers.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for m in modifiers {
        let _ = writeln!(out, "  {}: {}", m.name, format_number(m.value));
    }
}

pub(crate) mod check;
pub(crate) mod edit;
pub(crate) mod proceed;

use std::path::Path;

use tally_receipt::{ReceiptError, ReceiptForm, ReceiptSession, Stage};

use crate::report::Report;
use crate::{report_error, Context, EXIT_ERROR, EXIT_INVALID, EXIT_OK};

/// Read a receipt JSON file and open a review session on it.
pub(crate) fn open_session(file: &Path) -> Result<ReceiptSession, String> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("error reading file '{}': {}", file.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in '{}': {}", file.display(), e))?;
    ReceiptSession::from_json(&json).map_err(|e| format!("'{}': {}", file.display(), describe(&e)))
}

/// One-line error text; draft errors carry their field messages.
pub(crate) fn describe(err: &ReceiptError) -> String {
    match err {
        ReceiptError::DraftInvalid { errors } => {
            let details: Vec<String> = errors
                .iter()
                .map(|e| format!("{}: {}", e.path, e.message))
                .collect();
            format!("{} ({})", err, details.join("; "))
        }
        other => other.to_string(),
    }
}

pub(crate) fn write_receipt(form: &ReceiptForm, out: &Path) -> Result<(), String> {
    let receipt = form.receipt().map_err(|e| describe(&e))?;
    let json = serde_json::to_string_pretty(&receipt)
        .map_err(|e| format!("could not serialize receipt: {}", e))?;
    std::fs::write(out, json + "\n")
        .map_err(|e| format!("error writing file '{}': {}", out.display(), e))
}

/// Print the report for `form`, optionally save the receipt, and pick the
/// exit code: 0 when valid, 2 when the receipt has errors.
pub(crate) fn finish_report(
    stage: Stage,
    form: &ReceiptForm,
    out: Option<&Path>,
    ctx: &Context,
) -> i32 {
    let report = match Report::build(stage, form) {
        Ok(report) => report,
        Err(e) => {
            report_error(&describe(&e), ctx);
            return EXIT_ERROR;
        }
    };
    if let Some(out) = out {
        if let Err(msg) = write_receipt(form, out) {
            report_error(&msg, ctx);
            return EXIT_ERROR;
        }
    }
    println!("{}", report.render(ctx).trim_end());
    if report.valid {
        EXIT_OK
    } else {
        EXIT_INVALID
    }
}

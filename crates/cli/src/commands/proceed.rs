use std::path::Path;

use tally_receipt::ReceiptError;

use super::{describe, finish_report, open_session};
use crate::report::Report;
use crate::{report_error, Context, EXIT_ERROR, EXIT_INVALID};

pub(crate) fn cmd_proceed(file: &Path, out: Option<&Path>, ctx: &Context) -> i32 {
    let mut session = match open_session(file) {
        Ok(session) => session,
        Err(msg) => {
            report_error(&msg, ctx);
            return EXIT_ERROR;
        }
    };

    match session.proceed() {
        Ok(()) => finish_report(session.stage(), session.form(), out, ctx),
        Err(err @ ReceiptError::ProceedBlocked { .. }) => {
            match Report::build(session.stage(), session.form()) {
                Ok(report) => println!("{}", report.render(ctx).trim_end()),
                Err(e) => report_error(&describe(&e), ctx),
            }
            report_error(&describe(&err), ctx);
            EXIT_INVALID
        }
        Err(err) => {
            report_error(&describe(&err), ctx);
            EXIT_ERROR
        }
    }
}

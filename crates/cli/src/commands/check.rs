use std::path::Path;

use tracing::debug;

use super::{finish_report, open_session};
use crate::{report_error, Context, EXIT_ERROR};

pub(crate) fn cmd_check(file: &Path, ctx: &Context) -> i32 {
    let session = match open_session(file) {
        Ok(session) => session,
        Err(msg) => {
            report_error(&msg, ctx);
            return EXIT_ERROR;
        }
    };
    debug!(file = %file.display(), scenario = %session.form().scenario(), "checking receipt");
    finish_report(session.stage(), session.form(), None, ctx)
}

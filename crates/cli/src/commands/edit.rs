use std::path::Path;

use tally_receipt::{ReceiptError, ReceiptForm, RowList};
use tracing::info;

use super::{describe, finish_report, open_session};
use crate::{report_error, Context, EXIT_ERROR};

/// Raw edit arguments, as given on the command line.
#[derive(Debug, Default)]
pub(crate) struct Edits {
    pub set: Vec<String>,
    pub add_position: Vec<String>,
    pub add_fee: Vec<String>,
    pub add_discount: Vec<String>,
    pub remove: Vec<String>,
}

#[derive(Debug, PartialEq)]
struct NewPosition<'a> {
    name: &'a str,
    quantity: &'a str,
    price: &'a str,
    overall: Option<&'a str>,
}

fn parse_set(arg: &str) -> Result<(&str, &str), String> {
    arg.split_once('=')
        .filter(|(path, _)| !path.is_empty())
        .ok_or_else(|| format!("invalid --set '{}': expected PATH=INPUT", arg))
}

fn parse_remove(arg: &str) -> Result<(RowList, usize), String> {
    let (list, index) = arg
        .split_once(':')
        .ok_or_else(|| format!("invalid --remove '{}': expected LIST:INDEX", arg))?;
    let list: RowList = list.parse().map_err(|e: ReceiptError| e.to_string())?;
    let index = index
        .parse()
        .map_err(|_| format!("invalid --remove '{}': index must be a number", arg))?;
    Ok((list, index))
}

fn parse_position(arg: &str) -> Result<NewPosition<'_>, String> {
    let parts: Vec<&str> = arg.split(':').collect();
    match parts[..] {
        [name, quantity, price] => Ok(NewPosition {
            name,
            quantity,
            price,
            overall: None,
        }),
        [name, quantity, price, overall] => Ok(NewPosition {
            name,
            quantity,
            price,
            overall: Some(overall),
        }),
        _ => Err(format!(
            "invalid --add-position '{}': expected NAME:QTY:PRICE[:OVERALL]",
            arg
        )),
    }
}

fn parse_modifier<'a>(flag: &str, arg: &'a str) -> Result<(&'a str, &'a str), String> {
    arg.rsplit_once(':')
        .ok_or_else(|| format!("invalid --{} '{}': expected NAME:VALUE", flag, arg))
}

fn add_position(form: &mut ReceiptForm, position: &NewPosition<'_>) -> Result<(), ReceiptError> {
    let mut draft = form.new_row(RowList::Positions);
    draft.set_field("name", position.name)?;
    draft.set_field("quantity", position.quantity)?;
    draft.set_field("price", position.price)?;
    if let Some(overall) = position.overall {
        draft.set_field("overall", overall)?;
    }
    form.commit(draft)?;
    Ok(())
}

fn add_modifier(
    form: &mut ReceiptForm,
    list: RowList,
    name: &str,
    value: &str,
) -> Result<(), ReceiptError> {
    let mut draft = form.new_row(list);
    draft.set_field("name", name)?;
    draft.set_field("value", value)?;
    form.commit(draft)?;
    Ok(())
}

/// Apply every edit in order. `--set` paths address the input file, so they
/// run before any row moves.
fn apply_edits(form: &mut ReceiptForm, edits: &Edits) -> Result<(), String> {
    for arg in &edits.set {
        let (path, input) = parse_set(arg)?;
        form.apply_input(path, input).map_err(|e| describe(&e))?;
    }

    let mut removals = edits
        .remove
        .iter()
        .map(|arg| parse_remove(arg))
        .collect::<Result<Vec<_>, _>>()?;
    removals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.path().cmp(b.0.path())));
    removals.dedup();
    for (list, index) in removals {
        form.remove_row(list, index).map_err(|e| describe(&e))?;
    }

    for arg in &edits.add_position {
        let position = parse_position(arg)?;
        add_position(form, &position)
            .map_err(|e| format!("--add-position '{}': {}", arg, describe(&e)))?;
    }
    for (flag, list, args) in [
        ("add-fee", RowList::Fees, &edits.add_fee),
        ("add-discount", RowList::Discounts, &edits.add_discount),
    ] {
        for arg in args {
            let (name, value) = parse_modifier(flag, arg)?;
            add_modifier(form, list, name, value)
                .map_err(|e| format!("--{} '{}': {}", flag, arg, describe(&e)))?;
        }
    }
    Ok(())
}

pub(crate) fn cmd_edit(file: &Path, edits: &Edits, out: Option<&Path>, ctx: &Context) -> i32 {
    let mut session = match open_session(file) {
        Ok(session) => session,
        Err(msg) => {
            report_error(&msg, ctx);
            return EXIT_ERROR;
        }
    };

    if let Err(msg) = apply_edits(session.form_mut(), edits) {
        report_error(&msg, ctx);
        return EXIT_ERROR;
    }
    info!(
        file = %file.display(),
        set = edits.set.len(),
        removed = edits.remove.len(),
        "edits applied"
    );
    finish_report(session.stage(), session.form(), out, ctx)
}

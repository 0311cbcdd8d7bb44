//! Review -> confirmation stage transitions.

use serde_json::json;
use tally_receipt::{ReceiptError, ReceiptSession, ScenarioKind, Stage};

fn consistent() -> serde_json::Value {
    json!({
        "positions": [{"name": "Item 1", "quantity": 2, "price": 10, "overall": 20}],
        "total": {
            "fees": [{"name": "Tax", "value": 5}],
            "discounts": [{"name": "Discount", "value": 2}],
            "totals": {"total": 20, "grandTotal": 23}
        }
    })
}

fn inconsistent() -> serde_json::Value {
    json!({
        "positions": [{"name": "Item 1", "quantity": 2, "price": 10, "overall": 25}],
        "total": {
            "fees": [{"name": "Tax", "value": 5}],
            "discounts": [{"name": "Discount", "value": 2}],
            "totals": {"total": 25, "grandTotal": 30}
        }
    })
}

#[test]
fn consistent_receipt_proceeds_once() {
    let mut session = ReceiptSession::from_json(&consistent()).unwrap();
    assert_eq!(session.stage(), Stage::Review);

    session.proceed().unwrap();
    assert_eq!(session.stage(), Stage::Confirmation);
    assert_eq!(session.form().scenario(), ScenarioKind::Editing);

    assert!(matches!(session.proceed(), Err(ReceiptError::NoNextStage)));
    let receipt = session.finish().unwrap();
    assert_eq!(receipt.total.totals.grand_total, 23.0);
}

#[test]
fn mismatches_block_proceed() {
    let mut session = ReceiptSession::from_json(&inconsistent()).unwrap();
    assert_eq!(session.form().scenario(), ScenarioKind::Validation);

    let err = session.proceed().unwrap_err();
    let ReceiptError::ProceedBlocked { errors } = err else {
        panic!("expected ProceedBlocked");
    };
    assert_eq!(
        errors,
        vec![
            "Position Item 1: overall value 25 doesn't match quantity * price (2 * 10 = 20) at index 0",
            "Final grand total 30 doesn't match total + fees - discounts (25 + 5 - 2 = 28)",
        ]
    );
    assert_eq!(session.stage(), Stage::Review);
}

#[test]
fn reconciled_receipt_proceeds_into_a_fresh_editing_form() {
    let mut session = ReceiptSession::from_json(&inconsistent()).unwrap();
    let form = session.form_mut();
    form.apply_input("positions.0.overall", "20").unwrap();
    form.apply_input("total.totals.total", "20").unwrap();
    form.apply_input("total.totals.grandTotal", "23").unwrap();

    session.proceed().unwrap();

    assert_eq!(session.stage(), Stage::Confirmation);
    assert_eq!(session.form().scenario(), ScenarioKind::Editing);
    let overall = session.form().field("positions.0.overall").unwrap();
    assert!(session.form().form().is_disabled(overall).unwrap());
    assert!(!session.form().form().touched(session.form().root()).unwrap());
}

#[test]
fn field_errors_block_as_well() {
    let mut session = ReceiptSession::from_json(&consistent()).unwrap();
    session
        .form_mut()
        .apply_input("positions.0.name", "  ")
        .unwrap();

    assert_eq!(
        session.blocking_errors().unwrap(),
        vec!["positions.0.name: should not be empty"]
    );
    let err = session.finish().unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot proceed: positions.0.name: should not be empty"
    );
}

#[test]
fn malformed_json_is_rejected() {
    let err = ReceiptSession::from_json(&json!({"positions": "none"})).unwrap_err();
    assert!(matches!(err, ReceiptError::Json(_)));
}

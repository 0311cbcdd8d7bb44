//! Update-pass integration tests.
//!
//! Covers:
//!
//! 1. Construction settles value and validity bottom-up
//! 2. Disabled children are masked from aggregates and status
//! 3. Patching a group runs its validators once, after all children are written
//! 4. A calculator write inside a pass produces one emission at the root
//! 5. Streams replay the latest value on subscription
//! 6. Array insert/remove/at and structural errors
//! 7. Copies are independent
//! 8. Touched/dirty propagation and error collection

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use tally_forms::{
    number_more_than_zero, string_not_empty, validator, Calculator, ControlKey, ControlSpec,
    Form, FormError, Status, UpdateOptions, Value,
};

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

fn value(v: serde_json::Value) -> Value {
    Value::from_json(&v).unwrap()
}

fn line(name: &str, quantity: f64) -> ControlSpec {
    ControlSpec::group([
        ("name", ControlSpec::leaf(name).with_validator(string_not_empty())),
        (
            "quantity",
            ControlSpec::leaf(quantity).with_validator(number_more_than_zero()),
        ),
    ])
}

/// `{ qty, price, overall }` with a calculator keeping `overall = qty * price`.
fn priced_line(qty: f64, price: f64) -> ControlSpec {
    let product = Calculator::new("product", |form, id| {
        let read = |name: &str| -> Result<f64, FormError> {
            let child = form.get(id, name).ok_or(FormError::MissingControl {
                key: ControlKey::Name(name.to_string()),
            })?;
            Ok(form.raw_value(child)?.as_number().unwrap_or(0.0))
        };
        let computed = read("qty")? * read("price")?;
        let overall = form.get(id, "overall").ok_or(FormError::MissingControl {
            key: ControlKey::Name("overall".to_string()),
        })?;
        form.set_calculated(overall, Value::Number(computed))?;
        Ok(())
    });
    ControlSpec::group([
        ("qty", ControlSpec::leaf(qty)),
        ("price", ControlSpec::leaf(price)),
        ("overall", ControlSpec::leaf(qty * price)),
    ])
    .with_calculator(product)
}

// ──────────────────────────────────────────────
// Settling and masking
// ──────────────────────────────────────────────

#[test]
fn construction_settles_bottom_up() {
    let form = Form::new(ControlSpec::array([line("Tea", 1.0), line("", 2.0)]));
    let root = form.root();
    assert_eq!(
        form.value(root).unwrap(),
        &value(json!([{"name": "Tea", "quantity": 1}, {"name": "", "quantity": 2}]))
    );
    assert_eq!(form.status(root).unwrap(), Status::Invalid);
    assert_eq!(form.status(form.at(root, 0).unwrap()).unwrap(), Status::Valid);
    // Ancestors do not copy child errors.
    assert!(form.errors(root).unwrap().is_none());
}

#[test]
fn disabled_children_are_masked() {
    let mut form = Form::new(line("", 1.0));
    let root = form.root();
    let name = form.get(root, "name").unwrap();
    assert!(form.is_invalid(root).unwrap());

    form.disable(name, UpdateOptions::default()).unwrap();

    assert_eq!(form.status(name).unwrap(), Status::Disabled);
    assert!(form.is_valid(name).unwrap());
    assert!(form.errors(name).unwrap().is_none());
    assert_eq!(form.status(root).unwrap(), Status::Valid);
    assert_eq!(form.value(root).unwrap(), &value(json!({"quantity": 1})));
    assert_eq!(
        form.raw_value(root).unwrap(),
        value(json!({"name": "", "quantity": 1}))
    );

    form.enable(name, UpdateOptions::default()).unwrap();
    assert!(form.is_invalid(root).unwrap());
    assert!(form.has_error(name, validator::STRING_EMPTY));
}

#[test]
fn disabled_ancestor_masks_descendants() {
    let mut form = Form::new(ControlSpec::group([("line", line("", -1.0))]));
    let root = form.root();
    let inner = form.get(root, "line").unwrap();
    let quantity = form.get_path(root, "line.quantity").unwrap();
    assert!(form.is_invalid(root).unwrap());

    form.disable(inner, UpdateOptions::default()).unwrap();

    assert!(form.is_disabled(quantity).unwrap());
    assert!(form.errors(quantity).unwrap().is_none());
    assert!(form.collect_errors(root).unwrap().is_empty());
    assert!(form.is_valid(root).unwrap());
    assert_eq!(form.value(root).unwrap(), &value(json!({})));
    assert_eq!(
        form.raw_value(root).unwrap(),
        value(json!({"line": {"name": "", "quantity": -1}}))
    );
}

#[test]
fn only_self_leaves_parent_stale() {
    let mut form = Form::new(line("Tea", 1.0));
    let root = form.root();
    let quantity = form.get(root, "quantity").unwrap();

    form.set_value(quantity, Value::from(0), UpdateOptions::only_self())
        .unwrap();

    assert!(form.is_invalid(quantity).unwrap());
    assert_eq!(form.status(root).unwrap(), Status::Valid);
    assert_eq!(form.value(root).unwrap().get("quantity"), Some(&Value::from(1)));

    form.update_value_and_validity(root, UpdateOptions::default())
        .unwrap();
    assert_eq!(form.status(root).unwrap(), Status::Invalid);
}

// ──────────────────────────────────────────────
// Batching and emission counts
// ──────────────────────────────────────────────

#[test]
fn patch_runs_group_validators_once_with_all_new_values() {
    let runs = Rc::new(Cell::new(0));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (runs_in, seen_in) = (Rc::clone(&runs), Rc::clone(&seen));
    let spy = tally_forms::Validator::new("spy", move |control| {
        runs_in.set(runs_in.get() + 1);
        seen_in.borrow_mut().push(control.value().cloned());
        None
    });
    let mut form = Form::new(
        ControlSpec::group([("a", ControlSpec::leaf(1)), ("b", ControlSpec::leaf(2))])
            .with_validator(spy),
    );
    assert_eq!(runs.get(), 1);

    form.patch_value(form.root(), value(json!({"a": 5, "b": 6})), UpdateOptions::default())
        .unwrap();

    assert_eq!(runs.get(), 2);
    assert_eq!(
        seen.borrow().last().cloned().flatten(),
        Some(value(json!({"a": 5, "b": 6})))
    );
}

#[test]
fn patch_ignores_unknown_keys_and_missing_indices() {
    let mut form = Form::new(ControlSpec::array([line("a", 1.0)]));
    let root = form.root();
    form.patch_value(
        root,
        value(json!([{"name": "b", "extra": 1}, {"name": "c"}])),
        UpdateOptions::default(),
    )
    .unwrap();
    assert_eq!(
        form.value(root).unwrap(),
        &value(json!([{"name": "b", "quantity": 1}]))
    );
}

#[test]
fn calculator_write_emits_once_at_root() {
    let mut form = Form::new(priced_line(2.0, 5.0));
    let root = form.root();
    let qty = form.get(root, "qty").unwrap();

    let root_emissions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&root_emissions);
    form.value_changes(root, move |v| sink.borrow_mut().push(v.clone()))
        .unwrap();
    assert_eq!(root_emissions.borrow().len(), 1);

    form.set_value(qty, Value::from(3), UpdateOptions::default())
        .unwrap();

    let emissions = root_emissions.borrow();
    assert_eq!(emissions.len(), 2);
    assert_eq!(
        emissions[1],
        value(json!({"qty": 3, "price": 5, "overall": 15}))
    );
}

#[test]
fn set_calculated_skips_identical_values() {
    let mut form = Form::new(priced_line(2.0, 5.0));
    let overall = form.get(form.root(), "overall").unwrap();
    let count = Rc::new(Cell::new(0));
    let sink = Rc::clone(&count);
    form.value_changes(overall, move |_| sink.set(sink.get() + 1))
        .unwrap();

    assert!(!form.set_calculated(overall, Value::from(10)).unwrap());
    assert!(form.set_calculated(overall, Value::from(11)).unwrap());
    assert_eq!(count.get(), 2);
}

#[test]
fn silent_updates_notify_nobody() {
    let mut form = Form::new(line("Tea", 1.0));
    let root = form.root();
    let count = Rc::new(Cell::new(0));
    let sink = Rc::clone(&count);
    form.status_changes(root, move |_| sink.set(sink.get() + 1))
        .unwrap();

    let name = form.get(root, "name").unwrap();
    form.set_value(name, Value::from(""), UpdateOptions::silent())
        .unwrap();

    assert_eq!(count.get(), 1);
    assert!(form.is_invalid(root).unwrap());
}

#[test]
fn subscribers_get_the_latest_state_immediately() {
    let mut form = Form::new(line("", 1.0));
    let root = form.root();
    let statuses = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&statuses);
    let sub = form
        .status_changes(root, move |s| sink.borrow_mut().push(*s))
        .unwrap();
    assert_eq!(*statuses.borrow(), vec![Status::Invalid]);

    let name = form.get(root, "name").unwrap();
    form.set_value(name, Value::from("Tea"), UpdateOptions::default())
        .unwrap();
    assert_eq!(*statuses.borrow(), vec![Status::Invalid, Status::Valid]);

    assert!(form.unsubscribe(root, sub).unwrap());
    form.set_value(name, Value::from(""), UpdateOptions::default())
        .unwrap();
    assert_eq!(statuses.borrow().len(), 2);
}

#[test]
fn revalidate_refreshes_sibling_dependent_messages() {
    let not_below_a = tally_forms::Validator::new("notBelowA", |control| {
        let a = control.parent()?.get("a")?.number()?;
        let b = control.number()?;
        (b < a).then(|| validator::error("belowA", "b is below a"))
    });
    let mut form = Form::new(
        ControlSpec::group([
            ("a", ControlSpec::leaf(1)),
            ("b", ControlSpec::leaf(5).with_validator(not_below_a)),
        ])
        .with_calculator(Calculator::revalidate()),
    );
    let root = form.root();
    let a = form.get(root, "a").unwrap();
    let b = form.get(root, "b").unwrap();
    assert!(form.is_valid(b).unwrap());

    form.set_value(a, Value::from(10), UpdateOptions::default())
        .unwrap();

    assert!(form.has_error(b, "belowA"));
    assert_eq!(form.status(root).unwrap(), Status::Invalid);
}

// ──────────────────────────────────────────────
// Arrays and structural errors
// ──────────────────────────────────────────────

#[test]
fn insert_remove_and_at() {
    let mut form = Form::new(ControlSpec::array([line("a", 1.0)]));
    let root = form.root();

    let inserted = form
        .insert(root, 0, line("b", 2.0), UpdateOptions::default())
        .unwrap();
    assert_eq!(form.at(root, 0), Some(inserted));
    assert_eq!(form.len(root).unwrap(), 2);
    assert_eq!(form.parent(inserted).unwrap(), Some(root));

    let pushed = form.push(root, line("", 3.0), UpdateOptions::default()).unwrap();
    assert_eq!(form.at(root, 2), Some(pushed));
    assert!(form.is_invalid(root).unwrap());

    form.remove_at(root, 2, UpdateOptions::default()).unwrap();
    assert!(form.is_valid(root).unwrap());
    assert_eq!(form.at(root, 2), None);
    assert_eq!(
        form.value(pushed).unwrap_err(),
        FormError::UnknownControl { id: pushed }
    );
}

#[test]
fn out_of_range_array_mutations_are_errors() {
    let mut form = Form::new(ControlSpec::array([line("a", 1.0)]));
    let root = form.root();
    assert_eq!(
        form.insert(root, 3, line("b", 1.0), UpdateOptions::default())
            .unwrap_err(),
        FormError::IndexOutOfRange { index: 3, len: 1 }
    );
    assert_eq!(
        form.remove_at(root, 1, UpdateOptions::default()).unwrap_err(),
        FormError::IndexOutOfRange { index: 1, len: 1 }
    );
    assert!(form.at(root, 9).is_none());

    let leaf = form.get_path(root, "0.name").unwrap();
    assert!(matches!(
        form.push(leaf, line("x", 1.0), UpdateOptions::default()),
        Err(FormError::WrongKind { .. })
    ));
}

#[test]
fn set_value_requires_every_child() {
    let mut form = Form::new(line("a", 1.0));
    let root = form.root();
    assert_eq!(
        form.set_value(root, value(json!({"name": "b"})), UpdateOptions::default())
            .unwrap_err(),
        FormError::MissingControlValue {
            key: ControlKey::Name("quantity".to_string())
        }
    );

    let mut list = Form::new(ControlSpec::array([ControlSpec::leaf(1), ControlSpec::leaf(2)]));
    let list_root = list.root();
    assert_eq!(
        list.set_value(list_root, value(json!([1, 2, 3])), UpdateOptions::default())
            .unwrap_err(),
        FormError::MissingControl {
            key: ControlKey::Index(2)
        }
    );
    let err = list
        .set_value(list_root, value(json!([1])), UpdateOptions::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "Must supply a value for form control at index: 1");
}

#[test]
fn leaves_reject_structured_values() {
    let mut form = Form::new(line("a", 1.0));
    let name = form.get(form.root(), "name").unwrap();
    assert!(matches!(
        form.set_value(name, value(json!({"x": 1})), UpdateOptions::default()),
        Err(FormError::ShapeMismatch { .. })
    ));
}

// ──────────────────────────────────────────────
// Copies, flags, errors
// ──────────────────────────────────────────────

#[test]
fn copies_are_independent() {
    let mut form = Form::new(ControlSpec::array([line("a", 1.0)]));
    let row = form.at(form.root(), 0).unwrap();
    let quantity = form.get(row, "quantity").unwrap();
    form.disable(quantity, UpdateOptions::default()).unwrap();

    let mut copy = form.copy_control(row).unwrap();
    let copy_root = copy.root();
    assert_eq!(copy.parent(copy_root).unwrap(), None);
    let copy_quantity = copy.get(copy_root, "quantity").unwrap();
    assert!(copy.is_disabled(copy_quantity).unwrap());

    let copy_name = copy.get(copy_root, "name").unwrap();
    copy.set_value(copy_name, Value::from(""), UpdateOptions::default())
        .unwrap();
    assert!(copy.is_invalid(copy_root).unwrap());
    assert!(form.is_valid(row).unwrap());
    assert_eq!(
        form.raw_value(row).unwrap(),
        value(json!({"name": "a", "quantity": 1}))
    );
}

#[test]
fn collect_errors_reports_paths() {
    let form = Form::new(ControlSpec::group([(
        "rows",
        ControlSpec::array([line("a", 1.0), line(" ", 0.0)]),
    )]));
    let errors = form.collect_errors(form.root()).unwrap();
    let found: Vec<_> = errors
        .iter()
        .map(|e| (e.path.as_str(), e.kind.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![("rows.1.name", "stringEmpty"), ("rows.1.quantity", "valueZero")]
    );
}

#[test]
fn touched_propagates_up_and_clears_down() {
    let mut form = Form::new(ControlSpec::array([line("a", 1.0), line("b", 1.0)]));
    let root = form.root();
    let first = form.get_path(root, "0.name").unwrap();
    let second = form.get_path(root, "1.name").unwrap();

    form.mark_as_touched(first, UpdateOptions::default()).unwrap();
    form.mark_as_touched(second, UpdateOptions::default()).unwrap();
    assert!(form.touched(root).unwrap());

    form.mark_as_untouched(first, UpdateOptions::default()).unwrap();
    assert!(form.touched(root).unwrap());
    form.mark_as_untouched(second, UpdateOptions::default()).unwrap();
    assert!(!form.touched(root).unwrap());

    form.mark_as_dirty(first, UpdateOptions::only_self()).unwrap();
    assert!(form.dirty(first).unwrap());
    assert!(!form.dirty(root).unwrap());
}

#[test]
fn reset_clears_flags_and_patches() {
    let mut form = Form::new(line("a", 1.0));
    let root = form.root();
    let name = form.get(root, "name").unwrap();
    form.mark_as_dirty(name, UpdateOptions::default()).unwrap();

    form.reset(root, Some(value(json!({"name": "b"}))), UpdateOptions::default())
        .unwrap();

    assert!(!form.dirty(root).unwrap());
    assert!(!form.dirty(name).unwrap());
    assert_eq!(form.value(name).unwrap(), &Value::from("b"));
}

#[test]
fn paths_resolve_through_groups_and_arrays() {
    let form = Form::new(ControlSpec::group([(
        "rows",
        ControlSpec::array([line("a", 1.0)]),
    )]));
    let root = form.root();
    assert_eq!(form.get_path(root, ""), Some(root));
    let name = form.get_path(root, "rows.0.name").unwrap();
    assert_eq!(form.root_of(name).unwrap(), root);
    assert!(form.get_path(root, "rows.1.name").is_none());
    assert!(form.get_path(root, "rows.x").is_none());

    let view = form.control(name).unwrap();
    assert_eq!(view.root().id(), root);
    assert_eq!(view.parent().unwrap().len(), 2);
}

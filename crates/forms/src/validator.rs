//! Validator protocol and the generic built-in validators.
//!
//! A validator is a pure function from a control view to either `None`
//! (valid) or a map of error kind to human-readable message. Validators may
//! climb to the parent or root to read sibling values.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::control_ref::ControlRef;

/// Error kind -> message.
pub type ValidationErrors = BTreeMap<String, String>;

pub type ValidatorFn = dyn Fn(&ControlRef<'_>) -> Option<ValidationErrors>;

/// A named validator. Cloning shares the underlying function.
#[derive(Clone)]
pub struct Validator {
    name: &'static str,
    check: Rc<ValidatorFn>,
}

impl Validator {
    pub fn new<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&ControlRef<'_>) -> Option<ValidationErrors> + 'static,
    {
        Validator {
            name,
            check: Rc::new(check),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn validate(&self, control: &ControlRef<'_>) -> Option<ValidationErrors> {
        (self.check)(control)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.name).finish()
    }
}

/// Build a single-entry error map.
pub fn error(kind: &str, message: impl Into<String>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.insert(kind.to_string(), message.into());
    errors
}

pub const STRING_EMPTY: &str = "stringEmpty";
pub const VALUE_ZERO: &str = "valueZero";

/// `stringEmpty` when the trimmed text is empty. Non-text values pass.
pub fn string_not_empty() -> Validator {
    Validator::new("stringNotEmpty", |control| {
        let text = control.text()?;
        text.trim()
            .is_empty()
            .then(|| error(STRING_EMPTY, "should not be empty"))
    })
}

/// `valueZero` when the number is `<= 0` or `NaN`. Non-numbers pass.
pub fn number_more_than_zero() -> Validator {
    Validator::new("numberMoreThanZero", |control| {
        let n = control.number()?;
        (n <= 0.0 || n.is_nan()).then(|| error(VALUE_ZERO, "should not be equal or below zero"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlSpec, Form};

    fn check(validator: Validator, value: crate::Value) -> Option<ValidationErrors> {
        let form = Form::new(ControlSpec::leaf(value));
        let control = form.control(form.root()).unwrap();
        validator.validate(&control)
    }

    #[test]
    fn string_not_empty_trims() {
        assert!(check(string_not_empty(), "  ".into()).unwrap().contains_key(STRING_EMPTY));
        assert!(check(string_not_empty(), "".into()).is_some());
        assert!(check(string_not_empty(), " Tea ".into()).is_none());
        assert!(check(string_not_empty(), 0.into()).is_none());
    }

    #[test]
    fn number_more_than_zero_rejects_zero_negative_and_nan() {
        assert!(check(number_more_than_zero(), 0.into()).is_some());
        assert!(check(number_more_than_zero(), (-1.5).into()).is_some());
        let nan = check(number_more_than_zero(), f64::NAN.into()).unwrap();
        assert_eq!(nan[VALUE_ZERO], "should not be equal or below zero");
        assert!(check(number_more_than_zero(), 0.01.into()).is_none());
        assert!(check(number_more_than_zero(), "x".into()).is_none());
    }
}

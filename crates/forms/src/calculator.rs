//! Calculators: hooks that run inside a control's update pass.
//!
//! A calculator attached to control N runs at the start of every update
//! pass that reaches N, before N's value and validity are recomputed. It may
//! write into descendants, but must do so with `UpdateOptions::only_self()`
//! (see `Form::set_calculated`) so that one external mutation produces one
//! emission at the root. Calculators are not re-entered on the same control.

use std::fmt;
use std::rc::Rc;

use crate::control::ControlId;
use crate::error::FormError;
use crate::form::Form;

pub type CalculatorFn = dyn Fn(&mut Form, ControlId) -> Result<(), FormError>;

/// A named calculator. Cloning shares the underlying function.
#[derive(Clone)]
pub struct Calculator {
    name: &'static str,
    run: Rc<CalculatorFn>,
}

impl Calculator {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(&mut Form, ControlId) -> Result<(), FormError> + 'static,
    {
        Calculator {
            name,
            run: Rc::new(run),
        }
    }

    /// Re-run every validator under the owning control.
    ///
    /// Used where validators read siblings, so that editing one field keeps
    /// the messages on the fields that depend on it current.
    pub fn revalidate() -> Self {
        Calculator::new("revalidate", |form, id| form.refresh(id))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn run(&self, form: &mut Form, id: ControlId) -> Result<(), FormError> {
        (self.run)(form, id)
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Calculator").field(&self.name).finish()
    }
}

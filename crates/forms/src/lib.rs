//! Reactive form-control tree.
//!
//! A `Form` holds a tree of controls: leaves carrying a scalar, groups of
//! named children and arrays of same-shaped children. Each control has a
//! value, validators, a validity status and change streams. Mutations run
//! an update pass that recomputes value and validity together and bubbles
//! to the root, so cross-field validators attached high in the tree always
//! see consistent sibling values.
//!
//! Calculators are hooks that run inside the pass and write derived values
//! into descendants before validation.

pub mod calculator;
pub mod control;
pub mod control_ref;
pub mod error;
pub mod form;
pub mod spec;
pub mod stream;
pub mod validator;
pub mod value;

pub use calculator::Calculator;
pub use control::{ControlId, ControlKey, ControlKind, FieldError, Status, UpdateOptions};
pub use control_ref::ControlRef;
pub use error::FormError;
pub use form::Form;
pub use spec::{ControlSpec, Shape};
pub use stream::SubscriptionId;
pub use validator::{number_more_than_zero, string_not_empty, ValidationErrors, Validator};
pub use value::{format_number, Value};

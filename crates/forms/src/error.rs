use crate::control::{ControlId, ControlKey, ControlKind};

/// Structural errors raised by the form tree.
///
/// Validation failures are never reported here: they live in each control's
/// `errors` map. A `FormError` means the caller addressed the tree wrongly
/// (stale id, wrong control kind, missing key, out-of-range index).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    /// The id does not name a live control (never allocated, or removed).
    #[error("unknown control: {id}")]
    UnknownControl { id: ControlId },

    /// The operation needs a different kind of control.
    #[error("control {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: ControlId,
        expected: ControlKind,
        actual: ControlKind,
    },

    /// A value addressed a child that does not exist.
    #[error("Cannot find form control {key}")]
    MissingControl { key: ControlKey },

    /// `set_value` on a group or array did not cover every child.
    #[error("Must supply a value for form control {key}")]
    MissingControlValue { key: ControlKey },

    /// Array index outside `0..len` (or `0..=len` for insertion).
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A value of the wrong shape was written into a control.
    #[error("control {id} expects a {expected} value, got {got}")]
    ShapeMismatch {
        id: ControlId,
        expected: &'static str,
        got: &'static str,
    },

    /// A JSON value that has no form representation (booleans, null).
    #[error("unsupported value: {message}")]
    UnsupportedValue { message: String },
}

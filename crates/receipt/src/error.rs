use tally_forms::{FieldError, FormError};

/// All errors returned by the receipt layer.
///
/// Arithmetic inconsistencies are not errors here: they are reported as
/// validation messages on the form, or by `validate_receipt`.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// The underlying form was addressed wrongly.
    #[error(transparent)]
    Form(#[from] FormError),

    /// Receipt JSON could not be parsed.
    #[error("invalid receipt json: {0}")]
    Json(#[from] serde_json::Error),

    /// A form value did not have the receipt shape.
    #[error("receipt field {path} must be a {expected}")]
    Shape { path: String, expected: &'static str },

    /// A path that names no receipt field.
    #[error("unknown receipt field: {path}")]
    UnknownField { path: String },

    /// A row list name other than positions, fees or discounts.
    #[error("unknown row list: {name}")]
    UnknownList { name: String },

    /// The field is computed in the current scenario.
    #[error("field {path} is computed and cannot be edited")]
    FieldDisabled { path: String },

    /// A row draft cannot be committed while it has validation errors.
    #[error("row has {} validation error(s)", .errors.len())]
    DraftInvalid { errors: Vec<FieldError> },

    /// The receipt cannot move to the next stage yet.
    #[error("cannot proceed: {}", .errors.join("; "))]
    ProceedBlocked { errors: Vec<String> },

    /// Confirmation is the last stage.
    #[error("receipt is already confirmed")]
    NoNextStage,
}

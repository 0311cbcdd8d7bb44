//! Receipt editing on top of `tally-forms`.
//!
//! The receipt layer owns the receipt value model and its arithmetic checks,
//! builds a form for a receipt in one of two scenarios, stages row edits in
//! drafts and moves a receipt through review and confirmation.
//!
//! ```text
//! receipt json -> Receipt -> select_scenario -> ReceiptForm -> edits -> proceed
//! ```

pub mod assemble;
pub mod error;
pub mod input;
pub mod model;
pub mod rows;
pub mod session;
pub mod validators;

pub use assemble::{
    build_editing_form, build_validation_form, select_scenario, ReceiptForm, ScenarioKind,
};
pub use error::ReceiptError;
pub use input::parse_decimal_input;
pub use model::{
    amounts_differ, calculate_grand_total, calculate_positions_total, sum_modifiers,
    validate_all_positions, validate_grand_total, validate_position, validate_receipt,
    validate_total, Modifier, Position, Receipt, ReceiptValidation, TotalSection, Totals,
    TOLERANCE,
};
pub use rows::{RowDraft, RowList, RowTarget};
pub use session::{ReceiptSession, Stage};

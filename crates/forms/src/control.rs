//! Identifiers, kinds, statuses and update options shared by every control.

use std::fmt;

use serde::Serialize;

/// Index of a control in its form's arena.
///
/// Ids are never reused within one `Form`: an id that outlives its control
/// (for example after `remove_at`) resolves to `FormError::UnknownControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlId(pub(crate) usize);

impl ControlId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three node variants, decided at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Leaf,
    Group,
    Array,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Leaf => f.write_str("leaf"),
            ControlKind::Group => f.write_str("group"),
            ControlKind::Array => f.write_str("array"),
        }
    }
}

/// How a child is addressed inside its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKey::Name(name) => write!(f, "with name: '{}'", name),
            ControlKey::Index(index) => write!(f, "at index: {}", index),
        }
    }
}

impl ControlKey {
    /// Path segment form (`name` or `3`).
    pub fn segment(&self) -> String {
        match self {
            ControlKey::Name(name) => name.clone(),
            ControlKey::Index(index) => index.to_string(),
        }
    }
}

/// Validity status of a control.
///
/// `Disabled` dominates: a disabled control (or any control under a disabled
/// ancestor) is never `Invalid`, whatever its validators would say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Valid,
    Invalid,
    Disabled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Valid => f.write_str("VALID"),
            Status::Invalid => f.write_str("INVALID"),
            Status::Disabled => f.write_str("DISABLED"),
        }
    }
}

/// Options accepted by every mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Recompute only the target control; do not bubble to the parent.
    pub only_self: bool,
    /// Notify `value_changes` / `status_changes` subscribers.
    pub emit_event: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            only_self: false,
            emit_event: true,
        }
    }
}

impl UpdateOptions {
    /// Recompute the target only, still emitting on it.
    pub fn only_self() -> Self {
        UpdateOptions {
            only_self: true,
            emit_event: true,
        }
    }

    /// Bubble as usual but notify nobody.
    pub fn silent() -> Self {
        UpdateOptions {
            only_self: false,
            emit_event: false,
        }
    }

    pub fn with_only_self(self, only_self: bool) -> Self {
        UpdateOptions { only_self, ..self }
    }
}

/// One validation message found while walking a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dot-separated path relative to the walked control (`positions.0.overall`).
    pub path: String,
    /// Stable error identifier (`overallMismatch`).
    pub kind: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "{} [{}] {}", self.path, self.kind, self.message)
        }
    }
}

//! Read-only view of one control, handed to validators.

use crate::control::{ControlId, ControlKind};
use crate::form::Form;
use crate::value::Value;

/// A borrowed view of a control inside its form.
///
/// Lookups return `Option` so validators stay total: a validator running on
/// a detached copy simply finds no parent.
#[derive(Clone, Copy)]
pub struct ControlRef<'a> {
    form: &'a Form,
    id: ControlId,
}

impl<'a> ControlRef<'a> {
    pub(crate) fn new(form: &'a Form, id: ControlId) -> Self {
        ControlRef { form, id }
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn form(&self) -> &'a Form {
        self.form
    }

    pub fn kind(&self) -> Option<ControlKind> {
        self.form.kind(self.id).ok()
    }

    /// Aggregate value (disabled children excluded).
    pub fn value(&self) -> Option<&'a Value> {
        self.form.value(self.id).ok()
    }

    /// Value including disabled descendants.
    pub fn raw_value(&self) -> Option<Value> {
        self.form.raw_value(self.id).ok()
    }

    pub fn number(&self) -> Option<f64> {
        self.value().and_then(Value::as_number)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.value().and_then(Value::as_text)
    }

    pub fn parent(&self) -> Option<ControlRef<'a>> {
        let parent = self.form.parent(self.id).ok().flatten()?;
        Some(ControlRef::new(self.form, parent))
    }

    /// Topmost ancestor; the control itself when it has no parent.
    pub fn root(&self) -> ControlRef<'a> {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Descendant by dot-separated path (`totals.total`, `positions.0`).
    pub fn get(&self, path: &str) -> Option<ControlRef<'a>> {
        let id = self.form.get_path(self.id, path)?;
        Some(ControlRef::new(self.form, id))
    }

    pub fn at(&self, index: usize) -> Option<ControlRef<'a>> {
        let id = self.form.at(self.id, index)?;
        Some(ControlRef::new(self.form, id))
    }

    /// Number of children (0 for a leaf).
    pub fn len(&self) -> usize {
        self.form.len(self.id).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children in construction order.
    pub fn controls(&self) -> Vec<ControlRef<'a>> {
        self.form
            .controls(self.id)
            .map(|controls| {
                controls
                    .into_iter()
                    .map(|(_, id)| ControlRef::new(self.form, id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ControlRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlRef").field("id", &self.id).finish()
    }
}

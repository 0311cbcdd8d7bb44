//! The form arena and its update pass.
//!
//! Controls live in a flat arena indexed by `ControlId`. A parent owns its
//! children through id lists; a child keeps its parent's id as a lookup-only
//! back reference. Every mutation ends in an update pass:
//!
//! 1. run the control's calculators (not re-entrant on the same control)
//! 2. recompute its aggregate value from the children
//! 3. run its validators and derive its status
//! 4. emit on its `value_changes` / `status_changes` streams
//! 5. unless `only_self`, repeat on the parent
//!
//! Value and validity are always recomputed together in the same step, so a
//! subscriber never observes one without the other.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::calculator::Calculator;
use crate::control::{ControlId, ControlKey, ControlKind, FieldError, Status, UpdateOptions};
use crate::control_ref::ControlRef;
use crate::error::FormError;
use crate::spec::{ControlSpec, Shape};
use crate::stream::{Subject, SubscriptionId};
use crate::validator::{ValidationErrors, Validator};
use crate::value::Value;

// ──────────────────────────────────────────────
// Nodes
// ──────────────────────────────────────────────

#[derive(Debug)]
enum Children {
    Leaf,
    Group(Vec<(String, ControlId)>),
    Array(Vec<ControlId>),
}

#[derive(Debug)]
struct Node {
    children: Children,
    parent: Option<ControlId>,
    validators: Vec<Validator>,
    calculators: Vec<Calculator>,
    /// Leaf: the scalar. Group/array: cached aggregate of enabled children.
    value: Value,
    errors: Option<ValidationErrors>,
    status: Status,
    disabled: bool,
    touched: bool,
    dirty: bool,
    calculating: bool,
    value_changes: Subject<Value>,
    status_changes: Subject<Status>,
}

impl Node {
    fn kind(&self) -> ControlKind {
        match self.children {
            Children::Leaf => ControlKind::Leaf,
            Children::Group(_) => ControlKind::Group,
            Children::Array(_) => ControlKind::Array,
        }
    }

    fn child_ids(&self) -> Vec<ControlId> {
        match &self.children {
            Children::Leaf => Vec::new(),
            Children::Group(children) => children.iter().map(|(_, id)| *id).collect(),
            Children::Array(children) => children.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// Every child must receive a value.
    Set,
    /// Missing children are left untouched; unknown ones are ignored.
    Patch,
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Touched,
    Dirty,
}

impl Flag {
    fn get(self, node: &Node) -> bool {
        match self {
            Flag::Touched => node.touched,
            Flag::Dirty => node.dirty,
        }
    }

    fn set(self, node: &mut Node, on: bool) {
        match self {
            Flag::Touched => node.touched = on,
            Flag::Dirty => node.dirty = on,
        }
    }
}

// ──────────────────────────────────────────────
// Form
// ──────────────────────────────────────────────

/// A tree of controls with a single root.
///
/// The form is single-threaded and exclusively owned by whoever built it;
/// every operation completes synchronously.
pub struct Form {
    nodes: Vec<Option<Node>>,
    root: ControlId,
    next_subscription: u64,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("root", &self.root)
            .field("controls", &self.nodes.iter().flatten().count())
            .finish()
    }
}

impl Form {
    /// Build a form from a spec and settle it (values and validity computed
    /// bottom-up). Calculators do not run and nothing is emitted.
    pub fn new(spec: ControlSpec) -> Form {
        let mut form = Form {
            nodes: Vec::new(),
            root: ControlId(0),
            next_subscription: 0,
        };
        let root = form.alloc(spec, None);
        form.root = root;
        form.settle(root);
        debug!(controls = form.nodes.len(), "form constructed");
        form
    }

    /// Build a form mirroring a plain value (see `ControlSpec::infer`).
    pub fn from_value(value: &Value) -> Form {
        Form::new(ControlSpec::infer(value))
    }

    pub fn root(&self) -> ControlId {
        self.root
    }

    // ── arena plumbing ───────────────────────────

    fn alloc(&mut self, spec: ControlSpec, parent: Option<ControlId>) -> ControlId {
        let id = ControlId(self.nodes.len());
        self.nodes.push(None);
        let ControlSpec {
            shape,
            validators,
            calculators,
            disabled,
        } = spec;
        let (children, value) = match shape {
            Shape::Leaf(value) => (Children::Leaf, value),
            Shape::Group(specs) => {
                let ids = specs
                    .into_iter()
                    .map(|(name, child)| (name, self.alloc(child, Some(id))))
                    .collect();
                (Children::Group(ids), Value::Record(BTreeMap::new()))
            }
            Shape::Array(specs) => {
                let ids = specs
                    .into_iter()
                    .map(|child| self.alloc(child, Some(id)))
                    .collect();
                (Children::Array(ids), Value::List(Vec::new()))
            }
        };
        self.nodes[id.0] = Some(Node {
            children,
            parent,
            validators,
            calculators,
            value,
            errors: None,
            status: Status::Valid,
            disabled,
            touched: false,
            dirty: false,
            calculating: false,
            value_changes: Subject::new(),
            status_changes: Subject::new(),
        });
        id
    }

    fn slot(&self, id: ControlId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: ControlId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn node(&self, id: ControlId) -> Result<&Node, FormError> {
        self.slot(id).ok_or(FormError::UnknownControl { id })
    }

    fn node_mut(&mut self, id: ControlId) -> Result<&mut Node, FormError> {
        self.slot_mut(id).ok_or(FormError::UnknownControl { id })
    }

    fn child_ids(&self, id: ControlId) -> Vec<ControlId> {
        self.slot(id).map(Node::child_ids).unwrap_or_default()
    }

    /// Subtree ids, children before parents.
    fn post_order(&self, id: ControlId) -> Vec<ControlId> {
        let mut out = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                out.push(current);
                continue;
            }
            stack.push((current, true));
            for child in self.child_ids(current).into_iter().rev() {
                stack.push((child, false));
            }
        }
        out
    }

    fn array_children(&self, id: ControlId) -> Result<&Vec<ControlId>, FormError> {
        let node = self.node(id)?;
        match &node.children {
            Children::Array(children) => Ok(children),
            _ => Err(FormError::WrongKind {
                id,
                expected: ControlKind::Array,
                actual: node.kind(),
            }),
        }
    }

    fn array_children_mut(&mut self, id: ControlId) -> Result<&mut Vec<ControlId>, FormError> {
        let node = self.node_mut(id)?;
        let actual = node.kind();
        match &mut node.children {
            Children::Array(children) => Ok(children),
            _ => Err(FormError::WrongKind {
                id,
                expected: ControlKind::Array,
                actual,
            }),
        }
    }

    /// Own flag or any ancestor's flag.
    fn is_masked(&self, id: ControlId) -> bool {
        let mut current = Some(id);
        while let Some(cid) = current {
            match self.slot(cid) {
                Some(node) if node.disabled => return true,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        false
    }

    // ── recomputation ────────────────────────────

    fn settle(&mut self, id: ControlId) {
        for cid in self.post_order(id) {
            self.recompute(cid);
        }
    }

    fn aggregate(&self, id: ControlId) -> Option<Value> {
        let node = self.slot(id)?;
        let enabled = |cid: &ControlId| self.slot(*cid).filter(|child| !child.disabled);
        let value = match &node.children {
            Children::Leaf => node.value.clone(),
            Children::Group(children) => Value::Record(
                children
                    .iter()
                    .filter_map(|(name, cid)| enabled(cid).map(|c| (name.clone(), c.value.clone())))
                    .collect(),
            ),
            Children::Array(children) => Value::List(
                children
                    .iter()
                    .filter_map(|cid| enabled(cid).map(|c| c.value.clone()))
                    .collect(),
            ),
        };
        Some(value)
    }

    fn run_validators(&self, id: ControlId) -> Option<ValidationErrors> {
        let node = self.slot(id)?;
        let control = ControlRef::new(self, id);
        let mut errors = ValidationErrors::new();
        for validator in &node.validators {
            if let Some(found) = validator.validate(&control) {
                errors.extend(found);
            }
        }
        (!errors.is_empty()).then_some(errors)
    }

    /// Value and validity of one control, from its children's current state.
    fn recompute(&mut self, id: ControlId) {
        let Some(value) = self.aggregate(id) else {
            return;
        };
        let masked = self.is_masked(id);
        if let Some(node) = self.slot_mut(id) {
            node.value = value;
        }
        let (errors, status) = if masked {
            (None, Status::Disabled)
        } else {
            let errors = self.run_validators(id);
            let child_invalid = self
                .child_ids(id)
                .iter()
                .any(|cid| self.slot(*cid).is_some_and(|c| c.status == Status::Invalid));
            let status = if errors.is_some() || child_invalid {
                Status::Invalid
            } else {
                Status::Valid
            };
            (errors, status)
        };
        if let Some(node) = self.slot_mut(id) {
            node.errors = errors;
            node.status = status;
        }
    }

    fn emit(&mut self, id: ControlId) {
        if let Some(node) = self.slot_mut(id) {
            let Node {
                value,
                status,
                value_changes,
                status_changes,
                ..
            } = node;
            value_changes.next(value);
            status_changes.next(status);
        }
    }

    fn run_calculators(&mut self, id: ControlId) -> Result<(), FormError> {
        let calculators = match self.slot_mut(id) {
            Some(node) if !node.calculating && !node.calculators.is_empty() => {
                node.calculating = true;
                node.calculators.clone()
            }
            _ => return Ok(()),
        };
        let result = calculators.iter().try_for_each(|calculator| {
            trace!(control = %id, calculator = calculator.name(), "running calculator");
            calculator.run(self, id)
        });
        if let Some(node) = self.slot_mut(id) {
            node.calculating = false;
        }
        result
    }

    fn propagate(&mut self, id: ControlId, opts: UpdateOptions) -> Result<(), FormError> {
        let mut current = Some(id);
        while let Some(cid) = current {
            self.run_calculators(cid)?;
            self.recompute(cid);
            if let Some(node) = self.slot(cid) {
                trace!(control = %cid, kind = %node.kind(), status = %node.status, "update pass");
            }
            if opts.emit_event {
                self.emit(cid);
            }
            current = if opts.only_self {
                None
            } else {
                self.slot(cid).and_then(|node| node.parent)
            };
        }
        Ok(())
    }

    /// Recompute `id` (value and validity together), then its ancestors
    /// unless `only_self`.
    pub fn update_value_and_validity(
        &mut self,
        id: ControlId,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        self.node(id)?;
        self.propagate(id, opts)
    }

    /// Re-run every validator in the subtree, children first.
    ///
    /// Values are left as they are and calculators do not run. Status
    /// subscribers are notified for controls whose status moved.
    pub fn refresh(&mut self, id: ControlId) -> Result<(), FormError> {
        self.node(id)?;
        for cid in self.post_order(id) {
            let before = self.slot(cid).map(|node| node.status);
            self.recompute(cid);
            if let Some(node) = self.slot_mut(cid) {
                if before != Some(node.status) {
                    node.status_changes.next(&node.status);
                }
            }
        }
        Ok(())
    }

    // ── reading ──────────────────────────────────

    /// A validator-style view of one control.
    pub fn control(&self, id: ControlId) -> Result<ControlRef<'_>, FormError> {
        self.node(id)?;
        Ok(ControlRef::new(self, id))
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.slot(id).is_some()
    }

    pub fn kind(&self, id: ControlId) -> Result<ControlKind, FormError> {
        Ok(self.node(id)?.kind())
    }

    /// Aggregate value: disabled children are left out of groups and arrays.
    pub fn value(&self, id: ControlId) -> Result<&Value, FormError> {
        Ok(&self.node(id)?.value)
    }

    /// Value including disabled descendants. Groups always carry their full
    /// key set here.
    pub fn raw_value(&self, id: ControlId) -> Result<Value, FormError> {
        let node = self.node(id)?;
        match &node.children {
            Children::Leaf => Ok(node.value.clone()),
            Children::Group(children) => children
                .iter()
                .map(|(name, cid)| self.raw_value(*cid).map(|v| (name.clone(), v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Record),
            Children::Array(children) => children
                .iter()
                .map(|cid| self.raw_value(*cid))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        }
    }

    pub fn status(&self, id: ControlId) -> Result<Status, FormError> {
        Ok(self.node(id)?.status)
    }

    /// True unless the status is `Invalid`; disabled controls count as valid.
    pub fn is_valid(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(self.status(id)? != Status::Invalid)
    }

    pub fn is_invalid(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(self.status(id)? == Status::Invalid)
    }

    /// Disabled by its own flag or by an ancestor.
    pub fn is_disabled(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(self.status(id)? == Status::Disabled)
    }

    pub fn is_enabled(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(!self.is_disabled(id)?)
    }

    /// Errors from validators attached to this control only.
    pub fn errors(&self, id: ControlId) -> Result<Option<&ValidationErrors>, FormError> {
        Ok(self.node(id)?.errors.as_ref())
    }

    pub fn has_error(&self, id: ControlId, kind: &str) -> bool {
        self.slot(id)
            .and_then(|node| node.errors.as_ref())
            .is_some_and(|errors| errors.contains_key(kind))
    }

    pub fn touched(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(self.node(id)?.touched)
    }

    pub fn dirty(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(self.node(id)?.dirty)
    }

    pub fn parent(&self, id: ControlId) -> Result<Option<ControlId>, FormError> {
        Ok(self.node(id)?.parent)
    }

    pub fn root_of(&self, id: ControlId) -> Result<ControlId, FormError> {
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// Child by name (group) or decimal index (array).
    pub fn get(&self, id: ControlId, name: &str) -> Option<ControlId> {
        match &self.slot(id)?.children {
            Children::Leaf => None,
            Children::Group(children) => children
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, cid)| *cid),
            Children::Array(children) => {
                let index: usize = name.parse().ok()?;
                children.get(index).copied()
            }
        }
    }

    /// Descendant by dot-separated path; the empty path is `id` itself.
    pub fn get_path(&self, id: ControlId, path: &str) -> Option<ControlId> {
        self.slot(id)?;
        if path.is_empty() {
            return Some(id);
        }
        path.split('.')
            .try_fold(id, |current, segment| self.get(current, segment))
    }

    /// Array child at `index`, or `None` when out of range.
    pub fn at(&self, id: ControlId, index: usize) -> Option<ControlId> {
        match &self.slot(id)?.children {
            Children::Array(children) => children.get(index).copied(),
            _ => None,
        }
    }

    /// Number of children of a group or array.
    pub fn len(&self, id: ControlId) -> Result<usize, FormError> {
        let node = self.node(id)?;
        match &node.children {
            Children::Group(children) => Ok(children.len()),
            Children::Array(children) => Ok(children.len()),
            Children::Leaf => Err(FormError::WrongKind {
                id,
                expected: ControlKind::Array,
                actual: ControlKind::Leaf,
            }),
        }
    }

    pub fn is_empty(&self, id: ControlId) -> Result<bool, FormError> {
        Ok(self.len(id)? == 0)
    }

    /// Children in construction order (empty for a leaf).
    pub fn controls(&self, id: ControlId) -> Result<Vec<(ControlKey, ControlId)>, FormError> {
        let node = self.node(id)?;
        Ok(match &node.children {
            Children::Leaf => Vec::new(),
            Children::Group(children) => children
                .iter()
                .map(|(name, cid)| (ControlKey::Name(name.clone()), *cid))
                .collect(),
            Children::Array(children) => children
                .iter()
                .enumerate()
                .map(|(index, cid)| (ControlKey::Index(index), *cid))
                .collect(),
        })
    }

    /// Every validation message in the subtree, parents before children.
    ///
    /// Ancestors never copy their descendants' messages, so this walk is the
    /// only way to list them all.
    pub fn collect_errors(&self, id: ControlId) -> Result<Vec<FieldError>, FormError> {
        self.node(id)?;
        let mut found = Vec::new();
        let mut stack = vec![(id, String::new())];
        while let Some((cid, path)) = stack.pop() {
            let node = self.node(cid)?;
            if let Some(errors) = &node.errors {
                found.extend(errors.iter().map(|(kind, message)| FieldError {
                    path: path.clone(),
                    kind: kind.clone(),
                    message: message.clone(),
                }));
            }
            for (key, child) in self.controls(cid)?.into_iter().rev() {
                let segment = key.segment();
                let child_path = if path.is_empty() {
                    segment
                } else {
                    format!("{}.{}", path, segment)
                };
                stack.push((child, child_path));
            }
        }
        Ok(found)
    }

    // ── writing values ───────────────────────────

    fn check_write(&self, id: ControlId, value: &Value, mode: WriteMode) -> Result<(), FormError> {
        let node = self.node(id)?;
        let mismatch = |expected| FormError::ShapeMismatch {
            id,
            expected,
            got: value.type_name(),
        };
        match &node.children {
            Children::Leaf => {
                if !value.is_scalar() {
                    return Err(mismatch("scalar"));
                }
            }
            Children::Group(children) => {
                let fields = value.as_record().ok_or_else(|| mismatch("record"))?;
                if mode == WriteMode::Set {
                    for key in fields.keys() {
                        if !children.iter().any(|(name, _)| name == key) {
                            return Err(FormError::MissingControl {
                                key: ControlKey::Name(key.clone()),
                            });
                        }
                    }
                }
                for (name, cid) in children {
                    match fields.get(name) {
                        Some(field) => self.check_write(*cid, field, mode)?,
                        None if mode == WriteMode::Set => {
                            return Err(FormError::MissingControlValue {
                                key: ControlKey::Name(name.clone()),
                            })
                        }
                        None => {}
                    }
                }
            }
            Children::Array(children) => {
                let items = value.as_list().ok_or_else(|| mismatch("list"))?;
                if mode == WriteMode::Set {
                    if items.len() > children.len() {
                        return Err(FormError::MissingControl {
                            key: ControlKey::Index(children.len()),
                        });
                    }
                    if items.len() < children.len() {
                        return Err(FormError::MissingControlValue {
                            key: ControlKey::Index(items.len()),
                        });
                    }
                }
                for (cid, item) in children.iter().zip(items) {
                    self.check_write(*cid, item, mode)?;
                }
            }
        }
        Ok(())
    }

    /// Store `value` into the subtree; every descendant gets its own
    /// `only_self` pass, children before parents.
    fn apply_write(
        &mut self,
        id: ControlId,
        value: &Value,
        emit_event: bool,
    ) -> Result<(), FormError> {
        let inner = UpdateOptions {
            only_self: true,
            emit_event,
        };
        let targets: Vec<(ControlId, &Value)> = match &self.node(id)?.children {
            Children::Leaf => Vec::new(),
            Children::Group(children) => children
                .iter()
                .filter_map(|(name, cid)| value.get(name).map(|v| (*cid, v)))
                .collect(),
            Children::Array(children) => match value.as_list() {
                Some(items) => children.iter().copied().zip(items.iter()).collect(),
                None => Vec::new(),
            },
        };
        if targets.is_empty() {
            if let Some(node) = self.slot_mut(id) {
                if matches!(node.children, Children::Leaf) {
                    node.value = value.clone();
                }
            }
            return Ok(());
        }
        for (child, child_value) in targets {
            self.apply_write(child, child_value, emit_event)?;
            self.propagate(child, inner)?;
        }
        Ok(())
    }

    /// Replace the value. Groups and arrays need a value for every child.
    pub fn set_value(
        &mut self,
        id: ControlId,
        value: Value,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        self.check_write(id, &value, WriteMode::Set)?;
        self.apply_write(id, &value, opts.emit_event)?;
        self.propagate(id, opts)
    }

    /// Write the provided keys/indices only, then run one pass on `id`.
    ///
    /// Cross-field validators on `id` therefore see all new values at once.
    pub fn patch_value(
        &mut self,
        id: ControlId,
        value: Value,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        self.check_write(id, &value, WriteMode::Patch)?;
        self.apply_write(id, &value, opts.emit_event)?;
        self.propagate(id, opts)
    }

    /// Clear touched/dirty in the subtree and optionally patch a new value.
    pub fn reset(
        &mut self,
        id: ControlId,
        value: Option<Value>,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        if let Some(value) = &value {
            self.check_write(id, value, WriteMode::Patch)?;
        }
        for cid in self.post_order(id) {
            if let Some(node) = self.slot_mut(cid) {
                node.touched = false;
                node.dirty = false;
            }
        }
        if !opts.only_self {
            self.refresh_ancestor_flag(id, Flag::Touched);
            self.refresh_ancestor_flag(id, Flag::Dirty);
        }
        if let Some(value) = &value {
            self.apply_write(id, value, opts.emit_event)?;
        }
        self.propagate(id, opts)
    }

    /// Write a computed value into `id` with an `only_self` pass, skipping
    /// the write when nothing would change. Returns whether it wrote.
    pub fn set_calculated(&mut self, id: ControlId, value: Value) -> Result<bool, FormError> {
        if self.value(id)?.same_as(&value) {
            return Ok(false);
        }
        self.set_value(id, value, UpdateOptions::only_self())?;
        Ok(true)
    }

    // ── enable / disable ─────────────────────────

    pub fn disable(&mut self, id: ControlId, opts: UpdateOptions) -> Result<(), FormError> {
        self.set_disabled(id, true, opts)
    }

    pub fn enable(&mut self, id: ControlId, opts: UpdateOptions) -> Result<(), FormError> {
        self.set_disabled(id, false, opts)
    }

    fn set_disabled(
        &mut self,
        id: ControlId,
        disabled: bool,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        self.node_mut(id)?.disabled = disabled;
        debug!(control = %id, disabled, "toggled control");
        self.settle(id);
        if opts.emit_event {
            self.emit(id);
        }
        match self.parent(id)? {
            Some(parent) if !opts.only_self => self.propagate(parent, opts),
            _ => Ok(()),
        }
    }

    // ── array mutation ───────────────────────────

    /// Insert a new child built from `spec` at `index` (`0..=len`).
    pub fn insert(
        &mut self,
        array: ControlId,
        index: usize,
        spec: ControlSpec,
        opts: UpdateOptions,
    ) -> Result<ControlId, FormError> {
        let len = self.array_children(array)?.len();
        if index > len {
            return Err(FormError::IndexOutOfRange { index, len });
        }
        let child = self.alloc(spec, Some(array));
        self.settle(child);
        self.array_children_mut(array)?.insert(index, child);
        debug!(array = %array, index, control = %child, "inserted control");
        self.propagate(array, opts)?;
        Ok(child)
    }

    /// Append a new child built from `spec`.
    pub fn push(
        &mut self,
        array: ControlId,
        spec: ControlSpec,
        opts: UpdateOptions,
    ) -> Result<ControlId, FormError> {
        let len = self.array_children(array)?.len();
        self.insert(array, len, spec, opts)
    }

    /// Remove and drop the child at `index` together with its subtree.
    pub fn remove_at(
        &mut self,
        array: ControlId,
        index: usize,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        let children = self.array_children_mut(array)?;
        if index >= children.len() {
            return Err(FormError::IndexOutOfRange {
                index,
                len: children.len(),
            });
        }
        let removed = children.remove(index);
        for cid in self.post_order(removed) {
            self.nodes[cid.0] = None;
        }
        debug!(array = %array, index, control = %removed, "removed control");
        self.propagate(array, opts)
    }

    // ── validators and calculators ───────────────

    /// Append validators. They take effect on the next update pass.
    pub fn add_validators(
        &mut self,
        id: ControlId,
        validators: impl IntoIterator<Item = Validator>,
    ) -> Result<(), FormError> {
        self.node_mut(id)?.validators.extend(validators);
        Ok(())
    }

    pub fn clear_validators(&mut self, id: ControlId) -> Result<(), FormError> {
        self.node_mut(id)?.validators.clear();
        Ok(())
    }

    pub fn has_validator(&self, id: ControlId, name: &str) -> bool {
        self.slot(id)
            .is_some_and(|node| node.validators.iter().any(|v| v.name() == name))
    }

    pub fn add_calculator(&mut self, id: ControlId, calculator: Calculator) -> Result<(), FormError> {
        self.node_mut(id)?.calculators.push(calculator);
        Ok(())
    }

    // ── interaction flags ────────────────────────

    fn refresh_ancestor_flag(&mut self, id: ControlId, flag: Flag) {
        let mut current = self.slot(id).and_then(|node| node.parent);
        while let Some(cid) = current {
            let on = self
                .child_ids(cid)
                .iter()
                .any(|child| self.slot(*child).is_some_and(|c| flag.get(c)));
            match self.slot_mut(cid) {
                Some(node) => {
                    flag.set(node, on);
                    current = node.parent;
                }
                None => current = None,
            }
        }
    }

    fn mark(&mut self, id: ControlId, flag: Flag, opts: UpdateOptions) -> Result<(), FormError> {
        flag.set(self.node_mut(id)?, true);
        if opts.only_self {
            return Ok(());
        }
        let mut current = self.parent(id)?;
        while let Some(cid) = current {
            let node = self.node_mut(cid)?;
            flag.set(node, true);
            current = node.parent;
        }
        Ok(())
    }

    fn unmark(&mut self, id: ControlId, flag: Flag, opts: UpdateOptions) -> Result<(), FormError> {
        self.node(id)?;
        for cid in self.post_order(id) {
            if let Some(node) = self.slot_mut(cid) {
                flag.set(node, false);
            }
        }
        if !opts.only_self {
            self.refresh_ancestor_flag(id, flag);
        }
        Ok(())
    }

    /// Mark as touched, and every ancestor too unless `only_self`.
    pub fn mark_as_touched(&mut self, id: ControlId, opts: UpdateOptions) -> Result<(), FormError> {
        self.mark(id, Flag::Touched, opts)
    }

    pub fn mark_as_dirty(&mut self, id: ControlId, opts: UpdateOptions) -> Result<(), FormError> {
        self.mark(id, Flag::Dirty, opts)
    }

    /// Clear touched on the subtree; ancestors stay touched only while some
    /// other child is.
    pub fn mark_as_untouched(
        &mut self,
        id: ControlId,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        self.unmark(id, Flag::Touched, opts)
    }

    pub fn mark_as_pristine(
        &mut self,
        id: ControlId,
        opts: UpdateOptions,
    ) -> Result<(), FormError> {
        self.unmark(id, Flag::Dirty, opts)
    }

    // ── streams ──────────────────────────────────

    fn next_subscription_id(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        SubscriptionId(self.next_subscription)
    }

    /// Subscribe to a control's value. The callback sees the current value
    /// immediately, then every emission.
    pub fn value_changes<F>(&mut self, id: ControlId, callback: F) -> Result<SubscriptionId, FormError>
    where
        F: FnMut(&Value) + 'static,
    {
        let sid = self.next_subscription_id();
        let Node {
            value,
            value_changes,
            ..
        } = self.node_mut(id)?;
        value_changes.subscribe(sid, value, Box::new(callback));
        Ok(sid)
    }

    /// Subscribe to a control's status, replaying the current one.
    pub fn status_changes<F>(&mut self, id: ControlId, callback: F) -> Result<SubscriptionId, FormError>
    where
        F: FnMut(&Status) + 'static,
    {
        let sid = self.next_subscription_id();
        let Node {
            status,
            status_changes,
            ..
        } = self.node_mut(id)?;
        status_changes.subscribe(sid, status, Box::new(callback));
        Ok(sid)
    }

    /// Drop a subscription from either stream of `id`.
    pub fn unsubscribe(&mut self, id: ControlId, subscription: SubscriptionId) -> Result<bool, FormError> {
        let node = self.node_mut(id)?;
        let from_values = node.value_changes.unsubscribe(subscription);
        let from_status = node.status_changes.unsubscribe(subscription);
        Ok(from_values || from_status)
    }

    // ── copying ──────────────────────────────────

    /// Snapshot of a subtree: raw values, validators, calculators and
    /// disabled flags.
    pub fn spec_of(&self, id: ControlId) -> Result<ControlSpec, FormError> {
        let node = self.node(id)?;
        let mut spec = match &node.children {
            Children::Leaf => ControlSpec::leaf(node.value.clone()),
            Children::Group(children) => ControlSpec::group(
                children
                    .iter()
                    .map(|(name, cid)| self.spec_of(*cid).map(|c| (name.clone(), c)))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Children::Array(children) => ControlSpec::array(
                children
                    .iter()
                    .map(|cid| self.spec_of(*cid))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        spec.validators = node.validators.clone();
        spec.calculators = node.calculators.clone();
        spec.disabled = node.disabled;
        Ok(spec)
    }

    /// An independent form whose root is a copy of the subtree at `id`.
    ///
    /// Nothing is shared with the original except the validator and
    /// calculator functions themselves.
    pub fn copy_control(&self, id: ControlId) -> Result<Form, FormError> {
        let spec = self.spec_of(id)?;
        debug!(control = %id, "copied control");
        Ok(Form::new(spec))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

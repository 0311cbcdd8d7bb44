//! Declarative description of a control subtree.
//!
//! A `ControlSpec` is what `Form::new`, `Form::insert` and `Form::push`
//! consume, and what `Form::spec_of` produces when copying a subtree.

use crate::calculator::Calculator;
use crate::control::ControlKind;
use crate::validator::Validator;
use crate::value::Value;

/// The shape of a control: decided once, never inferred at use sites.
#[derive(Debug, Clone)]
pub enum Shape {
    Leaf(Value),
    Group(Vec<(String, ControlSpec)>),
    Array(Vec<ControlSpec>),
}

/// A control subtree with its validators, calculators and disabled flag.
#[derive(Debug, Clone)]
pub struct ControlSpec {
    pub(crate) shape: Shape,
    pub(crate) validators: Vec<Validator>,
    pub(crate) calculators: Vec<Calculator>,
    pub(crate) disabled: bool,
}

impl ControlSpec {
    fn from_shape(shape: Shape) -> Self {
        ControlSpec {
            shape,
            validators: Vec::new(),
            calculators: Vec::new(),
            disabled: false,
        }
    }

    /// A leaf holding a scalar.
    pub fn leaf(value: impl Into<Value>) -> Self {
        ControlSpec::from_shape(Shape::Leaf(value.into()))
    }

    /// A group with a fixed, ordered set of named children.
    pub fn group<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ControlSpec)>,
    {
        ControlSpec::from_shape(Shape::Group(
            children.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        ))
    }

    /// An array of same-shaped children.
    pub fn array(children: impl IntoIterator<Item = ControlSpec>) -> Self {
        ControlSpec::from_shape(Shape::Array(children.into_iter().collect()))
    }

    /// Build a spec mirroring a plain value: records become groups, lists
    /// become arrays, scalars become leaves. No validators are attached.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Record(fields) => ControlSpec::group(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), ControlSpec::infer(v))),
            ),
            Value::List(items) => ControlSpec::array(items.iter().map(ControlSpec::infer)),
            scalar => ControlSpec::leaf(scalar.clone()),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }

    pub fn with_calculator(mut self, calculator: Calculator) -> Self {
        self.calculators.push(calculator);
        self
    }

    /// Start the control disabled.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn kind(&self) -> ControlKind {
        match self.shape {
            Shape::Leaf(_) => ControlKind::Leaf,
            Shape::Group(_) => ControlKind::Group,
            Shape::Array(_) => ControlKind::Array,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Mutable access to a named child of a group spec.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ControlSpec> {
        match &mut self.shape {
            Shape::Group(children) => children
                .iter_mut()
                .find(|(k, _)| k == name)
                .map(|(_, c)| c),
            _ => None,
        }
    }
}

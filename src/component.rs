//! Component Capability
//!
//! The contract every signal unit satisfies so the graph can drive it without
//! knowing its concrete type: a fixed port description and a step function
//! computing outputs from the inputs currently resident in its ports.

use crate::port::ComponentDescription;
use crate::value::{Value, ValueKind};
use thiserror::Error;

/// Per-iteration information handed to every unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub sampling_frequency: u32,
}

/// Errors raised by a unit, either while it is constructed or while it steps
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    #[error("input '{port}' expects {expected}, found {found}")]
    InputType {
        port: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("sampling frequency {0} Hz is not usable")]
    InvalidSamplingFrequency(u32),

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("argument '{name}' expects {expected}, found {found}")]
    ArgumentType {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("argument '{0}' given more than once")]
    DuplicateArgument(String),

    #[error("{0}")]
    Failed(String),
}

/// Type-erased unit interface driven by the graph
pub trait Component: Send + Sync {
    /// Ports of the unit; must not change after construction
    fn description(&self) -> &ComponentDescription;

    /// Compute one sample.
    ///
    /// `inputs` and `outputs` are the unit's port slots, in description order.
    /// Must not call back into the graph.
    fn step(
        &mut self,
        ctx: &ExecutionContext,
        inputs: &[Value],
        outputs: &mut [Value],
    ) -> Result<(), ComponentError>;

    /// Reset internal state (phase accumulators and the like)
    fn reset(&mut self) {}

    /// Registry name of the unit type
    fn type_name(&self) -> &'static str {
        "unknown"
    }
}

/// Read a Float input, reporting the port name on a kind mismatch
pub fn float_input(
    description: &ComponentDescription,
    inputs: &[Value],
    index: usize,
) -> Result<f64, ComponentError> {
    let value = inputs.get(index).ok_or_else(|| {
        ComponentError::Failed(format!("input {} missing from port slots", index))
    })?;
    value.as_float().ok_or_else(|| ComponentError::InputType {
        port: description
            .inputs
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        expected: ValueKind::Float,
        found: value.kind(),
    })
}

/// Named construction arguments, consumed by a unit's constructor.
///
/// Constructors `take` what they understand and then call [`Arguments::finish`],
/// which rejects anything left over. Arguments are bound once; a unit never
/// sees them again after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form; a repeated name replaces the earlier value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Result<(), ComponentError> {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(ComponentError::DuplicateArgument(name));
        }
        self.entries.push((name, value));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Take a Float argument. Integers are widened.
    pub fn take_float(&mut self, name: &str) -> Result<Option<f64>, ComponentError> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Float(v)) => Ok(Some(v)),
            Some(Value::Integer(v)) => Ok(Some(v as f64)),
            Some(other) => Err(ComponentError::ArgumentType {
                name: name.to_string(),
                expected: ValueKind::Float,
                found: other.kind(),
            }),
        }
    }

    /// Fail on the first argument nobody took
    pub fn finish(self) -> Result<(), ComponentError> {
        match self.entries.into_iter().next() {
            Some((name, _)) => Err(ComponentError::UnknownArgument(name)),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Arguments::new(), |args, (name, value)| args.with(name, value))
    }
}

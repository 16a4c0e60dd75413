//! Port Descriptions
//!
//! A unit describes its ports once, at construction. The order of each list is
//! significant: a port's position becomes its connector index inside the graph
//! and is never renumbered.

use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a unit a port lives on.
///
/// Input and output connector indices are independent spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Definition of a single port (input or output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Unique among the unit's ports of the same direction (e.g. "freq", "sample")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Content the port holds before anything writes it; its kind is the
    /// kind the port expects
    pub initial: Value,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            initial: Value::zero(kind),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_initial(mut self, initial: Value) -> Self {
        self.initial = initial;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.initial.kind()
    }
}

/// Ordered input and output ports of a unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescription {
    pub inputs: Vec<PortDescriptor>,
    pub outputs: Vec<PortDescriptor>,
}

impl ComponentDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, port: PortDescriptor) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortDescriptor) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn ports(&self, direction: Direction) -> &[PortDescriptor] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Connector index of the named port
    pub fn index_of(&self, direction: Direction, name: &str) -> Option<usize> {
        self.ports(direction).iter().position(|p| p.name == name)
    }

    pub fn input_by_name(&self, name: &str) -> Option<&PortDescriptor> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_by_name(&self, name: &str) -> Option<&PortDescriptor> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Fresh port slots holding every port's initial value
    pub fn initial_values(&self, direction: Direction) -> Vec<Value> {
        self.ports(direction)
            .iter()
            .map(|p| p.initial.clone())
            .collect()
    }
}

//! DDL Interpreter
//!
//! Applies parsed statements to a graph, keeping a table from DDL variable
//! names to the units they were bound to.

use super::lexer::Position;
use super::parser::{Connector, Statement};
use crate::component::{Arguments, ComponentError};
use crate::graph::{ComponentId, Graph, GraphError};
use crate::registry::{ComponentRegistry, RegistryError};
use crate::value::{Value, ValueKind};
use std::collections::HashMap;
use thiserror::Error;

pub const SAMPLING_FREQ: &str = "SAMPLING_FREQ";
pub const OUTPUT_COMPONENT: &str = "OUTPUT_COMPONENT";
pub const OUTPUT_PORT: &str = "OUTPUT_PORT";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    #[error("{position}: unknown parameter '{name}'")]
    UnknownParameter { name: String, position: Position },

    #[error("{position}: {name} expects {expected}, found {found}")]
    ParameterType {
        name: String,
        expected: ValueKind,
        found: ValueKind,
        position: Position,
    },

    #[error("{position}: {name} can be set only once")]
    ParameterAlreadySet { name: String, position: Position },

    #[error("{position}: sampling frequency {value} is out of range")]
    InvalidSamplingFrequency { value: i64, position: Position },

    #[error("{position}: variable '{name}' is not declared")]
    UnknownVariable { name: String, position: Position },

    #[error("{position}: variable '{name}' is already declared")]
    DuplicateVariable { name: String, position: Position },

    #[error("{position}: unknown component type '{type_name}'")]
    UnknownComponent { type_name: String, position: Position },

    #[error("{position}: cannot construct {type_name}: {source}")]
    Construction {
        type_name: String,
        #[source]
        source: ComponentError,
        position: Position,
    },

    #[error("{position}: {source}")]
    Graph {
        #[source]
        source: GraphError,
        position: Position,
    },
}

impl InterpretError {
    /// Position of the failing statement
    pub fn position(&self) -> Position {
        match self {
            InterpretError::UnknownParameter { position, .. }
            | InterpretError::ParameterType { position, .. }
            | InterpretError::ParameterAlreadySet { position, .. }
            | InterpretError::InvalidSamplingFrequency { position, .. }
            | InterpretError::UnknownVariable { position, .. }
            | InterpretError::DuplicateVariable { position, .. }
            | InterpretError::UnknownComponent { position, .. }
            | InterpretError::Construction { position, .. }
            | InterpretError::Graph { position, .. } => *position,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }
}

/// Builds one graph from a statement sequence.
///
/// Not meant to be reused across patch descriptions.
pub struct Interpreter<'r> {
    registry: &'r ComponentRegistry,
    graph: Graph,
    variables: HashMap<String, ComponentId>,
    output_component: Option<ComponentId>,
    output_port: Option<String>,
    output_bound: bool,
}

impl<'r> Interpreter<'r> {
    pub fn new(registry: &'r ComponentRegistry, graph: Graph) -> Self {
        Self {
            registry,
            graph,
            variables: HashMap::new(),
            output_component: None,
            output_port: None,
            output_bound: false,
        }
    }

    /// Execute statements in order, stopping at the first error from either
    /// the statement source or the interpreter
    pub fn run<I, E>(&mut self, statements: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<Statement, E>>,
        E: From<InterpretError>,
    {
        for statement in statements {
            self.execute(statement?)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, statement: Statement) -> Result<(), InterpretError> {
        let position = statement.position();
        tracing::debug!(%position, ?statement, "ddl_statement");

        match statement {
            Statement::Parameter { name, value, .. } => self.parameter(name, value, position),
            Statement::CreateComponent {
                variable,
                type_name,
                arguments,
                ..
            } => self.create(variable, &type_name, arguments, position),
            Statement::Connect { from, to, .. } => self.connect(&from, &to, position),
        }
    }

    /// Unit bound to a DDL variable
    pub fn variable(&self, name: &str) -> Option<ComponentId> {
        self.variables.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, ComponentId)> {
        self.variables.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    fn parameter(
        &mut self,
        name: String,
        value: Value,
        position: Position,
    ) -> Result<(), InterpretError> {
        match name.as_str() {
            SAMPLING_FREQ => {
                let Value::Integer(requested) = value else {
                    return Err(InterpretError::ParameterType {
                        name,
                        expected: ValueKind::Integer,
                        found: value.kind(),
                        position,
                    });
                };
                let hz = u32::try_from(requested)
                    .ok()
                    .filter(|&hz| hz > 0)
                    .ok_or(InterpretError::InvalidSamplingFrequency {
                        value: requested,
                        position,
                    })?;
                self.graph.set_sampling_frequency(hz);
            }
            OUTPUT_COMPONENT => {
                if self.output_component.is_some() {
                    return Err(InterpretError::ParameterAlreadySet { name, position });
                }
                let variable = expect_string(name, value, position)?;
                self.output_component = Some(self.lookup(&variable, position)?);
            }
            OUTPUT_PORT => {
                if self.output_port.is_some() {
                    return Err(InterpretError::ParameterAlreadySet { name, position });
                }
                self.output_port = Some(expect_string(name, value, position)?);
            }
            _ => return Err(InterpretError::UnknownParameter { name, position }),
        }

        self.bind_output(position)
    }

    /// Designate the output once both halves are known
    fn bind_output(&mut self, position: Position) -> Result<(), InterpretError> {
        if self.output_bound {
            return Ok(());
        }
        if let (Some(component), Some(port)) = (self.output_component, &self.output_port) {
            // Marked first so a failure is not retried by later statements
            self.output_bound = true;
            self.graph
                .set_output(component, port)
                .map_err(|source| InterpretError::Graph { source, position })?;
        }
        Ok(())
    }

    fn create(
        &mut self,
        variable: String,
        type_name: &str,
        arguments: Arguments,
        position: Position,
    ) -> Result<(), InterpretError> {
        if self.variables.contains_key(&variable) {
            return Err(InterpretError::DuplicateVariable {
                name: variable,
                position,
            });
        }

        let component = self
            .registry
            .instantiate(type_name, arguments)
            .map_err(|err| match err {
                RegistryError::UnknownComponent(type_name) => {
                    InterpretError::UnknownComponent { type_name, position }
                }
                RegistryError::Construction { type_name, source } => {
                    InterpretError::Construction {
                        type_name,
                        source,
                        position,
                    }
                }
            })?;

        let id = self.graph.add_component(component);
        self.variables.insert(variable, id);
        Ok(())
    }

    fn connect(
        &mut self,
        from: &Connector,
        to: &Connector,
        position: Position,
    ) -> Result<(), InterpretError> {
        let source = self.lookup(&from.variable, position)?;
        let destination = self.lookup(&to.variable, position)?;
        self.graph
            .add_cable(source, &from.port, destination, &to.port)
            .map_err(|source| InterpretError::Graph { source, position })?;
        Ok(())
    }

    fn lookup(&self, name: &str, position: Position) -> Result<ComponentId, InterpretError> {
        self.variable(name)
            .ok_or_else(|| InterpretError::UnknownVariable {
                name: name.to_string(),
                position,
            })
    }
}

fn expect_string(
    name: String,
    value: Value,
    position: Position,
) -> Result<String, InterpretError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(InterpretError::ParameterType {
            name,
            expected: ValueKind::String,
            found: other.kind(),
            position,
        }),
    }
}

//! Patch Graph Engine
//!
//! Owns every unit and cable of a patch and executes them one sample at a time.
//!
//! An iteration has two strictly ordered phases:
//!
//! 1. **Propagate**: every live cable copies the value resident in its source
//!    output port into its destination input port.
//! 2. **Step**: every live unit runs once, in ascending slot order, reading only
//!    its own input ports.
//!
//! Because values cross cables before units step, each cable adds exactly one
//! sample of latency. Execution is therefore well defined for any topology,
//! feedback loops included, without sorting the graph.

use crate::arena::Arena;
use crate::component::{Component, ComponentError, ExecutionContext};
use crate::config::EngineConfig;
use crate::port::{ComponentDescription, Direction};
use crate::value::{Sample, Value, ValueKind};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, Key};
use std::collections::HashMap;
use std::fmt;
use std::io;
use thiserror::Error;

/// Bytes in one streamed stereo frame
pub const FRAME_BYTES: usize = 4;

new_key_type! {
    /// Identifier of a unit in the graph.
    ///
    /// The slot index may be recycled after deletion; the generation tells a
    /// stale identifier apart from the unit now living in that slot.
    pub struct ComponentId;

    /// Identifier of a cable in the graph
    pub struct CableId;
}

/// Numeric view of a graph identifier
pub trait SlotId: Key {
    /// Recyclable slot index
    fn slot(&self) -> u32 {
        self.data().as_ffi() as u32
    }

    /// Epoch of the slot; changes every time the slot is reused
    fn generation(&self) -> u32 {
        (self.data().as_ffi() >> 32) as u32
    }
}

impl SlotId for ComponentId {}
impl SlotId for CableId {}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot(), self.generation())
    }
}

impl fmt::Display for CableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{}v{}", self.slot(), self.generation())
    }
}

/// A specific port on a specific unit.
///
/// Input and output connectors are numbered independently, so the direction
/// is implied by where the address is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    pub component: ComponentId,
    pub connector: usize,
}

impl PortAddress {
    pub fn new(component: ComponentId, connector: usize) -> Self {
        Self {
            component,
            connector,
        }
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.connector)
    }
}

/// A one-sample-delay connection from an output port to an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cable {
    pub source: PortAddress,
    pub destination: PortAddress,
}

/// Error types for graph operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    #[error("component {component} has no {direction} port named '{name}'")]
    UnknownPort {
        component: ComponentId,
        direction: Direction,
        name: String,
    },

    #[error("unknown cable {0}")]
    UnknownCable(CableId),

    #[error("input {0} is already connected")]
    InputAlreadyConnected(PortAddress),

    #[error("component {component} failed to execute: {source}")]
    Execution {
        component: ComponentId,
        #[source]
        source: ComponentError,
    },

    #[error("buffer of {len} bytes is not a whole number of 4-byte frames")]
    MisalignedBuffer { len: usize },
}

/// Internal unit representation
struct ComponentSlot {
    component: Box<dyn Component>,
    inputs: Vec<Value>,
    outputs: Vec<Value>,
    input_names: HashMap<String, usize>,
    output_names: HashMap<String, usize>,
}

impl ComponentSlot {
    fn names(&self, direction: Direction) -> &HashMap<String, usize> {
        match direction {
            Direction::Input => &self.input_names,
            Direction::Output => &self.output_names,
        }
    }

    fn values(&self, direction: Direction) -> &[Value] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }
}

/// The patch graph: units, cables and the streamed output
pub struct Graph {
    components: Arena<ComponentId, ComponentSlot>,
    cables: Arena<CableId, Cable>,

    // At most one cable per input
    destination_index: HashMap<PortAddress, CableId>,
    // Any number of cables per output
    source_index: HashMap<PortAddress, Vec<CableId>>,

    sampling_frequency: u32,
    max_frames_per_read: usize,
    output: Option<PortAddress>,
}

impl Graph {
    /// Create an empty graph running at `sampling_frequency` Hz
    pub fn new(sampling_frequency: u32) -> Self {
        Self::with_config(&EngineConfig::default().with_sampling_frequency(sampling_frequency))
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            components: Arena::new(),
            cables: Arena::new(),
            destination_index: HashMap::new(),
            source_index: HashMap::new(),
            sampling_frequency: config.sampling_frequency,
            max_frames_per_read: config.max_frames_per_read.max(1),
            output: None,
        }
    }

    pub fn sampling_frequency(&self) -> u32 {
        self.sampling_frequency
    }

    pub fn set_sampling_frequency(&mut self, hz: u32) {
        tracing::debug!(hz, "graph_sampling_frequency");
        self.sampling_frequency = hz;
    }

    pub fn max_frames_per_read(&self) -> usize {
        self.max_frames_per_read
    }

    pub fn set_max_frames_per_read(&mut self, frames: usize) {
        self.max_frames_per_read = frames.max(1);
    }

    /// Add a unit to the graph
    pub fn add<C: Component + 'static>(&mut self, component: C) -> ComponentId {
        self.add_component(Box::new(component))
    }

    /// Add a boxed unit to the graph. Its port names are indexed once, here.
    pub fn add_component(&mut self, component: Box<dyn Component>) -> ComponentId {
        let description = component.description();
        let input_names = port_names(description, Direction::Input);
        let output_names = port_names(description, Direction::Output);
        let inputs = description.initial_values(Direction::Input);
        let outputs = description.initial_values(Direction::Output);
        let type_name = component.type_name();

        let id = self.components.insert(ComponentSlot {
            component,
            inputs,
            outputs,
            input_names,
            output_names,
        });
        tracing::debug!(component = %id, type_name, "graph_add");
        id
    }

    /// Remove a unit along with every cable touching it
    pub fn delete_component(&mut self, id: ComponentId) -> Result<(), GraphError> {
        let slot = self
            .components
            .get(id)
            .ok_or(GraphError::UnknownComponent(id))?;

        let mut incident = Vec::new();
        for connector in 0..slot.inputs.len() {
            if let Some(&cable) = self.destination_index.get(&PortAddress::new(id, connector)) {
                incident.push(cable);
            }
        }
        for connector in 0..slot.outputs.len() {
            if let Some(cables) = self.source_index.get(&PortAddress::new(id, connector)) {
                incident.extend_from_slice(cables);
            }
        }

        for cable in incident {
            self.remove_cable(cable);
        }
        self.components.remove(id);

        if self.output.map(|o| o.component) == Some(id) {
            self.output = None;
        }

        tracing::debug!(component = %id, "graph_remove");
        Ok(())
    }

    /// Look up a port by name
    pub fn resolve_port(
        &self,
        id: ComponentId,
        name: &str,
        direction: Direction,
    ) -> Result<PortAddress, GraphError> {
        let slot = self
            .components
            .get(id)
            .ok_or(GraphError::UnknownComponent(id))?;
        let connector = slot
            .names(direction)
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownPort {
                component: id,
                direction,
                name: name.to_string(),
            })?;
        Ok(PortAddress::new(id, connector))
    }

    /// Connect the output `source_port` of `source` to the input
    /// `destination_port` of `destination`
    pub fn add_cable(
        &mut self,
        source: ComponentId,
        source_port: &str,
        destination: ComponentId,
        destination_port: &str,
    ) -> Result<CableId, GraphError> {
        let source = self.resolve_port(source, source_port, Direction::Output)?;
        let destination = self.resolve_port(destination, destination_port, Direction::Input)?;
        self.connect(source, destination)
    }

    /// Connect two already resolved ports
    pub fn connect(
        &mut self,
        source: PortAddress,
        destination: PortAddress,
    ) -> Result<CableId, GraphError> {
        self.check_address(source, Direction::Output)?;
        self.check_address(destination, Direction::Input)?;

        if self.destination_index.contains_key(&destination) {
            return Err(GraphError::InputAlreadyConnected(destination));
        }

        let id = self.cables.insert(Cable {
            source,
            destination,
        });
        self.destination_index.insert(destination, id);
        self.source_index.entry(source).or_default().push(id);

        tracing::debug!(cable = %id, %source, %destination, "graph_connect");
        Ok(id)
    }

    /// Disconnect a cable
    pub fn delete_cable(&mut self, id: CableId) -> Result<(), GraphError> {
        if !self.cables.contains_key(id) {
            return Err(GraphError::UnknownCable(id));
        }
        self.remove_cable(id);
        Ok(())
    }

    /// Designate the output port whose Sample value is streamed.
    ///
    /// Replaces any earlier choice.
    pub fn set_output(&mut self, id: ComponentId, port: &str) -> Result<(), GraphError> {
        let address = self.resolve_port(id, port, Direction::Output)?;
        tracing::debug!(output = %address, "graph_output");
        self.output = Some(address);
        Ok(())
    }

    pub fn clear_output(&mut self) {
        self.output = None;
    }

    pub fn output(&self) -> Option<PortAddress> {
        self.output
    }

    /// Run one propagate-then-step pass.
    ///
    /// A failing unit aborts the pass; units that already stepped keep their
    /// new outputs.
    pub fn iterate(&mut self) -> Result<(), GraphError> {
        for cable in self.cables.values() {
            let carried = self
                .components
                .get(cable.source.component)
                .and_then(|slot| slot.outputs.get(cable.source.connector))
                .filter(|value| value.kind() != ValueKind::String)
                .cloned();
            let Some(value) = carried else {
                continue;
            };
            if let Some(dest) = self
                .components
                .get_mut(cable.destination.component)
                .and_then(|slot| slot.inputs.get_mut(cable.destination.connector))
            {
                value.copy_into(dest);
            }
        }

        let ctx = ExecutionContext {
            sampling_frequency: self.sampling_frequency,
        };
        for (id, slot) in self.components.iter_mut() {
            let ComponentSlot {
                component,
                inputs,
                outputs,
                ..
            } = slot;
            if let Err(source) = component.step(&ctx, inputs.as_slice(), outputs.as_mut_slice()) {
                tracing::warn!(component = %id, error = %source, "iteration aborted");
                return Err(GraphError::Execution {
                    component: id,
                    source,
                });
            }
        }

        Ok(())
    }

    /// Frame currently held by the output port; silence when none is designated
    /// or the port does not hold a Sample
    pub fn current_frame(&self) -> Sample {
        self.output
            .and_then(|address| self.output_value(address))
            .and_then(Value::as_sample)
            .unwrap_or(Sample::SILENCE)
    }

    /// Fill `buf` with little-endian stereo frames, one iteration per frame.
    ///
    /// At most `max_frames_per_read` frames are produced; the number of bytes
    /// written is returned.
    pub fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize, GraphError> {
        if buf.len() % FRAME_BYTES != 0 {
            return Err(GraphError::MisalignedBuffer { len: buf.len() });
        }

        let frames = (buf.len() / FRAME_BYTES).min(self.max_frames_per_read);
        for chunk in buf.chunks_exact_mut(FRAME_BYTES).take(frames) {
            self.iterate()?;
            chunk.copy_from_slice(&self.current_frame().to_le_bytes());
        }

        tracing::trace!(frames, "pcm_read");
        Ok(frames * FRAME_BYTES)
    }

    /// Reset every unit and return every port to its initial value
    pub fn reset(&mut self) {
        for (_, slot) in self.components.iter_mut() {
            slot.component.reset();
            let description = slot.component.description();
            slot.inputs = description.initial_values(Direction::Input);
            slot.outputs = description.initial_values(Direction::Output);
        }
    }

    /// Get number of units
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Get number of cables
    pub fn cable_count(&self) -> usize {
        self.cables.len()
    }

    pub fn contains_component(&self, id: ComponentId) -> bool {
        self.components.contains_key(id)
    }

    /// Live unit identifiers in execution order
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.keys()
    }

    pub fn description(&self, id: ComponentId) -> Option<&ComponentDescription> {
        self.components.get(id).map(|slot| slot.component.description())
    }

    pub fn type_name(&self, id: ComponentId) -> Option<&'static str> {
        self.components.get(id).map(|slot| slot.component.type_name())
    }

    pub fn cable(&self, id: CableId) -> Option<Cable> {
        self.cables.get(id).copied()
    }

    pub fn cables(&self) -> impl Iterator<Item = (CableId, Cable)> + '_ {
        self.cables.iter().map(|(id, cable)| (id, *cable))
    }

    /// The cable feeding an input, if any
    pub fn input_cable(&self, input: PortAddress) -> Option<CableId> {
        self.destination_index.get(&input).copied()
    }

    /// Every cable leaving an output
    pub fn output_cables(&self, output: PortAddress) -> &[CableId] {
        self.source_index
            .get(&output)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn input_value(&self, input: PortAddress) -> Option<&Value> {
        self.port_value(input, Direction::Input)
    }

    pub fn output_value(&self, output: PortAddress) -> Option<&Value> {
        self.port_value(output, Direction::Output)
    }

    fn port_value(&self, address: PortAddress, direction: Direction) -> Option<&Value> {
        self.components
            .get(address.component)
            .and_then(|slot| slot.values(direction).get(address.connector))
    }

    fn check_address(&self, address: PortAddress, direction: Direction) -> Result<(), GraphError> {
        let slot = self
            .components
            .get(address.component)
            .ok_or(GraphError::UnknownComponent(address.component))?;
        if address.connector >= slot.values(direction).len() {
            return Err(GraphError::UnknownPort {
                component: address.component,
                direction,
                name: address.connector.to_string(),
            });
        }
        Ok(())
    }

    fn remove_cable(&mut self, id: CableId) {
        let Some(cable) = self.cables.remove(id) else {
            return;
        };
        self.destination_index.remove(&cable.destination);
        if let Some(cables) = self.source_index.get_mut(&cable.source) {
            cables.retain(|&c| c != id);
            if cables.is_empty() {
                self.source_index.remove(&cable.source);
            }
        }
        tracing::debug!(cable = %id, "graph_disconnect");
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::with_config(&EngineConfig::default())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("components", &self.components.len())
            .field("cables", &self.cables.len())
            .field("sampling_frequency", &self.sampling_frequency)
            .field("output", &self.output)
            .finish()
    }
}

/// Pull-based PCM producer for audio players
impl io::Read for Graph {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_frames(buf).map_err(into_io_error)
    }
}

pub(crate) fn into_io_error(err: GraphError) -> io::Error {
    let kind = match err {
        GraphError::MisalignedBuffer { .. } => io::ErrorKind::InvalidInput,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err)
}

fn port_names(description: &ComponentDescription, direction: Direction) -> HashMap<String, usize> {
    let mut names = HashMap::new();
    for (index, port) in description.ports(direction).iter().enumerate() {
        if names.insert(port.name.clone(), index).is_some() {
            tracing::warn!(port = %port.name, %direction, "duplicate port name, last one wins");
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortDescriptor;
    use std::io::Read;

    // Float passthrough
    struct Passthrough {
        spec: ComponentDescription,
    }

    impl Passthrough {
        fn new() -> Self {
            Self {
                spec: ComponentDescription::new()
                    .with_input(PortDescriptor::new("in", ValueKind::Float))
                    .with_output(PortDescriptor::new("out", ValueKind::Float)),
            }
        }
    }

    impl Component for Passthrough {
        fn description(&self) -> &ComponentDescription {
            &self.spec
        }

        fn step(
            &mut self,
            _: &ExecutionContext,
            inputs: &[Value],
            outputs: &mut [Value],
        ) -> Result<(), ComponentError> {
            inputs[0].copy_into(&mut outputs[0]);
            Ok(())
        }
    }

    // Emits how many times it has stepped; output 0 then 1, 2, ...
    struct Counter {
        count: i64,
        spec: ComponentDescription,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                count: 0,
                spec: ComponentDescription::new()
                    .with_output(PortDescriptor::new("count", ValueKind::Integer)),
            }
        }
    }

    impl Component for Counter {
        fn description(&self) -> &ComponentDescription {
            &self.spec
        }

        fn step(
            &mut self,
            _: &ExecutionContext,
            _: &[Value],
            outputs: &mut [Value],
        ) -> Result<(), ComponentError> {
            outputs[0] = Value::Integer(self.count);
            self.count += 1;
            Ok(())
        }

        fn reset(&mut self) {
            self.count = 0;
        }
    }

    // Adds one to its integer input
    struct Increment {
        spec: ComponentDescription,
    }

    impl Increment {
        fn new() -> Self {
            Self {
                spec: ComponentDescription::new()
                    .with_input(PortDescriptor::new("in", ValueKind::Integer))
                    .with_output(PortDescriptor::new("out", ValueKind::Integer)),
            }
        }
    }

    impl Component for Increment {
        fn description(&self) -> &ComponentDescription {
            &self.spec
        }

        fn step(
            &mut self,
            _: &ExecutionContext,
            inputs: &[Value],
            outputs: &mut [Value],
        ) -> Result<(), ComponentError> {
            let v = inputs[0].as_integer().unwrap_or(0);
            outputs[0] = Value::Integer(v + 1);
            Ok(())
        }
    }

    struct Failing {
        spec: ComponentDescription,
    }

    impl Component for Failing {
        fn description(&self) -> &ComponentDescription {
            &self.spec
        }

        fn step(
            &mut self,
            _: &ExecutionContext,
            _: &[Value],
            _: &mut [Value],
        ) -> Result<(), ComponentError> {
            Err(ComponentError::Failed("boom".into()))
        }
    }

    // Constant stereo frame on its "sample" output
    struct Tone {
        frame: Sample,
        spec: ComponentDescription,
    }

    impl Tone {
        fn new(left: i16, right: i16) -> Self {
            Self {
                frame: Sample::new(left, right),
                spec: ComponentDescription::new()
                    .with_output(PortDescriptor::new("sample", ValueKind::Sample)),
            }
        }
    }

    impl Component for Tone {
        fn description(&self) -> &ComponentDescription {
            &self.spec
        }

        fn step(
            &mut self,
            _: &ExecutionContext,
            _: &[Value],
            outputs: &mut [Value],
        ) -> Result<(), ComponentError> {
            outputs[0] = Value::Sample(self.frame);
            Ok(())
        }
    }

    #[test]
    fn test_add_and_resolve() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        assert_eq!(graph.component_count(), 1);
        assert!(graph.contains_component(a));

        let input = graph.resolve_port(a, "in", Direction::Input).unwrap();
        assert_eq!(input, PortAddress::new(a, 0));
        let output = graph.resolve_port(a, "out", Direction::Output).unwrap();
        assert_eq!(output, PortAddress::new(a, 0));
        assert_eq!(graph.input_value(input), Some(&Value::Float(0.0)));
    }

    #[test]
    fn test_resolve_unknown_port() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());

        // Directions do not share names
        let err = graph.resolve_port(a, "in", Direction::Output).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownPort {
                component: a,
                direction: Direction::Output,
                name: "in".into(),
            }
        );
    }

    #[test]
    fn test_connect_and_indices() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());
        let c = graph.add(Passthrough::new());

        let ab = graph.add_cable(a, "out", b, "in").unwrap();
        let ac = graph.add_cable(a, "out", c, "in").unwrap();
        assert_eq!(graph.cable_count(), 2);

        let a_out = PortAddress::new(a, 0);
        assert_eq!(graph.output_cables(a_out), &[ab, ac]);
        assert_eq!(graph.input_cable(PortAddress::new(b, 0)), Some(ab));
        assert_eq!(
            graph.cable(ac),
            Some(Cable {
                source: a_out,
                destination: PortAddress::new(c, 0),
            })
        );
    }

    #[test]
    fn test_input_already_connected_is_a_no_op() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());
        let c = graph.add(Passthrough::new());

        let first = graph.add_cable(a, "out", c, "in").unwrap();
        let err = graph.add_cable(b, "out", c, "in").unwrap_err();
        assert_eq!(
            err,
            GraphError::InputAlreadyConnected(PortAddress::new(c, 0))
        );

        assert_eq!(graph.cable_count(), 1);
        assert_eq!(graph.input_cable(PortAddress::new(c, 0)), Some(first));
        assert!(graph.output_cables(PortAddress::new(b, 0)).is_empty());
    }

    #[test]
    fn test_add_cable_propagates_resolution_errors() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());

        assert!(matches!(
            graph.add_cable(a, "nope", b, "in"),
            Err(GraphError::UnknownPort { .. })
        ));
        graph.delete_component(b).unwrap();
        assert_eq!(
            graph.add_cable(a, "out", b, "in"),
            Err(GraphError::UnknownComponent(b))
        );
        assert_eq!(graph.cable_count(), 0);
    }

    #[test]
    fn test_delete_cable() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());

        let cable = graph.add_cable(a, "out", b, "in").unwrap();
        graph.delete_cable(cable).unwrap();
        assert_eq!(graph.cable_count(), 0);
        assert_eq!(graph.input_cable(PortAddress::new(b, 0)), None);
        assert!(graph.output_cables(PortAddress::new(a, 0)).is_empty());

        assert_eq!(
            graph.delete_cable(cable),
            Err(GraphError::UnknownCable(cable))
        );

        // Input is free again
        assert!(graph.add_cable(a, "out", b, "in").is_ok());
    }

    #[test]
    fn test_cascade_delete() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());
        let c = graph.add(Passthrough::new());
        let d = graph.add(Passthrough::new());

        graph.add_cable(a, "out", b, "in").unwrap();
        graph.add_cable(b, "out", c, "in").unwrap();
        graph.add_cable(b, "out", d, "in").unwrap();
        let untouched = graph.add_cable(c, "out", a, "in").unwrap();

        graph.delete_component(b).unwrap();
        assert_eq!(graph.component_count(), 3);
        assert_eq!(graph.cable_count(), 1);
        assert!(graph.cable(untouched).is_some());
        assert_eq!(graph.input_cable(PortAddress::new(c, 0)), None);
        assert_eq!(graph.input_cable(PortAddress::new(d, 0)), None);

        assert_eq!(
            graph.resolve_port(b, "in", Direction::Input),
            Err(GraphError::UnknownComponent(b))
        );
        assert_eq!(
            graph.delete_component(b),
            Err(GraphError::UnknownComponent(b))
        );
    }

    #[test]
    fn test_cascade_delete_self_loop() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Increment::new());
        graph.add_cable(a, "out", a, "in").unwrap();

        graph.delete_component(a).unwrap();
        assert_eq!(graph.cable_count(), 0);
        assert_eq!(graph.component_count(), 0);
    }

    #[test]
    fn test_slot_recycling_rejects_stale_ids() {
        let mut graph = Graph::new(48_000);
        let _a = graph.add(Passthrough::new());
        let x = graph.add(Passthrough::new());
        graph.delete_component(x).unwrap();

        let y = graph.add(Counter::new());
        assert_eq!(y.slot(), x.slot());
        assert_ne!(y.generation(), x.generation());
        assert_ne!(y, x);

        assert_eq!(
            graph.resolve_port(y, "count", Direction::Output),
            Ok(PortAddress::new(y, 0))
        );
        assert_eq!(
            graph.resolve_port(x, "out", Direction::Output),
            Err(GraphError::UnknownComponent(x))
        );
    }

    #[test]
    fn test_unit_delay_per_cable() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Counter::new());
        let b = graph.add(Increment::new());
        graph.add_cable(a, "count", b, "in").unwrap();

        let a_out = PortAddress::new(a, 0);
        let b_in = PortAddress::new(b, 0);

        graph.iterate().unwrap();
        // Iteration 0: b saw the zero-initialized port
        assert_eq!(graph.input_value(b_in), Some(&Value::Integer(0)));
        assert_eq!(graph.output_value(a_out), Some(&Value::Integer(0)));

        for n in 1..10 {
            graph.iterate().unwrap();
            assert_eq!(graph.input_value(b_in), Some(&Value::Integer(n - 1)));
            assert_eq!(graph.output_value(a_out), Some(&Value::Integer(n)));
        }
    }

    #[test]
    fn test_unit_delay_independent_of_insertion_order() {
        // Downstream unit added first, so it steps before its source
        let mut graph = Graph::new(48_000);
        let b = graph.add(Increment::new());
        let a = graph.add(Counter::new());
        graph.add_cable(a, "count", b, "in").unwrap();

        for _ in 0..5 {
            graph.iterate().unwrap();
        }
        // a emitted 0..=4; b received 3 during the last propagate
        assert_eq!(
            graph.input_value(PortAddress::new(b, 0)),
            Some(&Value::Integer(3))
        );
    }

    #[test]
    fn test_feedback_loop() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Increment::new());
        graph.add_cable(a, "out", a, "in").unwrap();

        for _ in 0..4 {
            graph.iterate().unwrap();
        }
        assert_eq!(
            graph.output_value(PortAddress::new(a, 0)),
            Some(&Value::Integer(4))
        );
    }

    #[test]
    fn test_step_failure_aborts_iteration() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Counter::new());
        let f = graph.add(Failing {
            spec: ComponentDescription::new(),
        });
        let c = graph.add(Counter::new());

        let err = graph.iterate().unwrap_err();
        assert!(matches!(err, GraphError::Execution { component, .. } if component == f));
        assert!(std::error::Error::source(&err).is_some());

        // a stepped before the failure, c never did
        assert_eq!(
            graph.output_value(PortAddress::new(a, 0)),
            Some(&Value::Integer(0))
        );
        assert_eq!(
            graph.output_value(PortAddress::new(c, 0)),
            Some(&Value::Integer(0))
        );
        graph.iterate().unwrap_err();
        assert_eq!(
            graph.output_value(PortAddress::new(a, 0)),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_step_failure_reaches_the_reader() {
        let mut graph = Graph::new(48_000);
        let f = graph.add(Failing {
            spec: ComponentDescription::new(),
        });

        let mut buf = [0u8; 16];
        let err = graph.read_frames(&mut buf).unwrap_err();
        assert!(matches!(err, GraphError::Execution { component, .. } if component == f));

        let err = graph.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        let inner = err.get_ref().and_then(|e| e.downcast_ref::<GraphError>());
        assert!(matches!(inner, Some(GraphError::Execution { .. })));
    }

    #[test]
    fn test_read_without_output_is_silence() {
        let mut graph = Graph::new(48_000);
        graph.add(Tone::new(5, 6));
        let mut buf = [0xAAu8; 8];
        assert_eq!(graph.read_frames(&mut buf).unwrap(), 8);
        assert_eq!(buf, [0; 8]);
    }

    #[test]
    fn test_read_streams_output_frames() {
        let mut graph = Graph::new(48_000);
        let tone = graph.add(Tone::new(1, -1));
        graph.set_output(tone, "sample").unwrap();
        assert_eq!(graph.output(), Some(PortAddress::new(tone, 0)));

        let mut buf = [0u8; 8];
        graph.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x00, 0xFF, 0xFF, 0x01, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_read_is_capped() {
        let mut graph = Graph::new(48_000);
        let counter = graph.add(Counter::new());
        let mut buf = vec![0u8; 4 * 1000];
        assert_eq!(graph.read_frames(&mut buf).unwrap(), 4 * 500);
        // One iteration per frame
        assert_eq!(
            graph.output_value(PortAddress::new(counter, 0)),
            Some(&Value::Integer(499))
        );

        graph.set_max_frames_per_read(3);
        assert_eq!(graph.read_frames(&mut buf).unwrap(), 12);
    }

    #[test]
    fn test_read_rejects_partial_frames() {
        let mut graph = Graph::new(48_000);
        let mut buf = [0u8; 6];
        assert_eq!(
            graph.read_frames(&mut buf),
            Err(GraphError::MisalignedBuffer { len: 6 })
        );
        let err = graph.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_set_output_requires_output_port() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        assert!(matches!(
            graph.set_output(a, "in"),
            Err(GraphError::UnknownPort { .. })
        ));
        assert_eq!(graph.output(), None);
    }

    #[test]
    fn test_deleting_output_component_clears_output() {
        let mut graph = Graph::new(48_000);
        let tone = graph.add(Tone::new(9, 9));
        graph.set_output(tone, "sample").unwrap();
        graph.delete_component(tone).unwrap();
        assert_eq!(graph.output(), None);
        assert_eq!(graph.current_frame(), Sample::SILENCE);
    }

    #[test]
    fn test_reset() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Counter::new());
        let b = graph.add(Increment::new());
        graph.add_cable(a, "count", b, "in").unwrap();
        for _ in 0..3 {
            graph.iterate().unwrap();
        }

        graph.reset();
        assert_eq!(
            graph.input_value(PortAddress::new(b, 0)),
            Some(&Value::Integer(0))
        );
        graph.iterate().unwrap();
        assert_eq!(
            graph.output_value(PortAddress::new(a, 0)),
            Some(&Value::Integer(0))
        );
    }

    #[test]
    fn test_freed_slots_are_reused_oldest_first() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());
        let c = graph.add(Passthrough::new());

        graph.delete_component(a).unwrap();
        graph.delete_component(b).unwrap();

        let d = graph.add(Counter::new());
        let e = graph.add(Counter::new());
        assert_eq!(d.slot(), a.slot());
        assert_eq!(e.slot(), b.slot());

        let f = graph.add(Counter::new());
        assert!(f.slot() > c.slot());
    }

    #[test]
    fn test_freed_cable_slots_are_reused_oldest_first() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());
        let c = graph.add(Passthrough::new());
        let ab = graph.add_cable(a, "out", b, "in").unwrap();
        let bc = graph.add_cable(b, "out", c, "in").unwrap();

        graph.delete_cable(ab).unwrap();
        graph.delete_cable(bc).unwrap();

        let ca = graph.add_cable(c, "out", a, "in").unwrap();
        assert_eq!(ca.slot(), ab.slot());
        assert_ne!(ca, ab);
        assert_eq!(graph.delete_cable(ab), Err(GraphError::UnknownCable(ab)));
        assert_eq!(graph.cable(ca).map(|cable| cable.destination.component), Some(a));
    }

    #[test]
    fn test_execution_order_is_ascending_slot() {
        let mut graph = Graph::new(48_000);
        let ids: Vec<_> = (0..4).map(|_| graph.add(Counter::new())).collect();
        let order: Vec<_> = graph.component_ids().collect();
        assert_eq!(order, ids);
        assert!(order.windows(2).all(|w| w[0].slot() < w[1].slot()));
    }

    #[test]
    fn test_connect_validates_raw_addresses() {
        let mut graph = Graph::new(48_000);
        let a = graph.add(Passthrough::new());
        let b = graph.add(Passthrough::new());
        assert!(matches!(
            graph.connect(PortAddress::new(a, 3), PortAddress::new(b, 0)),
            Err(GraphError::UnknownPort { .. })
        ));
        assert!(graph
            .connect(PortAddress::new(a, 0), PortAddress::new(b, 0))
            .is_ok());
    }
}

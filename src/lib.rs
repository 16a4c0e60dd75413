//! # Patchbay: Modular Synthesis Runtime
//!
//! `patchbay` runs modular synthesis patches one sample at a time and streams
//! the result as 16-bit stereo PCM. Patches are built either in code or from a
//! small text format (the patch description language, see [`ddl`]).
//!
//! ## Architecture
//!
//! The library is organized in three layers:
//!
//! - **Units** - the [`Component`] capability, typed ports and the built-in units
//! - **Graph** - arenas of units and cables, unit-delay execution and PCM streaming
//! - **DDL** - lexer, parser and interpreter turning a description into a graph
//!
//! Every cable delays its signal by exactly one sample, so any topology runs,
//! feedback loops included.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use patchbay::prelude::*;
//! use std::io::Read;
//!
//! let mut graph = patchbay::ddl::compile(
//!     "freq = FloatParam(value=440.0)\n\
//!      gain = FloatParam(value=0.8)\n\
//!      osc = SinGenerator()\n\
//!      f2s = FloatToSample()\n\
//!      freq:float -> osc:freq\n\
//!      gain:float -> osc:gain\n\
//!      osc:sinusoid -> f2s:float\n\
//!      @OUTPUT_COMPONENT f2s\n\
//!      @OUTPUT_PORT sample\n",
//! )
//! .unwrap();
//!
//! // 100 stereo frames of little-endian PCM
//! let mut pcm = [0u8; 400];
//! graph.read_exact(&mut pcm).unwrap();
//! ```
//!
//! The same patch built by hand:
//!
//! ```rust,no_run
//! use patchbay::prelude::*;
//!
//! let mut graph = Graph::new(48_000);
//! let freq = graph.add(FloatParam::new(440.0));
//! let osc = graph.add(SinGenerator::new());
//! let f2s = graph.add(FloatToSample::new());
//! graph.add_cable(freq, "float", osc, "freq").unwrap();
//! graph.add_cable(osc, "sinusoid", f2s, "float").unwrap();
//! graph.set_output(f2s, "sample").unwrap();
//!
//! graph.iterate().unwrap();
//! let frame = graph.current_frame();
//! ```

mod arena;
pub mod component;
pub mod components;
pub mod config;
pub mod ddl;
pub mod graph;
pub mod port;
pub mod registry;
pub mod shared;
pub mod value;

/// Prelude module for convenient imports
pub mod prelude {
    // Units
    pub use crate::component::{Arguments, Component, ComponentError, ExecutionContext};
    pub use crate::components::{FloatParam, FloatToSample, SinGenerator};
    pub use crate::port::{ComponentDescription, Direction, PortDescriptor};
    pub use crate::value::{Sample, Value, ValueKind};

    // Graph
    pub use crate::graph::{Cable, CableId, ComponentId, Graph, GraphError, PortAddress, SlotId};
    pub use crate::shared::SharedGraph;

    // Construction
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::ddl::DdlError;
    pub use crate::registry::{ComponentRegistry, RegistryError};
}

// Re-export key types at crate root for convenience
pub use prelude::*;

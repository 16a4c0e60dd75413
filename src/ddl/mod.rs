//! Patch Description Language
//!
//! A line-oriented text format that declares units, wires them together and
//! picks the streamed output:
//!
//! ```text
//! @SAMPLING_FREQ 48000
//! freq = FloatParam(value=650.0)
//! gain = FloatParam(value=1.0)
//! offset = FloatParam(value=0.0)
//! osc = SinGenerator()
//! f2s = FloatToSample()
//! freq:float -> osc:freq
//! gain:float -> osc:gain
//! offset:float -> osc:offset
//! osc:sinusoid -> f2s:float
//! @OUTPUT_COMPONENT "f2s"
//! @OUTPUT_PORT "sample"
//! ```
//!
//! Compilation runs [`lexer`] → [`parser`] → [`interpreter`] lazily, one
//! statement at a time, and stops at the first error.

pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use interpreter::{InterpretError, Interpreter};
pub use lexer::{LexError, Lexer, Position, Token, TokenKind};
pub use parser::{Connector, ParseError, Parser, Statement};

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::registry::ComponentRegistry;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// First failure met while building a graph from a description
#[derive(Debug, Error)]
pub enum DdlError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lexical error: {0}")]
    Lex(#[source] LexError),

    #[error("syntax error: {0}")]
    Parse(#[source] ParseError),

    #[error("semantic error: {0}")]
    Semantic(#[from] InterpretError),
}

impl DdlError {
    /// Line of the failing source text, when the failure has one
    pub fn line(&self) -> Option<usize> {
        match self {
            DdlError::Io { .. } => None,
            DdlError::Lex(err) => Some(err.position().line),
            DdlError::Parse(err) => Some(err.position().line),
            DdlError::Semantic(err) => Some(err.line()),
        }
    }

    /// Line and column of the failure; `None` for I/O errors
    pub fn position(&self) -> Option<Position> {
        match self {
            DdlError::Io { .. } => None,
            DdlError::Lex(err) => Some(err.position()),
            DdlError::Parse(err) => Some(err.position()),
            DdlError::Semantic(err) => Some(err.position()),
        }
    }
}

impl From<LexError> for DdlError {
    fn from(err: LexError) -> Self {
        DdlError::Lex(err)
    }
}

impl From<ParseError> for DdlError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Lex(err) => DdlError::Lex(err),
            err => DdlError::Parse(err),
        }
    }
}

/// Lazily parse a description into statements
pub fn parse(source: &str) -> Parser<Lexer<'_>> {
    Parser::from_source(source)
}

/// Build a graph from description text with the built-in units and default
/// engine settings
pub fn compile(source: &str) -> Result<Graph, DdlError> {
    compile_with(source, &ComponentRegistry::new(), &EngineConfig::default())
}

/// Build a graph from description text
pub fn compile_with(
    source: &str,
    registry: &ComponentRegistry,
    config: &EngineConfig,
) -> Result<Graph, DdlError> {
    let mut interpreter = Interpreter::new(registry, Graph::with_config(config));
    interpreter.run(parse(source).map(|statement| statement.map_err(DdlError::from)))?;
    Ok(interpreter.into_graph())
}

/// Build a graph from a description file
pub fn load(path: impl AsRef<Path>) -> Result<Graph, DdlError> {
    load_with(path, &ComponentRegistry::new(), &EngineConfig::default())
}

pub fn load_with(
    path: impl AsRef<Path>,
    registry: &ComponentRegistry,
    config: &EngineConfig,
) -> Result<Graph, DdlError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| DdlError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let graph = compile_with(&source, registry, config)?;
    tracing::info!(
        path = %path.display(),
        components = graph.component_count(),
        cables = graph.cable_count(),
        sampling_frequency = graph.sampling_frequency(),
        "ddl_loaded"
    );
    Ok(graph)
}

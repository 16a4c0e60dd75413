//! Typed Port Values
//!
//! Every port carries exactly one [`Value`]. Integer, Float, Sample and Bool
//! travel over cables at run time; String only appears while compiling a patch
//! description (identifiers, port names, paths).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest amplitude a normalized signal maps to in a [`Sample`]
pub const FULL_SCALE: f64 = 32767.0;

/// One stereo PCM frame of signed 16-bit amplitudes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub left: i16,
    pub right: i16,
}

impl Sample {
    pub const SILENCE: Sample = Sample { left: 0, right: 0 };

    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Same amplitude on both channels
    pub fn mono(amplitude: i16) -> Self {
        Self::new(amplitude, amplitude)
    }

    /// Little-endian frame encoding: left then right, two bytes each
    pub fn to_le_bytes(self) -> [u8; 4] {
        let [l0, l1] = self.left.to_le_bytes();
        let [r0, r1] = self.right.to_le_bytes();
        [l0, l1, r0, r1]
    }
}

/// Discriminant of a [`Value`], used to declare what a port expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Float,
    Sample,
    Bool,
    String,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Sample => "sample",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A single typed payload held by a port or produced by a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Sample(Sample),
    Bool(bool),
    String(String),
}

impl Value {
    /// The zero value of a kind; ports start out holding this
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Sample => Value::Sample(Sample::SILENCE),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::String => Value::String(String::new()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Sample(_) => ValueKind::Sample,
            Value::Bool(_) => ValueKind::Bool,
            Value::String(_) => ValueKind::String,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sample(&self) -> Option<Sample> {
        match self {
            Value::Sample(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Copy this value into a port slot along a cable.
    ///
    /// Strings never cross cables, so a String source leaves `dest` untouched.
    /// Every other variant replaces `dest` without allocating.
    pub fn copy_into(&self, dest: &mut Value) {
        match self {
            Value::Integer(v) => *dest = Value::Integer(*v),
            Value::Float(v) => *dest = Value::Float(*v),
            Value::Sample(v) => *dest = Value::Sample(*v),
            Value::Bool(v) => *dest = Value::Bool(*v),
            Value::String(_) => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Sample(s) => write!(f, "({}, {})", s.left, s.right),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Sample> for Value {
    fn from(v: Sample) -> Self {
        Value::Sample(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

//! # Core Type Definitions
//!
//! This module contains the small shared vocabulary of the Tempora model:
//! - Graph-level enums (`EdgeType`, `GraphMode`, `TimeFormat`)
//! - Attribute enums (`AttributeClass`, `AttributeType`, `AggregationPolicy`)
//! - Error types (`TemporaError`)
//!
//! Every enum parses case-insensitively from its GEXF spelling and renders
//! back through `as_str`, so documents written by other tools are accepted
//! while our own output stays canonical.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// GRAPH-LEVEL ENUMS
// =============================================================================

/// Default edge direction declared on the `<graph>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeType {
    #[default]
    Directed,
    Undirected,
    Mutual,
}

impl EdgeType {
    /// GEXF spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directed => "directed",
            Self::Undirected => "undirected",
            Self::Mutual => "mutual",
        }
    }
}

impl FromStr for EdgeType {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "directed" => Ok(Self::Directed),
            "undirected" => Ok(Self::Undirected),
            "mutual" => Ok(Self::Mutual),
            _ => Err(TemporaError::unknown("edge type", s)),
        }
    }
}

/// Whether entities and attribute values carry validity intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GraphMode {
    #[default]
    Static,
    Dynamic,
}

impl GraphMode {
    /// GEXF spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }

    /// True for [`GraphMode::Dynamic`].
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

impl FromStr for GraphMode {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(TemporaError::unknown("graph mode", s)),
        }
    }
}

/// The numeric domain interval bounds live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeDomain {
    /// Calendar timestamps with an offset.
    Calendar,
    /// Plain real numbers.
    #[default]
    Real,
}

/// The `timeformat` declared on a dynamic graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    Integer,
    #[default]
    Double,
    Date,
    DateTime,
}

impl TimeFormat {
    /// GEXF spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }

    /// Domain the bounds of this format are compared in.
    #[must_use]
    pub const fn domain(self) -> TimeDomain {
        match self {
            Self::Integer | Self::Double => TimeDomain::Real,
            Self::Date | Self::DateTime => TimeDomain::Calendar,
        }
    }
}

impl FromStr for TimeFormat {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "long" => Ok(Self::Integer),
            "double" | "float" => Ok(Self::Double),
            "date" => Ok(Self::Date),
            "datetime" | "timestamp" => Ok(Self::DateTime),
            _ => Err(TemporaError::unknown("time format", s)),
        }
    }
}

// =============================================================================
// ATTRIBUTE ENUMS
// =============================================================================

/// Which entity kind an attribute schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeClass {
    Node,
    Edge,
}

impl AttributeClass {
    /// GEXF spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
        }
    }
}

impl FromStr for AttributeClass {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(Self::Node),
            "edge" => Ok(Self::Edge),
            _ => Err(TemporaError::unknown("attribute class", s)),
        }
    }
}

impl fmt::Display for AttributeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeType {
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    #[default]
    String,
}

impl AttributeType {
    /// GEXF spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    /// True for the types ADD and TOTAL sum instead of concatenating.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Float | Self::Double)
    }

    /// True for the types whose sums stay integral.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Integer | Self::Long)
    }
}

impl FromStr for AttributeType {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "long" => Ok(Self::Long),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "boolean" | "bool" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            _ => Err(TemporaError::unknown("attribute type", s)),
        }
    }
}

/// How a new value combines with the values already stored for the same
/// attribute on the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AggregationPolicy {
    /// Reject a value whose start equals a stored value's start.
    #[default]
    Standard,
    /// Sum (or concatenate) into the first overlapping value.
    Add,
    /// Deduplicate equal overlapping values, fill in sentinels.
    Merge,
    /// Sum (or concatenate) everything into one running total.
    Total,
}

impl AggregationPolicy {
    /// Spelling used by the `datamode` attribute and the parameter format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Add => "add",
            Self::Merge => "merge",
            Self::Total => "total",
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "" => Ok(Self::Standard),
            "add" => Ok(Self::Add),
            "merge" => Ok(Self::Merge),
            "total" => Ok(Self::Total),
            _ => Err(TemporaError::unknown("aggregation policy", s)),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Tempora system.
///
/// - Parse errors on single values are logged and skipped by the model;
///   they only surface as `Err` from the explicit parsing entry points
/// - Resource errors (`IoError`) abort the current read or write
/// - The CORE should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum TemporaError {
    /// A time bound could not be parsed in the graph's time format.
    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    /// A numeric value could not be parsed.
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    /// Two time points from different domains were compared.
    #[error("Cannot compare calendar and real time points")]
    DomainMismatch,

    /// An interval's start lies after its end.
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// A record handed to the Ingestor failed validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A line of the parameter micro-format is malformed.
    #[error("Invalid parameters at line {line}: {reason}")]
    InvalidParameters { line: usize, reason: String },

    /// An enum spelling was not recognized.
    #[error("Unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    /// The XML token stream was malformed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl TemporaError {
    fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # tempora-core
//!
//! A temporal graph model with a streaming GEXF codec.
//!
//! Nodes, edges and attribute values each carry validity intervals. Facts
//! that arrive more than once, or that overlap in time, are merged by
//! deterministic per-attribute policies, and the merge behaves the same
//! whether the facts come from direct upserts or from decoding a document.
//!
//! ## Layout
//!
//! - `time`: intervals and the overlap/union algebra
//! - `schema`: attribute definitions and graph parameters
//! - `attributes` / `spells`: per-entity stores that apply the merge rules
//! - `entity` / `graph`: the model and the upsert protocol
//! - `ingestor`: validated upserts for ETL code
//! - `formats`: GEXF writer and reader, JSON projection, binary snapshots
//!
//! ## Constraints
//!
//! - Single-threaded and synchronous; a `Graph` is owned by whoever mutates it
//! - No process-wide state: formatting and limits are passed per call
//! - Logging goes through `tracing`; the library never installs a subscriber
//! - No panics: every failure is a `TemporaError` or a logged skip

// =============================================================================
// MODULES
// =============================================================================

pub mod attributes;
pub mod entity;
pub mod formats;
pub mod graph;
pub mod ingestor;
pub mod primitives;
pub mod schema;
pub mod spells;
pub mod time;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    AggregationPolicy, AttributeClass, AttributeType, EdgeType, GraphMode, TemporaError,
    TimeDomain, TimeFormat,
};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use attributes::{AttributeValue, AttributeValues, MergeOutcome};
pub use entity::{Color, Edge, Element, Entity, GraphElement, Node, NodeViz, Position};
pub use graph::{Graph, IntervalViolation, SerializableGraph, UpsertOutcome};
pub use ingestor::Ingestor;
pub use schema::{AttributeDef, AttributeSchema, GraphParameters};
pub use spells::SpellStore;
pub use time::{Interval, TimePoint, TimeStyle};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{
    GexfReader, GexfWriter, JsonWriter, ReadOptions, ReadReport, SnapshotHeader, WriterOptions,
    graph_from_bytes, graph_to_bytes, read_gexf_file, write_gexf_file, write_json_file,
};

//! # Formats Module
//!
//! Everything that turns a [`Graph`] into bytes or back:
//! - `gexf_writer` / `gexf_reader`: streaming GEXF 1.3 codec
//! - `json`: the simplified JSON projection (write only)
//! - `persistence`: binary snapshots
//!
//! Formatting state is passed in through [`WriterOptions`] and
//! [`ReadOptions`]; nothing here is process-wide.
//!
//! The file helpers open their handle right before use, wrap it in a
//! buffer, flush explicitly and drop it on every path.

mod gexf_reader;
mod gexf_writer;
mod json;
mod persistence;

pub use gexf_reader::{GexfReader, ReadReport};
pub use gexf_writer::GexfWriter;
pub use json::JsonWriter;
pub use persistence::{
    MAX_SNAPSHOT_SIZE, SnapshotHeader, graph_from_bytes, graph_to_bytes,
};

use crate::TemporaError;
use crate::graph::Graph;
use crate::primitives::DEFAULT_CREATOR;
use crate::time::TimeStyle;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// =============================================================================
// OPTIONS
// =============================================================================

/// Output settings shared by the GEXF and JSON writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Content of `<meta><creator>`.
    pub creator: String,
    /// Optional `<meta><description>`.
    pub description: Option<String>,
    /// Calendar point rendering.
    pub time_style: TimeStyle,
    /// Spaces per nesting level in GEXF output; 0 writes one line.
    pub indent: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            creator: DEFAULT_CREATOR.to_string(),
            description: None,
            time_style: TimeStyle::default(),
            indent: 2,
        }
    }
}

/// Decode limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Stop once this many nodes have been read.
    pub max_nodes: usize,
    /// Stop once this many edges have been read.
    pub max_edges: usize,
    /// Stop at `<nodes>`: metadata and schemas only.
    pub schema_only: bool,
    /// Read nodes, edges, weights and intervals only; schemas, attribute
    /// values and spells are skipped.
    pub structure_only: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_nodes: usize::MAX,
            max_edges: usize::MAX,
            schema_only: false,
            structure_only: false,
        }
    }
}

impl ReadOptions {
    /// Options for reading only the parameters document.
    #[must_use]
    pub fn schema_only() -> Self {
        Self {
            schema_only: true,
            ..Self::default()
        }
    }

    /// Options for reading the graph's structure without its attributes.
    #[must_use]
    pub fn structure_only() -> Self {
        Self {
            structure_only: true,
            ..Self::default()
        }
    }
}

// =============================================================================
// FILE HELPERS
// =============================================================================

fn io_error(action: &str, path: &Path, e: impl std::fmt::Display) -> TemporaError {
    TemporaError::IoError(format!("Cannot {} '{}': {}", action, path.display(), e))
}

/// Decode a GEXF file.
///
/// Only failing to open the file is an `Err`; decode failures are reported
/// in the returned [`ReadReport`] alongside the partial graph.
pub fn read_gexf_file(path: &Path, options: ReadOptions) -> Result<ReadReport, TemporaError> {
    let file = File::open(path).map_err(|e| io_error("open", path, e))?;
    let report = GexfReader::new(BufReader::new(file), options).read();
    tracing::info!(
        path = %path.display(),
        nodes = report.nodes_read,
        edges = report.edges_read,
        truncated = report.truncated,
        "read GEXF document"
    );
    Ok(report)
}

/// Encode a graph as a GEXF file, replacing any existing file.
pub fn write_gexf_file(graph: &Graph, path: &Path, options: &WriterOptions) -> Result<(), TemporaError> {
    let file = File::create(path).map_err(|e| io_error("create", path, e))?;
    GexfWriter::new(BufWriter::new(file), options.clone()).write_graph(graph)?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "wrote GEXF document"
    );
    Ok(())
}

/// Write the JSON projection of a graph to a file.
pub fn write_json_file(graph: &Graph, path: &Path, options: &WriterOptions) -> Result<(), TemporaError> {
    let file = File::create(path).map_err(|e| io_error("create", path, e))?;
    JsonWriter::new(BufWriter::new(file), options.time_style).write_graph(graph)?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "wrote JSON projection"
    );
    Ok(())
}

//! # JSON Projection
//!
//! A flattened, write-only view of a graph for web front-ends:
//!
//! ```text
//! {"edges":[{"id","source","target","attributes":{"Weight":"..."}}],
//!  "nodes":[{"id","label","size","start","end","attributes":{title:value}}]}
//! ```
//!
//! Spells and schemas are omitted. Attribute keys are schema titles and a
//! later value of an attribute replaces an earlier one. Every string has
//! its line breaks removed and backslash runs collapsed to one backslash.
//! Entities are streamed one at a time through `serde_json`.

use crate::TemporaError;
use crate::entity::{Edge, GraphElement, Node};
use crate::graph::Graph;
use crate::primitives::{DEFAULT_NODE_SIZE, JSON_WEIGHT_KEY};
use crate::time::{TimeStyle, format_real};
use crate::types::AttributeClass;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;

#[derive(Serialize)]
struct JsonEdge {
    id: String,
    source: String,
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Map<String, Value>>,
}

#[derive(Serialize)]
struct JsonNode {
    id: String,
    label: String,
    size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Map<String, Value>>,
}

/// Streaming JSON projection writer.
pub struct JsonWriter<W: Write> {
    inner: W,
    style: TimeStyle,
}

impl<W: Write> JsonWriter<W> {
    #[must_use]
    pub fn new(inner: W, style: TimeStyle) -> Self {
        Self { inner, style }
    }

    /// Write the projection and flush the sink.
    pub fn write_graph(&mut self, graph: &Graph) -> Result<(), TemporaError> {
        self.raw(b"{\"edges\":[")?;
        for (i, edge) in graph.edges().enumerate() {
            if i > 0 {
                self.raw(b",")?;
            }
            let record = self.edge_record(edge);
            self.record(&record)?;
        }

        self.raw(b"],\"nodes\":[")?;
        for (i, node) in graph.nodes().enumerate() {
            if i > 0 {
                self.raw(b",")?;
            }
            let record = self.node_record(graph, node);
            self.record(&record)?;
        }
        self.raw(b"]}")?;

        self.inner
            .flush()
            .map_err(|e| TemporaError::IoError(format!("Cannot flush JSON output: {}", e)))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn edge_record(&self, edge: &Edge) -> JsonEdge {
        JsonEdge {
            id: clean(edge.id()),
            source: clean(&edge.source),
            target: clean(&edge.target),
            attributes: edge.weight.map(|w| {
                let mut map = Map::new();
                map.insert(JSON_WEIGHT_KEY.to_string(), Value::String(format_real(w)));
                map
            }),
        }
    }

    fn node_record(&self, graph: &Graph, node: &Node) -> JsonNode {
        let schema = graph.schema(AttributeClass::Node);
        let style = self.style.for_format(graph.time_format());
        let mut attributes = Map::new();
        for value in node.attributes().iter() {
            let key = schema
                .get(&value.attribute_id)
                .map_or(value.attribute_id.as_str(), |d| d.title.as_str());
            attributes.insert(clean(key), Value::String(clean(&value.value)));
        }

        JsonNode {
            id: clean(node.id()),
            label: clean(&node.label),
            size: node.viz.size.unwrap_or(DEFAULT_NODE_SIZE),
            start: node.interval().start().map(|p| p.format(&style)),
            end: node.interval().end().map(|p| p.format(&style)),
            attributes: (!attributes.is_empty()).then_some(attributes),
        }
    }

    fn record<T: Serialize>(&mut self, record: &T) -> Result<(), TemporaError> {
        serde_json::to_writer(&mut self.inner, record)
            .map_err(|e| TemporaError::SerializationError(format!("JSON projection: {}", e)))
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), TemporaError> {
        self.inner
            .write_all(bytes)
            .map_err(|e| TemporaError::IoError(format!("Cannot write JSON: {}", e)))
    }
}

/// Drop line breaks and collapse every run of backslashes to one.
fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_backslash = false;
    for c in text.chars() {
        match c {
            '\n' | '\r' => {}
            '\\' if last_backslash => {}
            _ => out.push(c),
        }
        if c != '\n' && c != '\r' {
            last_backslash = c == '\\';
        }
    }
    out
}

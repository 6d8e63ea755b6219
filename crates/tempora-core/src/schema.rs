//! # Attribute Schemas and Graph Parameters
//!
//! Static definitions that are fixed once a graph is initialized:
//! - [`AttributeDef`]: id, title, scalar type and aggregation policy
//! - [`AttributeSchema`]: the ordered definitions for one entity class
//! - [`GraphParameters`]: graph metadata plus both schemas, parsed from the
//!   line-oriented parameter format
//!
//! ## Parameter format
//!
//! ```text
//! graph,directed,dynamic,datetime
//! node,amount,double,add
//! node,party,string,merge
//! edge,memo,string
//! ```
//!
//! One record per line; the optional fourth field of `node`/`edge` records is
//! the aggregation policy. Blank lines and `#` comments are ignored.

use crate::TemporaError;
use crate::types::{AggregationPolicy, AttributeClass, AttributeType, EdgeType, GraphMode, TimeFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// ATTRIBUTE DEFINITION
// =============================================================================

/// Definition of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub id: String,
    pub title: String,
    pub kind: AttributeType,
    pub policy: AggregationPolicy,
}

impl AttributeDef {
    /// A STANDARD attribute.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            policy: AggregationPolicy::Standard,
        }
    }

    /// Builder-style policy override.
    #[must_use]
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

// =============================================================================
// ATTRIBUTE SCHEMA
// =============================================================================

/// The attribute definitions for one entity class, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    class: AttributeClass,
    mode: GraphMode,
    attributes: Vec<AttributeDef>,
}

impl AttributeSchema {
    /// An empty schema.
    #[must_use]
    pub fn new(class: AttributeClass, mode: GraphMode) -> Self {
        Self {
            class,
            mode,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> AttributeClass {
        self.class
    }

    #[must_use]
    pub const fn mode(&self) -> GraphMode {
        self.mode
    }

    /// Append a definition. A definition whose id is already declared
    /// replaces the earlier one in place.
    pub fn push(&mut self, def: AttributeDef) {
        match self.attributes.iter_mut().find(|d| d.id == def.id) {
            Some(existing) => *existing = def,
            None => self.attributes.push(def),
        }
    }

    /// Look up a definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|d| d.id == id)
    }

    /// Look up a definition by title.
    #[must_use]
    pub fn by_title(&self, title: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|d| d.title == title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

// =============================================================================
// GRAPH PARAMETERS
// =============================================================================

/// Everything a graph is initialized from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphParameters {
    pub default_edge_type: EdgeType,
    pub mode: GraphMode,
    pub time_format: TimeFormat,
    pub node_schema: AttributeSchema,
    pub edge_schema: AttributeSchema,
}

impl Default for GraphParameters {
    fn default() -> Self {
        Self {
            default_edge_type: EdgeType::default(),
            mode: GraphMode::Dynamic,
            time_format: TimeFormat::default(),
            node_schema: AttributeSchema::new(AttributeClass::Node, GraphMode::Dynamic),
            edge_schema: AttributeSchema::new(AttributeClass::Edge, GraphMode::Dynamic),
        }
    }
}

impl GraphParameters {
    /// Parse the line-oriented parameter format.
    pub fn parse(text: &str) -> Result<Self, TemporaError> {
        let mut params = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let bad = |reason: String| TemporaError::InvalidParameters {
                line: line_no,
                reason,
            };

            match fields[0] {
                "graph" => {
                    let &[_, edge_type, mode, time_format] = fields.as_slice() else {
                        return Err(bad(format!(
                            "expected graph,<edgetype>,<mode>,<timeformat>, got {} fields",
                            fields.len()
                        )));
                    };
                    params.default_edge_type = edge_type.parse().map_err(|e| bad(format!("{}", e)))?;
                    params.mode = mode.parse().map_err(|e| bad(format!("{}", e)))?;
                    params.time_format = time_format.parse().map_err(|e| bad(format!("{}", e)))?;
                }
                "node" | "edge" => {
                    if !(3..=4).contains(&fields.len()) {
                        return Err(bad(format!(
                            "expected {},<id>,<type>[,<policy>], got {} fields",
                            fields[0],
                            fields.len()
                        )));
                    }
                    let id = fields[1];
                    if id.is_empty() {
                        return Err(bad("attribute id is empty".to_string()));
                    }
                    let kind: AttributeType = fields[2].parse().map_err(|e| bad(format!("{}", e)))?;
                    let policy: AggregationPolicy = match fields.get(3) {
                        Some(p) => p.parse().map_err(|e| bad(format!("{}", e)))?,
                        None => AggregationPolicy::Standard,
                    };
                    let def = AttributeDef::new(id, id, kind).with_policy(policy);
                    if fields[0] == "node" {
                        params.node_schema.push(def);
                    } else {
                        params.edge_schema.push(def);
                    }
                }
                other => {
                    return Err(bad(format!("unknown record type {:?}", other)));
                }
            }
        }

        // Schemas follow the graph's mode.
        params.node_schema.mode = params.mode;
        params.edge_schema.mode = params.mode;
        Ok(params)
    }

    /// Read and parse a parameter file.
    pub fn from_file(path: &Path) -> Result<Self, TemporaError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TemporaError::IoError(format!("Cannot read parameters '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# campaign finance
graph,directed,dynamic,datetime
node,amount,double,add
node,party,string,merge
node,donations,integer,TOTAL

edge,memo,string
";

    #[test]
    fn parses_graph_record() {
        let params = GraphParameters::parse(SAMPLE).expect("parse");
        assert_eq!(params.default_edge_type, EdgeType::Directed);
        assert_eq!(params.mode, GraphMode::Dynamic);
        assert_eq!(params.time_format, TimeFormat::DateTime);
    }

    #[test]
    fn parses_attribute_records_in_order() {
        let params = GraphParameters::parse(SAMPLE).expect("parse");
        let ids: Vec<_> = params.node_schema.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["amount", "party", "donations"]);

        let amount = params.node_schema.get("amount").expect("amount");
        assert_eq!(amount.kind, AttributeType::Double);
        assert_eq!(amount.policy, AggregationPolicy::Add);
        assert_eq!(amount.title, "amount");

        let memo = params.edge_schema.get("memo").expect("memo");
        assert_eq!(memo.policy, AggregationPolicy::Standard);
        assert_eq!(params.edge_schema.class(), AttributeClass::Edge);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = GraphParameters::parse("graph,directed,dynamic,datetime\nnode,amount\n")
            .expect_err("should fail");
        assert!(matches!(err, TemporaError::InvalidParameters { line: 2, .. }));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = GraphParameters::parse("node,amount,money\n").expect_err("should fail");
        assert!(matches!(err, TemporaError::InvalidParameters { line: 1, .. }));
    }

    #[test]
    fn redeclared_attribute_replaces_definition() {
        let mut schema = AttributeSchema::new(AttributeClass::Node, GraphMode::Dynamic);
        schema.push(AttributeDef::new("a", "A", AttributeType::String));
        schema.push(AttributeDef::new("a", "A2", AttributeType::Integer));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("a").map(|d| d.kind), Some(AttributeType::Integer));
        assert!(schema.by_title("A2").is_some());
    }
}

//! # Graph Container
//!
//! Owns the nodes and edges of one temporal graph, the attribute schemas
//! they resolve against, and the graph-level metadata.
//!
//! Entities are kept in insertion order (that is the order the codec writes
//! them in) with a `BTreeMap` index for lookup by id. Node ids and edge ids
//! are independent namespaces.
//!
//! ## Upsert
//!
//! [`Graph::upsert`] is the single entry point for both direct API calls and
//! the decoder:
//! 1. rewind the graph start time if the entity starts earlier
//! 2. unseen id: insert
//! 3. seen id: add a spell covering the incoming interval, merge every
//!    incoming attribute value through its policy, accumulate edge weight

use crate::TemporaError;
use crate::attributes::AttributeValues;
use crate::entity::{Edge, Element, Entity, GraphElement, Node};
use crate::schema::{AttributeSchema, GraphParameters};
use crate::time::{Interval, TimePoint};
use crate::types::{AttributeClass, EdgeType, GraphMode, TimeDomain, TimeFormat};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// What [`Graph::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Merged,
}

/// An interval that failed [`Interval::is_valid`], and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalViolation {
    pub class: AttributeClass,
    pub entity_id: String,
    /// `None` for the base interval or a spell, the attribute id otherwise.
    pub attribute_id: Option<String>,
    pub interval: Interval,
}

// =============================================================================
// GRAPH
// =============================================================================

/// A temporal graph.
#[derive(Debug, Clone)]
pub struct Graph {
    default_edge_type: EdgeType,
    mode: GraphMode,
    time_format: TimeFormat,
    start_time: Option<TimePoint>,

    node_schema: AttributeSchema,
    edge_schema: AttributeSchema,

    nodes: Vec<Node>,
    node_index: BTreeMap<String, usize>,
    edges: Vec<Edge>,
    edge_index: BTreeMap<String, usize>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::from_parameters(GraphParameters::default())
    }
}

impl Graph {
    /// An empty dynamic graph with real-valued time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty graph initialized from parsed parameters.
    #[must_use]
    pub fn from_parameters(params: GraphParameters) -> Self {
        Self {
            default_edge_type: params.default_edge_type,
            mode: params.mode,
            time_format: params.time_format,
            start_time: None,
            node_schema: params.node_schema,
            edge_schema: params.edge_schema,
            nodes: Vec::new(),
            node_index: BTreeMap::new(),
            edges: Vec::new(),
            edge_index: BTreeMap::new(),
        }
    }

    /// Metadata and schemas without any entities.
    #[must_use]
    pub fn parameters(&self) -> GraphParameters {
        GraphParameters {
            default_edge_type: self.default_edge_type,
            mode: self.mode,
            time_format: self.time_format,
            node_schema: self.node_schema.clone(),
            edge_schema: self.edge_schema.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn default_edge_type(&self) -> EdgeType {
        self.default_edge_type
    }

    pub fn set_default_edge_type(&mut self, edge_type: EdgeType) {
        self.default_edge_type = edge_type;
    }

    #[must_use]
    pub fn mode(&self) -> GraphMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GraphMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub fn set_time_format(&mut self, time_format: TimeFormat) {
        self.time_format = time_format;
    }

    /// Domain all intervals of this graph are parsed in.
    #[must_use]
    pub fn time_domain(&self) -> TimeDomain {
        self.time_format.domain()
    }

    /// Earliest start seen so far.
    #[must_use]
    pub fn start_time(&self) -> Option<&TimePoint> {
        self.start_time.as_ref()
    }

    /// Preset the start time, e.g. from a document's `starttime`. Later
    /// upserts still rewind it.
    pub fn set_start_time(&mut self, start: Option<TimePoint>) {
        self.start_time = start;
    }

    // -------------------------------------------------------------------------
    // Schemas
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn schema(&self, class: AttributeClass) -> &AttributeSchema {
        match class {
            AttributeClass::Node => &self.node_schema,
            AttributeClass::Edge => &self.edge_schema,
        }
    }

    /// Replace the schema of the schema's own class.
    pub fn set_schema(&mut self, schema: AttributeSchema) {
        match schema.class() {
            AttributeClass::Node => self.node_schema = schema,
            AttributeClass::Edge => self.edge_schema = schema,
        }
    }

    /// Id of the attribute with the given title.
    #[must_use]
    pub fn attribute_id_by_title(&self, class: AttributeClass, title: &str) -> Option<&str> {
        self.schema(class).by_title(title).map(|d| d.id.as_str())
    }

    // -------------------------------------------------------------------------
    // Entity access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).and_then(|&i| self.nodes.get(i))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.node_index.get(id).and_then(|&i| self.nodes.get_mut(i))
    }

    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).and_then(|&i| self.edges.get(i))
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edge_index.get(id).and_then(|&i| self.edges.get_mut(i))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Remove and return every node, in insertion order.
    pub fn drain_nodes(&mut self) -> Vec<Node> {
        self.node_index.clear();
        std::mem::take(&mut self.nodes)
    }

    /// Remove and return every edge, in insertion order.
    pub fn drain_edges(&mut self) -> Vec<Edge> {
        self.edge_index.clear();
        std::mem::take(&mut self.edges)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Insert an entity, or merge it into the stored entity with the same id.
    pub fn upsert(&mut self, entity: impl Into<Entity>) -> UpsertOutcome {
        let entity = entity.into();
        self.rewind_start_time(entity.interval());

        match entity {
            Entity::Node(node) => match self.node_index.get(node.id()) {
                Some(&index) => {
                    if let Some(existing) = self.nodes.get_mut(index) {
                        absorb(existing.element_mut(), node.into_element(), &self.node_schema);
                    }
                    UpsertOutcome::Merged
                }
                None => {
                    self.node_index.insert(node.id().to_string(), self.nodes.len());
                    self.nodes.push(node);
                    UpsertOutcome::Inserted
                }
            },
            Entity::Edge(edge) => match self.edge_index.get(edge.id()) {
                Some(&index) => {
                    if let Some(existing) = self.edges.get_mut(index) {
                        existing.update_weight(edge.weight);
                        absorb(existing.element_mut(), edge.into_element(), &self.edge_schema);
                    }
                    UpsertOutcome::Merged
                }
                None => {
                    self.edge_index.insert(edge.id().to_string(), self.edges.len());
                    self.edges.push(edge);
                    UpsertOutcome::Inserted
                }
            },
        }
    }

    /// Drop every edge whose source equals its target.
    pub fn remove_self_loops(&mut self) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| !e.is_self_loop());
        let removed = before - self.edges.len();
        if removed > 0 {
            self.edge_index = index_of(&self.edges);
            tracing::debug!(removed, "removed self-loop edges");
        }
        removed
    }

    fn rewind_start_time(&mut self, interval: &Interval) {
        let Some(start) = interval.start() else {
            return;
        };
        match &self.start_time {
            None => self.start_time = Some(*start),
            Some(current) => match start.compare(current) {
                Ok(Ordering::Less) => self.start_time = Some(*start),
                Ok(_) => {}
                Err(e) => tracing::warn!("start time not rewound: {}", e),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Verification
    // -------------------------------------------------------------------------

    /// Every base, spell and attribute value interval with `start > end`.
    #[must_use]
    pub fn invalid_intervals(&self) -> Vec<IntervalViolation> {
        let mut found = Vec::new();
        let entities = self
            .nodes
            .iter()
            .map(|n| (AttributeClass::Node, n.element()))
            .chain(self.edges.iter().map(|e| (AttributeClass::Edge, e.element())));

        for (class, element) in entities {
            let mut report = |attribute_id: Option<&str>, interval: &Interval| {
                if !interval.is_valid() {
                    found.push(IntervalViolation {
                        class,
                        entity_id: element.id().to_string(),
                        attribute_id: attribute_id.map(str::to_string),
                        interval: interval.clone(),
                    });
                }
            };

            report(None, element.interval());
            for spell in element.spells().iter() {
                report(None, spell);
            }
            for value in element.attributes().iter() {
                report(Some(&value.attribute_id), &value.interval);
            }
        }
        found
    }

    /// Fail on the first interval with `start > end`.
    pub fn verify_intervals(&self) -> Result<(), TemporaError> {
        match self.invalid_intervals().into_iter().next() {
            None => Ok(()),
            Some(v) => Err(TemporaError::InvalidInterval(format!(
                "{} '{}'{}: {}",
                v.class,
                v.entity_id,
                v.attribute_id
                    .map(|a| format!(" attribute '{}'", a))
                    .unwrap_or_default(),
                v.interval
            ))),
        }
    }
}

/// Merge an incoming observation into a stored entity.
fn absorb(existing: &mut Element, incoming: Element, schema: &AttributeSchema) {
    let (interval, values): (Interval, AttributeValues) = incoming.into_parts();

    if !interval.is_empty() {
        if let Err(e) = existing.add_spell(interval) {
            tracing::warn!(id = existing.id(), "spell not added: {}", e);
        }
    }
    for value in values {
        let def = schema.get(&value.attribute_id);
        existing.add_attribute(value, def);
    }
}

fn index_of<T: GraphElement>(items: &[T]) -> BTreeMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id().to_string(), i))
        .collect()
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub default_edge_type: EdgeType,
    pub mode: GraphMode,
    pub time_format: TimeFormat,
    pub start_time: Option<TimePoint>,
    pub node_schema: AttributeSchema,
    pub edge_schema: AttributeSchema,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            default_edge_type: graph.default_edge_type,
            mode: graph.mode,
            time_format: graph.time_format,
            start_time: graph.start_time,
            node_schema: graph.node_schema.clone(),
            edge_schema: graph.edge_schema.clone(),
            nodes: graph.nodes.clone(),
            edges: graph.edges.clone(),
        }
    }
}

impl From<SerializableGraph> for Graph {
    fn from(sg: SerializableGraph) -> Self {
        let mut graph = Graph::from_parameters(GraphParameters {
            default_edge_type: sg.default_edge_type,
            mode: sg.mode,
            time_format: sg.time_format,
            node_schema: sg.node_schema,
            edge_schema: sg.edge_schema,
        });

        // Upsert so a hand-edited snapshot with repeated ids still merges.
        for node in sg.nodes {
            graph.upsert(node);
        }
        for edge in sg.edges {
            graph.upsert(edge);
        }

        graph.start_time = sg.start_time;
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::schema::AttributeDef;
    use crate::types::{AggregationPolicy, AttributeType};

    fn node(id: &str, start: f64, end: f64) -> Node {
        Node::new(id, id, Interval::real(start, end))
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge::new(id, source, target, Interval::real(1.0, 2.0))
    }

    #[test]
    fn upsert_inserts_then_merges() {
        let mut graph = Graph::new();
        assert_eq!(graph.upsert(node("a", 1.0, 2.0)), UpsertOutcome::Inserted);
        assert_eq!(graph.upsert(node("a", 5.0, 6.0)), UpsertOutcome::Merged);

        assert_eq!(graph.node_count(), 1);
        let a = graph.node("a").expect("node");
        assert_eq!(a.interval(), &Interval::real(1.0, 6.0));
        assert_eq!(a.spells().len(), 2);
    }

    #[test]
    fn bounded_observation_keeps_ongoing_entity_open() {
        let mut graph = Graph::new();
        graph.upsert(Node::new("a", "a", Interval::real_from(1.0)));
        graph.upsert(node("a", 1.0, 3.0));

        let a = graph.node("a").expect("node");
        assert_eq!(a.interval(), &Interval::real_from(1.0));
        assert!(a.spells().is_empty());
    }

    #[test]
    fn unbounded_entity_adopts_domain_of_first_observation() {
        let mut graph = Graph::new();
        graph.upsert(Node::new("a", "a", Interval::empty(TimeDomain::Real)));
        let observed = Interval::parse(TimeDomain::Calendar, Some("2020-01-01"), Some("2020-01-05"))
            .expect("calendar");
        graph.upsert(Node::new("a", "a", observed.clone()));

        let a = graph.node("a").expect("node");
        assert_eq!(a.interval(), &observed);
        assert_eq!(a.interval().domain(), TimeDomain::Calendar);
    }

    #[test]
    fn node_and_edge_ids_are_separate() {
        let mut graph = Graph::new();
        graph.upsert(node("x", 1.0, 2.0));
        assert_eq!(graph.upsert(edge("x", "x", "y")), UpsertOutcome::Inserted);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edge_weights_accumulate() {
        let mut graph = Graph::new();
        graph.upsert(edge("e", "a", "b").with_weight(3.0));
        graph.upsert(edge("e", "a", "b").with_weight(4.0));
        assert_eq!(graph.edge("e").and_then(|e| e.weight), Some(7.0));
    }

    #[test]
    fn start_time_rewinds() {
        let mut graph = Graph::new();
        graph.upsert(node("a", 5.0, 6.0));
        graph.upsert(node("b", 2.0, 3.0));
        graph.upsert(node("c", 4.0, 9.0));
        assert_eq!(graph.start_time(), Some(&TimePoint::Real(2.0)));
    }

    #[test]
    fn merged_values_follow_schema_policy() {
        let mut params = GraphParameters::default();
        params
            .node_schema
            .push(AttributeDef::new("amt", "amount", AttributeType::Integer).with_policy(AggregationPolicy::Total));
        let schema = params.node_schema.clone();
        let mut graph = Graph::from_parameters(params);

        for amount in ["10", "20", "5"] {
            let mut n = node("a", 1.0, 2.0);
            n.element_mut()
                .add_attribute(AttributeValue::new("amt", amount, Interval::real(1.0, 2.0)), schema.get("amt"));
            graph.upsert(n);
        }

        let a = graph.node("a").expect("node");
        assert_eq!(a.attributes().len(), 1);
        assert_eq!(a.attributes().get("amt").map(|v| v.value.as_str()), Some("35"));
    }

    #[test]
    fn remove_self_loops_counts_and_reindexes() {
        let mut graph = Graph::new();
        graph.upsert(edge("loop1", "a", "a"));
        graph.upsert(edge("ab", "a", "b"));
        graph.upsert(edge("loop2", "b", "b"));
        graph.upsert(edge("bc", "b", "c"));

        assert_eq!(graph.remove_self_loops(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edge("loop1").is_none());
        assert_eq!(graph.edge("bc").map(|e| e.target.as_str()), Some("c"));
        assert_eq!(graph.remove_self_loops(), 0);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut graph = Graph::new();
        for id in ["z", "a", "m"] {
            graph.upsert(node(id, 1.0, 2.0));
        }
        let ids: Vec<_> = graph.nodes().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn verify_intervals_reports_reversed_bounds() {
        let mut graph = Graph::new();
        graph.upsert(node("ok", 1.0, 2.0));
        assert!(graph.verify_intervals().is_ok());

        graph.upsert(node("bad", 9.0, 3.0));
        let found = graph.invalid_intervals();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_id, "bad");
        assert!(matches!(graph.verify_intervals(), Err(TemporaError::InvalidInterval(_))));
    }

    #[test]
    fn drain_empties_the_graph() {
        let mut graph = Graph::new();
        graph.upsert(node("a", 1.0, 2.0));
        graph.upsert(node("b", 1.0, 2.0));

        let drained = graph.drain_nodes();
        assert_eq!(drained.len(), 2);
        assert_eq!(graph.node_count(), 0);
        assert!(graph.node("a").is_none());

        assert_eq!(graph.upsert(node("a", 1.0, 2.0)), UpsertOutcome::Inserted);
    }

    #[test]
    fn attribute_lookup_by_title() {
        let mut params = GraphParameters::default();
        params
            .edge_schema
            .push(AttributeDef::new("0", "memo", AttributeType::String));
        let graph = Graph::from_parameters(params);

        assert_eq!(graph.attribute_id_by_title(AttributeClass::Edge, "memo"), Some("0"));
        assert_eq!(graph.attribute_id_by_title(AttributeClass::Node, "memo"), None);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut graph = Graph::new();
        graph.upsert(node("a", 1.0, 2.0));
        graph.upsert(edge("ab", "a", "b").with_weight(2.5));

        let restored = Graph::from(SerializableGraph::from(&graph));

        assert_eq!(restored.node_count(), 1);
        assert_eq!(restored.edge_count(), 1);
        assert_eq!(restored.edge("ab").and_then(|e| e.weight), Some(2.5));
        assert_eq!(restored.start_time(), graph.start_time());
    }
}

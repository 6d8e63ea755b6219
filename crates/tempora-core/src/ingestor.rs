//! # Ingestor Module
//!
//! Record validation and the upsert protocol for ETL collaborators.
//!
//! - Validate ids, values and intervals before the graph is touched
//! - Parse raw time bounds with the graph's own time format
//! - Build the entity with its values resolved against the class schema
//! - Hand it to [`Graph::upsert`]
//!
//! A rejected record leaves the graph unchanged.

use crate::TemporaError;
use crate::attributes::AttributeValue;
use crate::entity::{Edge, Element, GraphElement, Node};
use crate::graph::{Graph, UpsertOutcome};
use crate::primitives::{MAX_ID_LENGTH, MAX_VALUE_LENGTH};
use crate::time::Interval;
use crate::types::AttributeClass;

/// The Ingestor validates records and upserts them into a [`Graph`].
pub struct Ingestor;

impl Ingestor {
    /// Parse raw bounds in the graph's time format.
    ///
    /// Empty or missing bounds are absent. A parsed interval must satisfy
    /// `start <= end`.
    pub fn interval(graph: &Graph, start: Option<&str>, end: Option<&str>) -> Result<Interval, TemporaError> {
        let interval = Interval::parse(graph.time_domain(), start, end)?;
        if !interval.is_valid() {
            return Err(TemporaError::InvalidInterval(format!("start after end in {}", interval)));
        }
        Ok(interval)
    }

    /// Upsert one node observation.
    pub fn upsert_node(
        graph: &mut Graph,
        id: &str,
        label: &str,
        interval: Interval,
        values: Vec<AttributeValue>,
    ) -> Result<UpsertOutcome, TemporaError> {
        Self::validate_id("node id", id)?;
        Self::validate_interval(graph, &interval)?;
        Self::validate_values(graph, &values)?;

        let mut node = Node::new(id, label, interval);
        Self::fill(graph, AttributeClass::Node, node.element_mut(), values);
        Ok(graph.upsert(node))
    }

    /// Upsert one edge observation. `weight_delta` accumulates onto the
    /// stored weight.
    pub fn upsert_edge(
        graph: &mut Graph,
        id: &str,
        source: &str,
        target: &str,
        interval: Interval,
        weight_delta: Option<f64>,
        values: Vec<AttributeValue>,
    ) -> Result<UpsertOutcome, TemporaError> {
        Self::validate_id("edge id", id)?;
        Self::validate_id("edge source", source)?;
        Self::validate_id("edge target", target)?;
        Self::validate_interval(graph, &interval)?;
        Self::validate_values(graph, &values)?;
        if let Some(w) = weight_delta {
            if !w.is_finite() {
                return Err(TemporaError::InvalidRecord(format!("edge '{}' weight is not finite", id)));
            }
        }

        let mut edge = Edge::new(id, source, target, interval);
        edge.weight = weight_delta;
        Self::fill(graph, AttributeClass::Edge, edge.element_mut(), values);
        Ok(graph.upsert(edge))
    }

    fn fill(graph: &Graph, class: AttributeClass, element: &mut Element, values: Vec<AttributeValue>) {
        let schema = graph.schema(class);
        for value in values {
            let def = schema.get(&value.attribute_id);
            element.add_attribute(value, def);
        }
    }

    fn validate_id(what: &str, id: &str) -> Result<(), TemporaError> {
        if id.is_empty() {
            return Err(TemporaError::InvalidRecord(format!("{} is empty", what)));
        }
        if id.len() > MAX_ID_LENGTH {
            return Err(TemporaError::InvalidRecord(format!(
                "{} exceeds {} bytes",
                what, MAX_ID_LENGTH
            )));
        }
        Ok(())
    }

    fn validate_interval(graph: &Graph, interval: &Interval) -> Result<(), TemporaError> {
        if interval.domain() != graph.time_domain() {
            return Err(TemporaError::DomainMismatch);
        }
        if !interval.is_valid() {
            return Err(TemporaError::InvalidInterval(format!("start after end in {}", interval)));
        }
        Ok(())
    }

    fn validate_values(graph: &Graph, values: &[AttributeValue]) -> Result<(), TemporaError> {
        for value in values {
            Self::validate_id("attribute id", &value.attribute_id)?;
            if value.value.len() > MAX_VALUE_LENGTH {
                return Err(TemporaError::InvalidRecord(format!(
                    "value of '{}' exceeds {} bytes",
                    value.attribute_id, MAX_VALUE_LENGTH
                )));
            }
            Self::validate_interval(graph, &value.interval)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # Graph Entities
//!
//! Nodes and edges share one temporal core, [`Element`]: an id, a base
//! interval, an attribute value store and a spell store. The
//! [`GraphElement`] trait exposes that core uniformly, and [`Entity`] is the
//! sum type the container and the codec hand around.
//!
//! Equality and hashing of nodes and edges are by id only.

use crate::TemporaError;
use crate::attributes::{AttributeValue, AttributeValues, MergeOutcome};
use crate::schema::AttributeDef;
use crate::spells::SpellStore;
use crate::time::Interval;
use crate::types::AttributeClass;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// =============================================================================
// ELEMENT (shared temporal core)
// =============================================================================

/// Identity plus everything time-dependent about an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    id: String,
    interval: Interval,
    attributes: AttributeValues,
    spells: SpellStore,
}

impl Element {
    #[must_use]
    pub fn new(id: impl Into<String>, interval: Interval) -> Self {
        Self {
            id: id.into(),
            interval,
            attributes: AttributeValues::new(),
            spells: SpellStore::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base interval: the hull of everything this entity has been seen over.
    #[must_use]
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    #[must_use]
    pub fn attributes(&self) -> &AttributeValues {
        &self.attributes
    }

    #[must_use]
    pub fn spells(&self) -> &SpellStore {
        &self.spells
    }

    /// Record that the entity exists over `spell`.
    ///
    /// The first spell that overlaps the base interval only widens it; the
    /// first one that does not splits the entity into base + new spell.
    /// After that, spells go through the store's coalescing. The base
    /// interval always ends up covering `spell`.
    pub fn add_spell(&mut self, spell: Interval) -> Result<(), TemporaError> {
        if !self.spells.is_empty() {
            self.spells.add(spell.clone())?;
        } else if !self.interval.overlaps(&spell)? {
            if !self.interval.is_empty() {
                self.spells.add(self.interval.clone())?;
            }
            self.spells.add(spell.clone())?;
        }
        self.interval.union(&spell)
    }

    /// Add a spell straight to the store, leaving the base interval alone.
    ///
    /// Used when a document lists spells explicitly.
    pub fn push_spell(&mut self, spell: Interval) -> Result<(), TemporaError> {
        self.spells.add(spell)
    }

    /// Add an attribute value under the policy of `def`.
    pub fn add_attribute(&mut self, value: AttributeValue, def: Option<&AttributeDef>) -> MergeOutcome {
        self.attributes.add(value, def)
    }

    pub(crate) fn into_parts(self) -> (Interval, AttributeValues) {
        (self.interval, self.attributes)
    }
}

/// Uniform access to the temporal core of a node, an edge or an [`Entity`].
pub trait GraphElement {
    fn element(&self) -> &Element;

    fn element_mut(&mut self) -> &mut Element;

    /// Attribute class the entity's values resolve against.
    fn kind(&self) -> AttributeClass;

    fn id(&self) -> &str {
        self.element().id()
    }

    fn interval(&self) -> &Interval {
        self.element().interval()
    }

    fn attributes(&self) -> &AttributeValues {
        self.element().attributes()
    }

    fn spells(&self) -> &SpellStore {
        self.element().spells()
    }
}

// =============================================================================
// NODE
// =============================================================================

/// RGB colour for visualization hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Layout position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Cosmetic node metrics. Nothing in the model depends on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeViz {
    pub position: Option<Position>,
    pub size: Option<f64>,
    pub color: Option<Color>,
}

impl NodeViz {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.position.is_none() && self.size.is_none() && self.color.is_none()
    }
}

/// A graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    element: Element,
    pub label: String,
    pub viz: NodeViz,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, interval: Interval) -> Self {
        Self {
            element: Element::new(id, interval),
            label: label.into(),
            viz: NodeViz::default(),
        }
    }

    pub(crate) fn into_element(self) -> Element {
        self.element
    }
}

impl GraphElement for Node {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn kind(&self) -> AttributeClass {
        AttributeClass::Node
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.element.id == other.element.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.id.hash(state);
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A graph edge. `source` and `target` are node ids, not checked against
/// the node set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    element: Element,
    pub source: String,
    pub target: String,
    pub weight: Option<f64>,
}

impl Edge {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        interval: Interval,
    ) -> Self {
        Self {
            element: Element::new(id, interval),
            source: source.into(),
            target: target.into(),
            weight: None,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Accumulate another observation's weight.
    pub fn update_weight(&mut self, other: Option<f64>) {
        match (self.weight, other) {
            (Some(current), Some(delta)) => self.weight = Some(current + delta),
            (None, Some(delta)) => self.weight = Some(delta),
            (_, None) => {}
        }
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub(crate) fn into_element(self) -> Element {
        self.element
    }
}

impl GraphElement for Edge {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn kind(&self) -> AttributeClass {
        AttributeClass::Edge
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.element.id == other.element.id
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.id.hash(state);
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Either kind of graph entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Node(Node),
    Edge(Edge),
}

impl GraphElement for Entity {
    fn element(&self) -> &Element {
        match self {
            Self::Node(n) => n.element(),
            Self::Edge(e) => e.element(),
        }
    }

    fn element_mut(&mut self) -> &mut Element {
        match self {
            Self::Node(n) => n.element_mut(),
            Self::Edge(e) => e.element_mut(),
        }
    }

    fn kind(&self) -> AttributeClass {
        match self {
            Self::Node(_) => AttributeClass::Node,
            Self::Edge(_) => AttributeClass::Edge,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Edge> for Entity {
    fn from(edge: Edge) -> Self {
        Self::Edge(edge)
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # GEXF Reader
//!
//! Single-pass, event-driven decoder built on `quick_xml`. The document is
//! never held in memory; nesting is tracked by a typed frame stack.
//!
//! | Element        | On open                         | On close                               |
//! |----------------|---------------------------------|----------------------------------------|
//! | `graph`        | read metadata                   |                                        |
//! | `attributes`   | push `Schema`                   | install schema for its class           |
//! | `attribute`    | fold into `Schema`              |                                        |
//! | `node`, `edge` | push `Entity`                   | `graph.upsert(entity)`                 |
//! | `attvalues`    | push `ValueList`                | add values to the entity, in order     |
//! | `attvalue`     | fold into `ValueList`           |                                        |
//! | `spells`       | push `SpellList`                | add spells to the entity's spell store |
//! | `spell`        | fold into `SpellList`           |                                        |
//! | `viz:*`        | set node visualization hints    |                                        |
//!
//! Because values and spells go through the same stores as direct upserts,
//! decoding a document is equivalent to replaying its upserts.
//!
//! A malformed bound or value is logged and skipped; a malformed token
//! stream stops the read and is reported in [`ReadReport::error`] next to
//! the graph decoded so far.

use super::ReadOptions;
use crate::TemporaError;
use crate::attributes::AttributeValue;
use crate::entity::{Color, Edge, Entity, GraphElement, Node, Position};
use crate::graph::Graph;
use crate::primitives::{EDGE_ID_SEPARATOR, PROGRESS_EVENT_INTERVAL};
use crate::schema::{AttributeDef, AttributeSchema};
use crate::time::{Interval, TimePoint};
use crate::types::{AggregationPolicy, AttributeClass, AttributeType, GraphMode};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;
use std::str::FromStr;

// =============================================================================
// REPORT
// =============================================================================

/// Outcome of a decode: the graph plus what happened while building it.
#[derive(Debug)]
pub struct ReadReport {
    pub graph: Graph,
    pub nodes_read: usize,
    pub edges_read: usize,
    /// A node or edge cap stopped the read before the end of the document.
    pub truncated: bool,
    /// XML events processed.
    pub events: u64,
    /// Set when the token stream was malformed; `graph` holds what was
    /// decoded before the failure.
    pub error: Option<TemporaError>,
}

impl ReadReport {
    /// Drop the counters and turn a failed read into an `Err`.
    pub fn into_result(self) -> Result<Graph, TemporaError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.graph),
        }
    }
}

// =============================================================================
// FRAMES
// =============================================================================

/// Open container elements, innermost last.
#[derive(Debug)]
enum Frame {
    Schema(AttributeSchema),
    Entity(Entity),
    ValueList(Vec<AttributeValue>),
    SpellList(Vec<Interval>),
}

/// Whether the read loop should keep pulling events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Attributes of one start tag, keyed by local name.
struct Attrs(Vec<(String, String)>);

impl Attrs {
    fn of(el: &BytesStart<'_>) -> Result<Self, TemporaError> {
        let mut pairs = Vec::new();
        for attr in el.attributes() {
            let attr = attr.map_err(|e| TemporaError::ParseError(format!("bad attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| TemporaError::ParseError(format!("bad attribute value: {}", e)))?
                .into_owned();
            pairs.push((key, value));
        }
        Ok(Self(pairs))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// READER
// =============================================================================

/// Streaming GEXF decoder.
pub struct GexfReader<R: BufRead> {
    xml: Reader<R>,
    options: ReadOptions,
    graph: Graph,
    stack: Vec<Frame>,
    nodes_read: usize,
    edges_read: usize,
    events: u64,
}

impl<R: BufRead> GexfReader<R> {
    #[must_use]
    pub fn new(inner: R, options: ReadOptions) -> Self {
        let mut xml = Reader::from_reader(inner);
        xml.config_mut().trim_text(true);
        Self {
            xml,
            options,
            graph: Graph::new(),
            stack: Vec::new(),
            nodes_read: 0,
            edges_read: 0,
            events: 0,
        }
    }

    /// Decode until end of document, a cap, or a malformed token.
    pub fn read(mut self) -> ReadReport {
        let mut buf = Vec::new();
        let mut truncated = false;
        let mut error = None;

        loop {
            if self.nodes_read >= self.options.max_nodes || self.edges_read >= self.options.max_edges {
                truncated = true;
                break;
            }

            let event = match self.xml.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => {
                    error = Some(TemporaError::ParseError(format!(
                        "at byte {}: {}",
                        self.xml.buffer_position(),
                        e
                    )));
                    break;
                }
            };

            self.events += 1;
            if self.events % PROGRESS_EVENT_INTERVAL == 0 {
                tracing::debug!(events = self.events, nodes = self.nodes_read, edges = self.edges_read, "decoding");
            }

            let flow = match event {
                Event::Start(el) => self.open(&el),
                Event::Empty(el) => match self.open(&el) {
                    Ok(Flow::Continue) => Ok(self.close(el.local_name().as_ref())),
                    other => other,
                },
                Event::End(el) => Ok(self.close(el.local_name().as_ref())),
                Event::Eof => Ok(Flow::Stop),
                _ => Ok(Flow::Continue),
            };

            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
            buf.clear();
        }

        if error.is_none() && !self.stack.is_empty() && !truncated && !self.options.schema_only {
            error = Some(TemporaError::ParseError(format!(
                "document ended with {} unclosed element(s)",
                self.stack.len()
            )));
        }

        ReadReport {
            graph: self.graph,
            nodes_read: self.nodes_read,
            edges_read: self.edges_read,
            truncated,
            events: self.events,
            error,
        }
    }

    // =========================================================================
    // OPEN
    // =========================================================================

    fn open(&mut self, el: &BytesStart<'_>) -> Result<Flow, TemporaError> {
        let name = el.local_name();
        let name = name.as_ref();
        if !matches!(
            name,
            b"graph"
                | b"attributes"
                | b"attribute"
                | b"nodes"
                | b"node"
                | b"edge"
                | b"attvalues"
                | b"attvalue"
                | b"spells"
                | b"spell"
                | b"size"
                | b"position"
                | b"color"
        ) || self.skipped(name)
        {
            return Ok(Flow::Continue);
        }

        let attrs = Attrs::of(el)?;
        match name {
            b"graph" => self.open_graph(&attrs),
            b"attributes" => {
                let class = parse_or(&attrs, "class", AttributeClass::Node);
                let mode = parse_or(&attrs, "mode", self.graph.mode());
                self.stack.push(Frame::Schema(AttributeSchema::new(class, mode)));
            }
            b"attribute" => self.open_attribute(&attrs),
            b"nodes" if self.options.schema_only => return Ok(Flow::Stop),
            b"node" => {
                let id = attrs.get("id").unwrap_or_default();
                let label = attrs.get("label").unwrap_or(id);
                let interval = self.entity_interval(&attrs, id);
                self.stack.push(Frame::Entity(Node::new(id, label, interval).into()));
            }
            b"edge" => {
                let source = attrs.get("source").unwrap_or_default();
                let target = attrs.get("target").unwrap_or_default();
                let id = match attrs.get("id") {
                    Some(id) => id.to_string(),
                    None => format!("{}{}{}", source, EDGE_ID_SEPARATOR, target),
                };
                let weight = attrs.get("weight").and_then(|w| match w.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => Some(v),
                    _ => {
                        tracing::warn!(edge = %id, weight = w, "unreadable edge weight skipped");
                        None
                    }
                });
                let interval = self.entity_interval(&attrs, &id);
                let mut edge = Edge::new(id, source, target, interval);
                edge.weight = weight;
                self.stack.push(Frame::Entity(edge.into()));
            }
            b"attvalues" => self.stack.push(Frame::ValueList(Vec::new())),
            b"attvalue" => self.open_attvalue(&attrs),
            b"spells" => self.stack.push(Frame::SpellList(Vec::new())),
            b"spell" => self.open_spell(&attrs),
            _ => self.open_viz(name, &attrs),
        }
        Ok(Flow::Continue)
    }

    fn open_graph(&mut self, attrs: &Attrs) {
        let edge_type = parse_or(attrs, "defaultedgetype", self.graph.default_edge_type());
        let mode = parse_or(attrs, "mode", GraphMode::Static);
        let time_format = parse_or(attrs, "timeformat", self.graph.time_format());

        self.graph.set_default_edge_type(edge_type);
        self.graph.set_mode(mode);
        self.graph.set_time_format(time_format);

        if mode.is_dynamic() {
            if let Some(raw) = attrs.get("starttime").filter(|s| !s.trim().is_empty()) {
                match TimePoint::parse(raw, self.graph.time_domain()) {
                    Ok(start) => self.graph.set_start_time(Some(start)),
                    Err(e) => tracing::warn!("graph starttime skipped: {}", e),
                }
            }
        }
    }

    fn open_attribute(&mut self, attrs: &Attrs) {
        let Some(Frame::Schema(schema)) = self.stack.last_mut() else {
            tracing::warn!("<attribute> outside <attributes> ignored");
            return;
        };
        let Some(id) = attrs.get("id").filter(|id| !id.is_empty()) else {
            tracing::warn!("<attribute> without id ignored");
            return;
        };
        let title = attrs.get("title").unwrap_or(id);
        let kind = parse_or(attrs, "type", AttributeType::String);
        let policy = parse_or(attrs, "datamode", AggregationPolicy::Standard);
        schema.push(AttributeDef::new(id, title, kind).with_policy(policy));
    }

    fn open_attvalue(&mut self, attrs: &Attrs) {
        // GEXF 1.1 used `id` where later versions use `for`.
        let Some(id) = attrs.get("for").or_else(|| attrs.get("id")) else {
            tracing::warn!("<attvalue> without 'for' ignored");
            return;
        };
        let value = attrs.get("value").unwrap_or_default();
        let Some(interval) = self.bounded_interval(attrs) else {
            tracing::warn!(attribute = id, value, "attribute value with unreadable bounds skipped");
            return;
        };
        match self.stack.last_mut() {
            Some(Frame::ValueList(values)) => values.push(AttributeValue::new(id, value, interval)),
            _ => tracing::warn!(attribute = id, "<attvalue> outside <attvalues> ignored"),
        }
    }

    fn open_spell(&mut self, attrs: &Attrs) {
        let Some(spell) = self.bounded_interval(attrs) else {
            tracing::warn!("spell with unreadable bounds skipped");
            return;
        };
        match self.stack.last_mut() {
            Some(Frame::SpellList(spells)) => spells.push(spell),
            _ => tracing::warn!("<spell> outside <spells> ignored"),
        }
    }

    fn open_viz(&mut self, name: &[u8], attrs: &Attrs) {
        let Some(Frame::Entity(Entity::Node(node))) = self.stack.last_mut() else {
            return;
        };
        let number = |key: &str| attrs.get(key).and_then(|v| v.trim().parse::<f64>().ok());
        let channel = |key: &str| attrs.get(key).and_then(|v| v.trim().parse::<u8>().ok());

        match name {
            b"size" => node.viz.size = number("value"),
            b"position" => {
                node.viz.position = number("x").zip(number("y")).map(|(x, y)| Position { x, y });
            }
            b"color" => {
                node.viz.color = match (channel("r"), channel("g"), channel("b")) {
                    (Some(r), Some(g), Some(b)) => Some(Color { r, g, b }),
                    _ => None,
                };
            }
            _ => {}
        }
    }

    // =========================================================================
    // CLOSE
    // =========================================================================

    fn close(&mut self, name: &[u8]) -> Flow {
        if self.skipped(name) {
            return Flow::Continue;
        }
        match name {
            b"attributes" => match self.stack.pop() {
                Some(Frame::Schema(schema)) => self.graph.set_schema(schema),
                other => self.unbalanced("attributes", other),
            },
            b"attvalues" => match self.stack.pop() {
                Some(Frame::ValueList(values)) => self.fold_values(values),
                other => self.unbalanced("attvalues", other),
            },
            b"spells" => match self.stack.pop() {
                Some(Frame::SpellList(spells)) => self.fold_spells(spells),
                other => self.unbalanced("spells", other),
            },
            b"node" | b"edge" => match self.stack.pop() {
                Some(Frame::Entity(entity)) => self.finish_entity(entity),
                other => self.unbalanced("node/edge", other),
            },
            _ => {}
        }
        Flow::Continue
    }

    /// Elements ignored on open and close in structure-only reads.
    fn skipped(&self, name: &[u8]) -> bool {
        self.options.structure_only
            && matches!(
                name,
                b"attributes" | b"attribute" | b"attvalues" | b"attvalue" | b"spells" | b"spell"
            )
    }

    fn fold_values(&mut self, values: Vec<AttributeValue>) {
        let Some(Frame::Entity(entity)) = self.stack.last_mut() else {
            tracing::warn!("<attvalues> outside a node or edge ignored");
            return;
        };
        let schema = self.graph.schema(entity.kind());
        for value in values {
            let def = schema.get(&value.attribute_id);
            entity.element_mut().add_attribute(value, def);
        }
    }

    fn fold_spells(&mut self, spells: Vec<Interval>) {
        let Some(Frame::Entity(entity)) = self.stack.last_mut() else {
            tracing::warn!("<spells> outside a node or edge ignored");
            return;
        };
        for spell in spells {
            if let Err(e) = entity.element_mut().push_spell(spell) {
                tracing::warn!(id = entity.id(), "spell skipped: {}", e);
            }
        }
    }

    fn finish_entity(&mut self, entity: Entity) {
        if entity.id().is_empty() {
            tracing::warn!(kind = %entity.kind(), "entity without id skipped");
            return;
        }
        match entity.kind() {
            AttributeClass::Node => self.nodes_read += 1,
            AttributeClass::Edge => self.edges_read += 1,
        }
        self.graph.upsert(entity);
    }

    fn unbalanced(&mut self, closing: &str, popped: Option<Frame>) {
        tracing::warn!(element = closing, frame = ?popped.as_ref().map(frame_name), "closing tag does not match open frame");
        if let Some(frame) = popped {
            self.stack.push(frame);
        }
    }

    // =========================================================================
    // INTERVALS
    // =========================================================================

    /// Interval of a node or edge. Unreadable bounds leave it empty.
    fn entity_interval(&self, attrs: &Attrs, id: &str) -> Interval {
        self.bounded_interval(attrs).unwrap_or_else(|| {
            tracing::warn!(id, "unreadable bounds, entity kept without interval");
            Interval::empty(self.graph.time_domain())
        })
    }

    /// `None` when a bound is present but unreadable. Static graphs carry no
    /// intervals at all.
    fn bounded_interval(&self, attrs: &Attrs) -> Option<Interval> {
        let domain = self.graph.time_domain();
        if !self.graph.mode().is_dynamic() {
            return Some(Interval::empty(domain));
        }
        match Interval::parse(domain, attrs.get("start"), attrs.get("end")) {
            Ok(interval) => Some(interval),
            Err(e) => {
                tracing::debug!("bound rejected: {}", e);
                None
            }
        }
    }
}

fn parse_or<T: FromStr>(attrs: &Attrs, key: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match attrs.get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(attribute = key, "{}; using default", e);
            default
        }),
    }
}

fn frame_name(frame: &Frame) -> &'static str {
    match frame {
        Frame::Schema(_) => "attributes",
        Frame::Entity(_) => "node/edge",
        Frame::ValueList(_) => "attvalues",
        Frame::SpellList(_) => "spells",
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # GEXF Writer
//!
//! Single forward pass over a [`Graph`], emitting GEXF 1.3 through
//! `quick_xml`. Nothing is buffered beyond the element being written, so
//! output size is bounded only by the sink.
//!
//! Document layout:
//!
//! ```text
//! <gexf>
//!   <meta><creator/></meta>
//!   <graph defaultedgetype mode [timeformat timerepresentation starttime]>
//!     <attributes class mode><attribute id title type [datamode]/></attributes>
//!     <nodes count><node id label [start] [end]>spells, attvalues, viz</node></nodes>
//!     <edges count><edge id source target [weight] [start] [end]>...</edge></edges>
//!   </graph>
//! </gexf>
//! ```
//!
//! Attribute text is XML-escaped by `quick_xml`. Newlines are stripped from
//! ids, labels, endpoints and string-typed values; other value types are
//! written as stored.

use super::WriterOptions;
use crate::TemporaError;
use crate::entity::{Edge, Element, GraphElement, Node, NodeViz};
use crate::graph::Graph;
use crate::primitives::{
    GEXF_NAMESPACE, GEXF_SCHEMA_LOCATION, GEXF_VERSION, GEXF_VIZ_NAMESPACE, XSI_NAMESPACE,
};
use crate::schema::AttributeSchema;
use crate::time::{Interval, TimeStyle, format_real};
use crate::types::{AggregationPolicy, AttributeClass, AttributeType};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::Write;

/// Streaming GEXF encoder.
pub struct GexfWriter<W: Write> {
    xml: Writer<W>,
    options: WriterOptions,
    /// `options.time_style` narrowed to the graph being written.
    style: TimeStyle,
}

impl<W: Write> GexfWriter<W> {
    #[must_use]
    pub fn new(inner: W, options: WriterOptions) -> Self {
        let xml = if options.indent == 0 {
            Writer::new(inner)
        } else {
            Writer::new_with_indent(inner, b' ', options.indent)
        };
        let style = options.time_style;
        Self { xml, options, style }
    }

    /// Write the whole document and flush the sink.
    pub fn write_graph(&mut self, graph: &Graph) -> Result<(), TemporaError> {
        self.style = self.options.time_style.for_format(graph.time_format());
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("gexf");
        root.push_attribute(("xmlns", GEXF_NAMESPACE));
        root.push_attribute(("version", GEXF_VERSION));
        root.push_attribute(("xmlns:viz", GEXF_VIZ_NAMESPACE));
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        root.push_attribute(("xsi:schemaLocation", GEXF_SCHEMA_LOCATION));
        self.emit(Event::Start(root))?;

        self.write_meta()?;
        self.write_body(graph)?;

        self.emit(Event::End(BytesEnd::new("gexf")))?;
        self.xml
            .get_mut()
            .flush()
            .map_err(|e| TemporaError::IoError(format!("Cannot flush GEXF output: {}", e)))
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.xml.into_inner()
    }

    // =========================================================================
    // SECTIONS
    // =========================================================================

    fn write_meta(&mut self) -> Result<(), TemporaError> {
        let creator = self.options.creator.clone();
        let description = self.options.description.clone();

        self.emit(Event::Start(BytesStart::new("meta")))?;
        self.text_element("creator", &creator)?;
        if let Some(description) = description {
            self.text_element("description", &description)?;
        }
        self.emit(Event::End(BytesEnd::new("meta")))
    }

    fn write_body(&mut self, graph: &Graph) -> Result<(), TemporaError> {
        let mut el = BytesStart::new("graph");
        el.push_attribute(("defaultedgetype", graph.default_edge_type().as_str()));
        el.push_attribute(("mode", graph.mode().as_str()));
        if graph.mode().is_dynamic() {
            el.push_attribute(("timeformat", graph.time_format().as_str()));
            el.push_attribute(("timerepresentation", "interval"));
            if let Some(start) = graph.start_time() {
                let start = start.format(&self.style);
                el.push_attribute(("starttime", start.as_str()));
            }
        }
        self.emit(Event::Start(el))?;

        for class in [AttributeClass::Node, AttributeClass::Edge] {
            self.write_schema(graph.schema(class))?;
        }

        let mut nodes = BytesStart::new("nodes");
        nodes.push_attribute(("count", graph.node_count().to_string().as_str()));
        self.emit(Event::Start(nodes))?;
        let node_schema = graph.schema(AttributeClass::Node);
        for node in graph.nodes() {
            self.write_node(node, node_schema)?;
        }
        self.emit(Event::End(BytesEnd::new("nodes")))?;

        let mut edges = BytesStart::new("edges");
        edges.push_attribute(("count", graph.edge_count().to_string().as_str()));
        self.emit(Event::Start(edges))?;
        let edge_schema = graph.schema(AttributeClass::Edge);
        for edge in graph.edges() {
            self.write_edge(edge, edge_schema)?;
        }
        self.emit(Event::End(BytesEnd::new("edges")))?;

        self.emit(Event::End(BytesEnd::new("graph")))
    }

    fn write_schema(&mut self, schema: &AttributeSchema) -> Result<(), TemporaError> {
        if schema.is_empty() {
            return Ok(());
        }

        let mut el = BytesStart::new("attributes");
        el.push_attribute(("class", schema.class().as_str()));
        el.push_attribute(("mode", schema.mode().as_str()));
        self.emit(Event::Start(el))?;

        for def in schema.iter() {
            let mut attr = BytesStart::new("attribute");
            attr.push_attribute(("id", def.id.as_str()));
            attr.push_attribute(("title", def.title.as_str()));
            attr.push_attribute(("type", def.kind.as_str()));
            if def.policy != AggregationPolicy::Standard {
                attr.push_attribute(("datamode", def.policy.as_str()));
            }
            self.emit(Event::Empty(attr))?;
        }

        self.emit(Event::End(BytesEnd::new("attributes")))
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    fn write_node(&mut self, node: &Node, schema: &AttributeSchema) -> Result<(), TemporaError> {
        let mut el = BytesStart::new("node");
        el.push_attribute(("id", strip_newlines(node.id()).as_ref()));
        el.push_attribute(("label", strip_newlines(&node.label).as_ref()));
        self.push_interval(&mut el, node.interval());

        let element = node.element();
        if has_children(element) || !node.viz.is_unset() {
            self.emit(Event::Start(el))?;
            self.write_children(element, schema)?;
            self.write_viz(&node.viz)?;
            self.emit(Event::End(BytesEnd::new("node")))
        } else {
            self.emit(Event::Empty(el))
        }
    }

    fn write_edge(&mut self, edge: &Edge, schema: &AttributeSchema) -> Result<(), TemporaError> {
        let mut el = BytesStart::new("edge");
        el.push_attribute(("id", strip_newlines(edge.id()).as_ref()));
        el.push_attribute(("source", strip_newlines(&edge.source).as_ref()));
        el.push_attribute(("target", strip_newlines(&edge.target).as_ref()));
        if let Some(weight) = edge.weight {
            el.push_attribute(("weight", format_real(weight).as_str()));
        }
        self.push_interval(&mut el, edge.interval());

        let element = edge.element();
        if has_children(element) {
            self.emit(Event::Start(el))?;
            self.write_children(element, schema)?;
            self.emit(Event::End(BytesEnd::new("edge")))
        } else {
            self.emit(Event::Empty(el))
        }
    }

    fn write_children(&mut self, element: &Element, schema: &AttributeSchema) -> Result<(), TemporaError> {
        if !element.spells().is_empty() {
            self.emit(Event::Start(BytesStart::new("spells")))?;
            for spell in element.spells().iter() {
                let mut el = BytesStart::new("spell");
                self.push_interval(&mut el, spell);
                self.emit(Event::Empty(el))?;
            }
            self.emit(Event::End(BytesEnd::new("spells")))?;
        }

        if !element.attributes().is_empty() {
            self.emit(Event::Start(BytesStart::new("attvalues")))?;
            for value in element.attributes().iter() {
                let kind = schema
                    .get(&value.attribute_id)
                    .map_or(AttributeType::String, |d| d.kind);
                let text = match kind {
                    AttributeType::String => strip_newlines(&value.value),
                    _ => Cow::Borrowed(value.value.as_str()),
                };

                let mut el = BytesStart::new("attvalue");
                el.push_attribute(("for", value.attribute_id.as_str()));
                el.push_attribute(("value", text.as_ref()));
                self.push_interval(&mut el, &value.interval);
                self.emit(Event::Empty(el))?;
            }
            self.emit(Event::End(BytesEnd::new("attvalues")))?;
        }
        Ok(())
    }

    fn write_viz(&mut self, viz: &NodeViz) -> Result<(), TemporaError> {
        if let Some(size) = viz.size {
            let mut el = BytesStart::new("viz:size");
            el.push_attribute(("value", format_real(size).as_str()));
            self.emit(Event::Empty(el))?;
        }
        if let Some(position) = viz.position {
            let mut el = BytesStart::new("viz:position");
            el.push_attribute(("x", format_real(position.x).as_str()));
            el.push_attribute(("y", format_real(position.y).as_str()));
            self.emit(Event::Empty(el))?;
        }
        if let Some(color) = viz.color {
            let mut el = BytesStart::new("viz:color");
            el.push_attribute(("r", color.r.to_string().as_str()));
            el.push_attribute(("g", color.g.to_string().as_str()));
            el.push_attribute(("b", color.b.to_string().as_str()));
            self.emit(Event::Empty(el))?;
        }
        Ok(())
    }

    // =========================================================================
    // PRIMITIVES
    // =========================================================================

    fn push_interval(&self, el: &mut BytesStart<'_>, interval: &Interval) {
        let style = &self.style;
        if let Some(start) = interval.start() {
            el.push_attribute(("start", start.format(style).as_str()));
        }
        if let Some(end) = interval.end() {
            el.push_attribute(("end", end.format(style).as_str()));
        }
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), TemporaError> {
        self.emit(Event::Start(BytesStart::new(name)))?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), TemporaError> {
        self.xml
            .write_event(event)
            .map_err(|e| TemporaError::IoError(format!("Cannot write GEXF: {}", e)))
    }
}

fn has_children(element: &Element) -> bool {
    !element.spells().is_empty() || !element.attributes().is_empty()
}

fn strip_newlines(text: &str) -> Cow<'_, str> {
    if text.contains(['\n', '\r']) {
        Cow::Owned(text.replace(['\n', '\r'], ""))
    } else {
        Cow::Borrowed(text)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::schema::{AttributeDef, GraphParameters};
    use crate::types::{GraphMode, TimeDomain, TimeFormat};

    fn render(graph: &Graph) -> String {
        let mut writer = GexfWriter::new(Vec::new(), WriterOptions::default());
        writer.write_graph(graph).expect("write");
        String::from_utf8(writer.into_inner()).expect("utf8")
    }

    #[test]
    fn writes_header_and_counts() {
        let mut graph = Graph::new();
        graph.upsert(Node::new("a", "A", Interval::real(1.0, 2.0)));
        graph.upsert(Edge::new("ab", "a", "b", Interval::real(1.0, 2.0)).with_weight(3.0));

        let xml = render(&graph);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<creator>tempora</creator>"));
        assert!(xml.contains("timeformat=\"double\""));
        assert!(xml.contains("starttime=\"1\""));
        assert!(xml.contains("<nodes count=\"1\">"));
        assert!(xml.contains("<edges count=\"1\">"));
        assert!(xml.contains("weight=\"3\""));
    }

    #[test]
    fn static_graph_has_no_time_attributes() {
        let mut params = GraphParameters::default();
        params.mode = GraphMode::Static;
        let graph = Graph::from_parameters(params);

        let xml = render(&graph);
        assert!(xml.contains("mode=\"static\""));
        assert!(!xml.contains("timeformat"));
    }

    #[test]
    fn string_values_are_escaped_and_flattened() {
        let mut params = GraphParameters::default();
        params
            .node_schema
            .push(AttributeDef::new("post", "post", AttributeType::String));
        let mut graph = Graph::from_parameters(params);

        let mut node = Node::new("a&b", "<A>", Interval::real(1.0, 2.0));
        node.element_mut().add_attribute(
            AttributeValue::new("post", "say \"hi\"\nto 'all'", Interval::real(1.0, 2.0)),
            None,
        );
        graph.upsert(node);

        let xml = render(&graph);
        assert!(xml.contains("id=\"a&amp;b\""));
        assert!(xml.contains("label=\"&lt;A&gt;\""));
        assert!(xml.contains("value=\"say &quot;hi&quot;to &apos;all&apos;\""));
    }

    #[test]
    fn datamode_only_for_non_standard_policies() {
        let mut params = GraphParameters::default();
        params.node_schema.push(
            AttributeDef::new("amt", "amount", AttributeType::Double).with_policy(AggregationPolicy::Add),
        );
        params
            .node_schema
            .push(AttributeDef::new("name", "name", AttributeType::String));
        let xml = render(&Graph::from_parameters(params));

        assert!(xml.contains("datamode=\"add\""));
        assert_eq!(xml.matches("datamode").count(), 1);
    }

    #[test]
    fn date_format_writes_plain_dates() {
        let mut params = GraphParameters::default();
        params.time_format = TimeFormat::Date;
        let mut graph = Graph::from_parameters(params);
        let span = Interval::parse(TimeDomain::Calendar, Some("2020-01-01"), Some("2020-01-05")).expect("dates");
        graph.upsert(Node::new("a", "a", span.clone()));

        let xml = render(&graph);
        assert!(xml.contains("timeformat=\"date\""));
        assert!(xml.contains("starttime=\"2020-01-01\""));
        assert!(xml.contains("start=\"2020-01-01\" end=\"2020-01-05\""));
        assert!(!xml.contains("T00:00:00"));

        let decoded = crate::formats::GexfReader::new(xml.as_bytes(), crate::formats::ReadOptions::default())
            .read()
            .into_result()
            .expect("read");
        assert_eq!(decoded.node("a").map(|n| n.interval().clone()), Some(span));
    }

    #[test]
    fn strip_newlines_borrows_clean_text() {
        assert!(matches!(strip_newlines("plain"), Cow::Borrowed(_)));
        assert_eq!(strip_newlines("a\r\nb"), "ab");
    }
}

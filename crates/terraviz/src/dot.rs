use std::fmt::Write;

use dotavious::attributes::{
    AttributeText, AttributeType, GraphAttributeStatementBuilder, GraphAttributes, NodeAttributes,
};
use dotavious::dot::SubGraph;
use dotavious::{Dot, GraphBuilder, Node, NodeBuilder, SubGraphBuilder};

use crate::error::TerravizError;
use crate::materialize::{Descriptor, ICON_PLACEHOLDER};

/// Emits Graphviz DOT text for a descriptor tree.
///
/// Groups become `cluster_N` subgraphs and leaves become plaintext nodes with
/// HTML-like table labels. Identifiers are assigned in descriptor order, so the
/// output is byte-identical across runs for the same input.
pub fn to_dot(descriptors: &[Descriptor]) -> Result<String, TerravizError> {
    let mut ids = DotIds::default();
    let mut graph = GraphBuilder::new_named_directed("terraform");
    graph.add_graph_attributes(
        GraphAttributeStatementBuilder::new()
            .add_attribute("rankdir", AttributeText::attr("TB"))
            .add_attribute("splines", AttributeText::attr("ortho"))
            .add_attribute("nodesep", AttributeText::quoted("0.5"))
            .add_attribute("ranksep", AttributeText::quoted("0.8"))
            .build()
            .map_err(invalid)?,
    );
    for descriptor in descriptors {
        match descriptor {
            Descriptor::Group { label, children } => {
                graph.add_sub_graph(ids.cluster(label, children, 0)?);
            }
            Descriptor::Leaf { .. } => {
                graph.add_node(ids.node(descriptor)?);
            }
        }
    }

    let dot = Dot {
        graph: graph.build().map_err(invalid)?,
    };
    let mut bytes = Vec::new();
    dot.render(&mut bytes)?;
    String::from_utf8(bytes).map_err(|err| TerravizError::Render(err.to_string()))
}

fn invalid(err: impl std::fmt::Debug) -> TerravizError {
    TerravizError::Render(format!("invalid graph: {err:?}"))
}

/// Sequential `cluster_N` and `node_N` counters, assigned in pre-order.
#[derive(Default)]
struct DotIds {
    clusters: usize,
    nodes: usize,
}

impl DotIds {
    fn cluster(
        &mut self,
        label: &str,
        children: &[Descriptor],
        depth: usize,
    ) -> Result<SubGraph<'static>, TerravizError> {
        let id = format!("cluster_{}", self.clusters);
        self.clusters += 1;

        let mut cluster = SubGraphBuilder::new_named(&id);
        cluster
            .add_attribute(AttributeType::Graph, "label".to_string(), AttributeText::quoted(escape_quoted(label)))
            .add_attribute(AttributeType::Graph, "style".to_string(), AttributeText::quoted("filled,rounded"));
        if depth == 0 {
            cluster
                .add_attribute(AttributeType::Graph, "fontsize".to_string(), AttributeText::quoted("16"))
                .add_attribute(AttributeType::Graph, "fontname".to_string(), AttributeText::quoted("bold"))
                .add_attribute(AttributeType::Graph, "color".to_string(), AttributeText::quoted("blue"))
                .add_attribute(AttributeType::Graph, "fillcolor".to_string(), AttributeText::quoted("#e6f2ff"));
        } else {
            cluster
                .add_attribute(AttributeType::Graph, "fontsize".to_string(), AttributeText::quoted("12"))
                .add_attribute(AttributeType::Graph, "color".to_string(), AttributeText::quoted("darkgrey"))
                .add_attribute(AttributeType::Graph, "fillcolor".to_string(), AttributeText::quoted("white"));
        }

        for child in children {
            match child {
                Descriptor::Group { label, children } => {
                    cluster.add_sub_graph(self.cluster(label, children, depth + 1)?);
                }
                Descriptor::Leaf { .. } => {
                    cluster.add_node(self.node(child)?);
                }
            }
        }
        cluster.build().map_err(invalid)
    }

    fn node(&mut self, leaf: &Descriptor) -> Result<Node<'static>, TerravizError> {
        let Descriptor::Leaf {
            primary_label,
            secondary_label,
            icon,
            ..
        } = leaf
        else {
            return Err(TerravizError::Render("expected a leaf descriptor".into()));
        };
        let id = format!("node_{}", self.nodes);
        self.nodes += 1;

        NodeBuilder::new(&id)
            .add_attribute("shape", AttributeText::attr("plaintext"))
            .add_attribute(
                "label",
                AttributeText::html(node_label(primary_label, secondary_label, icon.as_deref())),
            )
            .build()
            .map_err(invalid)
    }
}

fn node_label(primary: &str, secondary: &str, icon: Option<&str>) -> String {
    let mut label = String::new();
    let padding = if icon.is_some() { 6 } else { 8 };
    let _ = write!(
        label,
        "<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"{padding}\" BGCOLOR=\"lightblue\"><TR>"
    );
    match icon {
        Some(ICON_PLACEHOLDER) => label.push_str(
            "<TD WIDTH=\"48\" HEIGHT=\"48\" FIXEDSIZE=\"TRUE\" BGCOLOR=\"#e0e0e0\" BORDER=\"0\">&#128230;</TD>",
        ),
        Some(path) => {
            let _ = write!(
                label,
                "<TD WIDTH=\"48\" HEIGHT=\"48\" FIXEDSIZE=\"TRUE\"><IMG SRC=\"{}\"/></TD>",
                escape_html(path)
            );
        }
        None => {}
    }
    let _ = write!(
        label,
        "<TD ALIGN=\"LEFT\" BALIGN=\"LEFT\"><FONT POINT-SIZE=\"13\"><B>{}</B></FONT><BR/><FONT POINT-SIZE=\"11\" COLOR=\"#555555\">{}</FONT></TD></TR></TABLE>",
        escape_html(primary),
        escape_html(secondary)
    );
    label
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

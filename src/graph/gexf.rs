//! GEXF 1.2draft serialization of the attributed graph.
//!
//! One file per cache key. The write is atomic with respect to readers: the
//! document is rendered to a sibling temp path and renamed into place, so a
//! concurrent cache scan never observes a half-written artifact.

use super::store::VizGraph;
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const FILTER_FEATURE_ATTR: &str = "filter_feature";
const FILTER_QUERY_ATTR: &str = "filter_query";

/// Escape a raw value for use in XML attribute content.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Attribute ids must be declared before use; collect every feature key in
/// first-seen order.
fn attribute_registry(graph: &VizGraph) -> IndexMap<String, usize> {
    let mut registry: IndexMap<String, usize> = IndexMap::new();
    for node in graph.nodes() {
        for key in node.features.keys() {
            let next = registry.len();
            registry.entry(key.clone()).or_insert(next);
        }
        if node.filter_feature.is_some() {
            for key in [FILTER_FEATURE_ATTR, FILTER_QUERY_ATTR] {
                let next = registry.len();
                registry.entry(key.to_string()).or_insert(next);
            }
        }
    }
    registry
}

fn render(graph: &VizGraph) -> String {
    let registry = attribute_registry(graph);
    let mut doc = String::new();

    doc.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    doc.push_str(concat!(
        "<gexf xmlns=\"http://www.gexf.net/1.2draft\" ",
        "xmlns:viz=\"http://www.gexf.net/1.2draft/viz\" version=\"1.2\">\n"
    ));
    let _ = writeln!(
        doc,
        "  <meta lastmodifieddate=\"{}\"><creator>recviz</creator></meta>",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    doc.push_str("  <graph mode=\"static\" defaultedgetype=\"undirected\">\n");

    doc.push_str("    <attributes class=\"node\">\n");
    for (title, id) in &registry {
        let _ = writeln!(
            doc,
            "      <attribute id=\"{id}\" title=\"{}\" type=\"string\"/>",
            escape(title)
        );
    }
    doc.push_str("    </attributes>\n");

    doc.push_str("    <nodes>\n");
    for node in graph.nodes() {
        let _ = writeln!(
            doc,
            "      <node id=\"{}\" label=\"{}\">",
            escape(&node.id),
            escape(&node.label)
        );
        doc.push_str("        <attvalues>\n");
        for (key, value) in &node.features {
            if let Some(id) = registry.get(key) {
                let _ = writeln!(
                    doc,
                    "          <attvalue for=\"{id}\" value=\"{}\"/>",
                    escape(value)
                );
            }
        }
        if let (Some(feature), Some(query)) = (&node.filter_feature, &node.filter_query) {
            if let Some(id) = registry.get(FILTER_FEATURE_ATTR) {
                let _ = writeln!(
                    doc,
                    "          <attvalue for=\"{id}\" value=\"{}\"/>",
                    escape(feature)
                );
            }
            if let Some(id) = registry.get(FILTER_QUERY_ATTR) {
                let _ = writeln!(
                    doc,
                    "          <attvalue for=\"{id}\" value=\"{}\"/>",
                    escape(query)
                );
            }
        }
        doc.push_str("        </attvalues>\n");
        let _ = writeln!(
            doc,
            "        <viz:position x=\"{:.6}\" y=\"{:.6}\"/>",
            node.x, node.y
        );
        let _ = writeln!(doc, "        <viz:size value=\"{:.1}\"/>", node.size);
        let _ = writeln!(
            doc,
            "        <viz:shape value=\"{}\"/>",
            node.shape.as_str()
        );
        doc.push_str("      </node>\n");
    }
    doc.push_str("    </nodes>\n");

    doc.push_str("    <edges>\n");
    for (idx, ((source, target), weight)) in graph.edges().enumerate() {
        let _ = writeln!(
            doc,
            "      <edge id=\"{idx}\" source=\"{}\" target=\"{}\" weight=\"{weight}\"/>",
            escape(source),
            escape(target)
        );
    }
    doc.push_str("    </edges>\n");

    doc.push_str("  </graph>\n</gexf>\n");
    doc
}

/// Serialize `graph` to `path` atomically.
pub fn write_gexf(graph: &VizGraph, path: &Path) -> io::Result<()> {
    let document = render(graph);

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    if let Err(source) = fs::write(tmp, document).and_then(|()| fs::rename(tmp, path)) {
        // Best effort: a stale temp file would otherwise accumulate
        let _ = fs::remove_file(tmp);
        return Err(source);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{GraphNode, NodeShape};
    use tempfile::TempDir;

    fn sample_graph() -> VizGraph {
        let mut graph = VizGraph::new();
        let mut user = GraphNode {
            id: "user-1".into(),
            label: "User 1".into(),
            shape: NodeShape::Circle,
            x: 0.25,
            y: -0.5,
            size: 2.0,
            features: IndexMap::new(),
            interaction_history: None,
            filter_feature: None,
            filter_query: None,
        };
        user.features.insert("age".into(), "25".into());
        user.stamp_filter("age", "20-30");
        let mut item = GraphNode {
            id: "item-a".into(),
            label: "Item a".into(),
            shape: NodeShape::Square,
            x: 1.0,
            y: 1.0,
            size: 2.0,
            features: IndexMap::new(),
            interaction_history: None,
            filter_feature: None,
            filter_query: None,
        };
        item.features.insert("type".into(), "b<o>k".into());
        graph.add_node(user);
        graph.add_node(item);
        graph.bump_edge("user-1", "item-a");
        graph
    }

    #[test]
    fn test_written_document_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.gexf");
        write_gexf(&sample_graph(), &path).unwrap();

        let doc = std::fs::read_to_string(&path).unwrap();
        assert!(doc.contains("<gexf xmlns="));
        assert!(doc.contains("<node id=\"user-1\" label=\"User 1\">"));
        assert!(doc.contains("value=\"b&lt;o&gt;k\""));
        assert!(doc.contains("source=\"user-1\" target=\"item-a\" weight=\"1\""));
        assert!(doc.contains("<viz:shape value=\"square\"/>"));
        // Filter stamps are serialized as attributes
        assert!(doc.contains("filter_query"));
        // No temp file left behind
        assert!(!dir.path().join("sample.gexf.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A directory squatting on the target path makes the rename fail
        let path = dir.path().join("sample.gexf");
        std::fs::create_dir(&path).unwrap();

        assert!(write_gexf(&sample_graph(), &path).is_err());
        assert!(!dir.path().join("sample.gexf.tmp").exists());
    }
}

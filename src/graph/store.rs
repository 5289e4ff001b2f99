//! In-memory attributed graph storage.
//!
//! An undirected simple graph between user and item nodes. Parallel
//! interactions collapse into one edge whose integer weight counts them.

use super::node::GraphNode;
use indexmap::IndexMap;

/// Edge key: `(user-node-id, item-node-id)`. The graph is bipartite, so the
/// orientation of the pair is fixed and no normalization is needed.
pub type EdgeKey = (String, String);

/// Attributed visualization graph.
///
/// Insertion order of nodes and edges is preserved so that a given build
/// always serializes identically.
#[derive(Debug, Default)]
pub struct VizGraph {
    nodes: IndexMap<String, GraphNode>,
    edges: IndexMap<EdgeKey, u32>,
}

impl VizGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any previous node under the same id (the
    /// replacement carries the freshest filter stamps).
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Accumulate an edge: weight 1 on first sight, +1 on every replay of
    /// the same pair. A single get-or-default-then-increment, so no
    /// check-then-add window can lose a count.
    pub fn bump_edge(&mut self, user_node_id: &str, item_node_id: &str) {
        let key = (user_node_id.to_string(), item_node_id.to_string());
        *self.edges.entry(key).or_insert(0) += 1;
    }

    pub fn edge_weight(&self, user_node_id: &str, item_node_id: &str) -> Option<u32> {
        self.edges
            .get(&(user_node_id.to_string(), item_node_id.to_string()))
            .copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut GraphNode> {
        self.nodes.values_mut()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, u32)> {
        self.edges.iter().map(|(key, &weight)| (key, weight))
    }

    /// Dense index of a node id, matching the order `nodes()` yields.
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    /// Node id at a dense index.
    pub fn node_id_at(&self, index: usize) -> Option<&str> {
        self.nodes.get_index(index).map(|(id, _)| id.as_str())
    }

    /// Edge list over dense node indices, for projection into the
    /// algorithms' `GraphView`.
    pub fn indexed_edges(&self) -> Vec<(usize, usize, f64)> {
        self.edges
            .iter()
            .filter_map(|((user, item), &weight)| {
                let u = self.nodes.get_index_of(user.as_str())?;
                let v = self.nodes.get_index_of(item.as_str())?;
                Some((u, v, weight as f64))
            })
            .collect()
    }

    /// Cache-artifact hygiene: drop the raw interaction history from every
    /// node before the graph is serialized.
    pub fn strip_interaction_history(&mut self) {
        for node in self.nodes.values_mut() {
            node.interaction_history = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::NodeShape;
    use indexmap::IndexMap;

    fn node(id: &str, shape: NodeShape) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            shape,
            x: 1.0,
            y: 1.0,
            size: 2.0,
            features: IndexMap::new(),
            interaction_history: None,
            filter_feature: None,
            filter_query: None,
        }
    }

    #[test]
    fn test_edge_weight_accumulates() {
        let mut graph = VizGraph::new();
        graph.add_node(node("user-1", NodeShape::Circle));
        graph.add_node(node("item-a", NodeShape::Square));

        for _ in 0..3 {
            graph.bump_edge("user-1", "item-a");
        }

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_weight("user-1", "item-a"), Some(3));
    }

    #[test]
    fn test_add_node_replaces() {
        let mut graph = VizGraph::new();
        graph.add_node(node("user-1", NodeShape::Circle));
        let mut stamped = node("user-1", NodeShape::Circle);
        stamped.stamp_filter("age", "25");
        graph.add_node(stamped);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(
            graph.get_node("user-1").unwrap().filter_query.as_deref(),
            Some("25")
        );
    }

    #[test]
    fn test_indexed_edges_align_with_node_order() {
        let mut graph = VizGraph::new();
        graph.add_node(node("user-1", NodeShape::Circle));
        graph.add_node(node("item-a", NodeShape::Square));
        graph.bump_edge("user-1", "item-a");
        graph.bump_edge("user-1", "item-a");

        assert_eq!(graph.indexed_edges(), vec![(0, 1, 2.0)]);
        assert_eq!(graph.node_id_at(0), Some("user-1"));
        assert_eq!(graph.node_index("item-a"), Some(1));
    }
}

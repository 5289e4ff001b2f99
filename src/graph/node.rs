//! Graph node representation: a dataset record plus synthesized
//! visualization attributes.

use crate::dataset::{Dataset, InteractionEvent, ItemRecord, UserRecord};
use indexmap::IndexMap;

/// Marker shape rendered for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// Users
    Circle,
    /// Items
    Square,
}

impl NodeShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeShape::Circle => "circle",
            NodeShape::Square => "square",
        }
    }
}

/// A user or item node of the visualization graph.
///
/// Derived from a dataset record at build time; the dataset itself is never
/// mutated. Positions start at `(1, 1)` and are overwritten by the layout
/// stage.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Namespaced node id: `user-<id>` or `item-<id>`
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Copied feature map, rendered as attributes in the interchange file
    pub features: IndexMap<String, String>,
    /// Raw interaction history (users only); stripped before persistence
    pub interaction_history: Option<Vec<InteractionEvent>>,
    /// Filter stamp: the feature a filter expression matched on
    pub filter_feature: Option<String>,
    /// Filter stamp: the expression that matched
    pub filter_query: Option<String>,
}

impl GraphNode {
    pub fn from_user(dataset: &Dataset, user: &UserRecord) -> Self {
        GraphNode {
            id: format!("user-{}", user.id),
            label: format!("User {}", user.id),
            shape: NodeShape::Circle,
            x: 1.0,
            y: 1.0,
            size: 2.0,
            features: dataset.user_node_features(user),
            interaction_history: Some(user.interaction_history.clone()),
            filter_feature: None,
            filter_query: None,
        }
    }

    pub fn from_item(item: &ItemRecord) -> Self {
        GraphNode {
            id: format!("item-{}", item.id),
            label: format!("Item {}", item.id),
            shape: NodeShape::Square,
            x: 1.0,
            y: 1.0,
            size: 2.0,
            features: item.features.clone(),
            interaction_history: None,
            filter_feature: None,
            filter_query: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.shape == NodeShape::Circle
    }

    /// Raw value of a feature, if present.
    pub fn feature(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(String::as_str)
    }

    /// Record which filter expression included this node.
    pub fn stamp_filter(&mut self, feature: &str, query: &str) {
        self.filter_feature = Some(feature.to_string());
        self.filter_query = Some(query.to_string());
    }
}

//! Graph assembly, layout, community annotation and persistence.

pub mod builder;
pub mod gexf;
pub mod node;
pub mod store;

pub use builder::{
    BuildFailureError, BuildMode, BuildResult, BuiltGraph, FilterSpec, GraphBuilder,
};
pub use node::{GraphNode, NodeShape};
pub use store::VizGraph;

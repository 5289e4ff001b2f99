//! Graph assembly pipeline: node preparation, filter matching, interaction
//! replay, layout, community detection and persistence.

use super::gexf;
use super::node::GraphNode;
use super::store::VizGraph;
use crate::config::LayoutBackend;
use crate::dataset::Dataset;
use indexmap::IndexMap;
use recviz_graph_algorithms::{
    circular_layout, force_directed, force_directed_parallel, louvain, GraphView, LayoutConfig,
};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Filter specification: feature name → ordered filter expressions.
///
/// Matching is a union across all features and all expressions: a node is
/// included when *any* expression on *any* feature matches it. This
/// inclusive semantics is deliberate; do not tighten it to an intersection.
pub type FilterSpec = BTreeMap<String, Vec<String>>;

/// Whether a build persists its interchange artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Persist,
    /// Used by callers that only need the community partition
    SkipPersist,
}

/// Failures of the build pipeline. None of these are fatal to the process;
/// the cache declines to register the key so a later request retries fresh.
#[derive(Error, Debug)]
pub enum BuildFailureError {
    #[error("{stage} stage exceeded the {seconds}s budget")]
    StageTimeout { stage: &'static str, seconds: u64 },

    #[error("{stage} stage worker terminated abnormally")]
    StageFailed { stage: &'static str },

    #[error("cannot persist graph to '{path}': {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type BuildResult<T> = Result<T, BuildFailureError>;

/// One filter expression, parsed.
enum FilterExpr<'a> {
    /// Inclusive integer range `lo-hi`
    Range(i64, i64),
    /// Exact string equality
    Equals(&'a str),
}

impl<'a> FilterExpr<'a> {
    /// `None` means the expression is skipped entirely (a range whose bounds
    /// do not parse never degrades into an equality match).
    fn parse(query: &'a str) -> Option<Self> {
        if query.contains('-') {
            let mut parts = query.splitn(2, '-');
            let lo = parts.next()?.parse::<i64>().ok()?;
            let hi = parts.next()?.parse::<i64>().ok()?;
            Some(FilterExpr::Range(lo, hi))
        } else {
            Some(FilterExpr::Equals(query))
        }
    }

    /// Match against a raw feature value. A value that does not parse as an
    /// integer simply fails a range expression; it never errors.
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            FilterExpr::Range(lo, hi) => value
                .parse::<i64>()
                .map(|v| *lo <= v && v <= *hi)
                .unwrap_or(false),
            FilterExpr::Equals(query) => value == *query,
        }
    }
}

/// A fully built graph artifact.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph_key: String,
    pub dataset_name: String,
    pub graph: VizGraph,
    /// User-node id → community index
    partition: FxHashMap<String, usize>,
    gexf_path: Option<PathBuf>,
    ready: bool,
}

impl BuiltGraph {
    /// Community partition restricted to user nodes.
    pub fn louvain_parts(&self) -> &FxHashMap<String, usize> {
        &self.partition
    }

    /// Path of the persisted interchange file, when this build wrote one.
    pub fn gexf_path(&self) -> Option<&Path> {
        self.gexf_path.as_deref()
    }

    /// True only once the interchange file is fully written (or the build
    /// ran in skip-persistence mode and completed).
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Builds attributed, laid-out, community-annotated graphs from a dataset
/// and an optional filter specification.
pub struct GraphBuilder {
    cache_dir: PathBuf,
    backend: LayoutBackend,
    layout: LayoutConfig,
    stage_timeout: Duration,
}

impl GraphBuilder {
    pub fn new(cache_dir: impl Into<PathBuf>, backend: LayoutBackend) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            backend,
            layout: LayoutConfig::default(),
            stage_timeout: Duration::from_secs(120),
        }
    }

    /// Override the simulation parameters (tests use few iterations).
    pub fn with_layout_config(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Override the per-stage budget for layout and community detection.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Run the full pipeline: assemble → layout → community detection →
    /// persist (unless skipped).
    pub fn build(
        &self,
        dataset: &Dataset,
        filters: Option<&FilterSpec>,
        graph_key: &str,
        mode: BuildMode,
    ) -> BuildResult<BuiltGraph> {
        let mut user_nodes: IndexMap<String, GraphNode> = dataset
            .users()
            .values()
            .map(|user| (user.id.clone(), GraphNode::from_user(dataset, user)))
            .collect();
        let mut item_nodes: IndexMap<String, GraphNode> = dataset
            .items()
            .values()
            .map(|item| (item.id.clone(), GraphNode::from_item(item)))
            .collect();

        let mut graph = VizGraph::new();
        match filters {
            Some(filters) if !filters.is_empty() => {
                assemble_filtered(dataset, filters, &mut user_nodes, &mut item_nodes, &mut graph)
            }
            _ => assemble_unfiltered(dataset, &user_nodes, &item_nodes, &mut graph),
        }
        info!(
            key = graph_key,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "assembled graph"
        );

        self.run_layout(&mut graph)?;

        // A fixed per-key seed keeps rebuilds of one fingerprint comparable
        let mut hasher = FxHasher::default();
        graph_key.hash(&mut hasher);
        let partition = self.detect_communities(&graph, hasher.finish())?;

        let mut built = BuiltGraph {
            graph_key: graph_key.to_string(),
            dataset_name: dataset.name().to_string(),
            graph,
            partition,
            gexf_path: None,
            ready: false,
        };

        match mode {
            BuildMode::SkipPersist => {
                built.ready = true;
            }
            BuildMode::Persist => {
                built.graph.strip_interaction_history();
                let path = self.cache_dir.join(format!("{graph_key}.gexf"));
                gexf::write_gexf(&built.graph, &path).map_err(|source| {
                    BuildFailureError::Persist {
                        path: path.clone(),
                        source,
                    }
                })?;
                info!(key = graph_key, path = %path.display(), "wrote graph artifact");
                built.gexf_path = Some(path);
                built.ready = true;
            }
        }
        Ok(built)
    }

    /// Deterministic circular baseline, then force-directed refinement on
    /// the configured backend. Runs under the stage budget.
    fn run_layout(&self, graph: &mut VizGraph) -> BuildResult<()> {
        let n = graph.node_count();
        if n == 0 {
            return Ok(());
        }

        let initial = circular_layout(n);
        for (node, &(x, y)) in graph.nodes_mut().zip(&initial) {
            node.x = x;
            node.y = y;
        }

        let view = GraphView::from_edges(n, &graph.indexed_edges());
        let cfg = self.layout.clone();
        let backend = self.backend;
        let positions = run_stage("layout", self.stage_timeout, move || match backend {
            LayoutBackend::Cpu => force_directed(&view, &initial, &cfg),
            LayoutBackend::Parallel => force_directed_parallel(&view, &initial, &cfg),
        })?;

        for (node, (x, y)) in graph.nodes_mut().zip(positions) {
            node.x = x;
            node.y = y;
        }
        Ok(())
    }

    /// Louvain over the full graph; only user nodes are reported.
    fn detect_communities(
        &self,
        graph: &VizGraph,
        seed: u64,
    ) -> BuildResult<FxHashMap<String, usize>> {
        let n = graph.node_count();
        if n == 0 {
            return Ok(FxHashMap::default());
        }

        let view = GraphView::from_edges(n, &graph.indexed_edges());
        let parts = run_stage("community detection", self.stage_timeout, move || {
            louvain(&view, seed)
        })?;

        let mut partition = FxHashMap::default();
        for (idx, node) in graph.nodes().enumerate() {
            if node.is_user() {
                partition.insert(node.id.clone(), parts[idx]);
            }
        }
        Ok(partition)
    }
}

/// No filters: every node, then every well-formed interaction.
fn assemble_unfiltered(
    dataset: &Dataset,
    user_nodes: &IndexMap<String, GraphNode>,
    item_nodes: &IndexMap<String, GraphNode>,
    graph: &mut VizGraph,
) {
    for node in user_nodes.values() {
        graph.add_node(node.clone());
    }
    for node in item_nodes.values() {
        graph.add_node(node.clone());
    }

    for events in dataset.interactions().values() {
        for event in events {
            let (Some(user_id), Some(item_id)) = (event.get("user_id"), event.get("item_id"))
            else {
                continue;
            };
            let (Some(user_node), Some(item_node)) =
                (user_nodes.get(user_id), item_nodes.get(item_id))
            else {
                debug!(user_id, item_id, "interaction references unknown id, skipping");
                continue;
            };
            graph.bump_edge(&user_node.id, &item_node.id);
        }
    }
}

/// With filters: stamp and include matching nodes (users enter the graph
/// immediately), then replay interactions against the inclusion sets. An
/// empty item set means "no item constraint".
fn assemble_filtered(
    dataset: &Dataset,
    filters: &FilterSpec,
    user_nodes: &mut IndexMap<String, GraphNode>,
    item_nodes: &mut IndexMap<String, GraphNode>,
    graph: &mut VizGraph,
) {
    let mut users_included: FxHashSet<String> = FxHashSet::default();
    let mut items_included: FxHashSet<String> = FxHashSet::default();

    for (feature, queries) in filters {
        for query in queries {
            let Some(expr) = FilterExpr::parse(query) else {
                debug!(feature, query, "unparsable range expression, skipping");
                continue;
            };

            for (user_id, node) in user_nodes.iter_mut() {
                if expr.matches(node.feature(feature)) {
                    node.stamp_filter(feature, query);
                    users_included.insert(user_id.clone());
                    graph.add_node(node.clone());
                }
            }
            for (item_id, node) in item_nodes.iter_mut() {
                if expr.matches(node.feature(feature)) {
                    node.stamp_filter(feature, query);
                    items_included.insert(item_id.clone());
                }
            }
        }
    }

    for events in dataset.interactions().values() {
        for event in events {
            let (Some(user_id), Some(item_id)) = (event.get("user_id"), event.get("item_id"))
            else {
                continue;
            };
            if !users_included.contains(user_id) {
                continue;
            }
            if !items_included.is_empty() && !items_included.contains(item_id) {
                continue;
            }
            let (Some(user_node), Some(item_node)) =
                (user_nodes.get(user_id), item_nodes.get(item_id))
            else {
                debug!(user_id, item_id, "interaction references unknown id, skipping");
                continue;
            };
            if !graph.contains_node(&item_node.id) {
                graph.add_node(item_node.clone());
            }
            graph.bump_edge(&user_node.id, &item_node.id);
        }
    }
}

/// Run a pipeline stage on a worker thread under a budget. There is no
/// mid-build cancellation: on timeout the worker runs to completion
/// detached, but its result is discarded.
fn run_stage<T: Send + 'static>(
    stage: &'static str,
    timeout: Duration,
    job: impl FnOnce() -> T + Send + 'static,
) -> BuildResult<T> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(job());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => Ok(result),
        Err(RecvTimeoutError::Timeout) => Err(BuildFailureError::StageTimeout {
            stage,
            seconds: timeout.as_secs(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(BuildFailureError::StageFailed { stage }),
    }
}

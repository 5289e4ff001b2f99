use anyhow::Context;
use recviz::cache::GraphCache;
use recviz::config::RecvizConfig;
use recviz::dataset::DatasetCatalog;
use recviz::graph::GraphBuilder;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("RecViz core v{}", recviz::version());

    let config = RecvizConfig::from_env().context("startup configuration")?;
    info!(
        dataset_root = %config.dataset_root.display(),
        cache_dir = %config.cache_dir.display(),
        backend = ?config.backend,
        "configuration loaded"
    );

    let catalog = DatasetCatalog::scan(&config.dataset_root).context("catalog scan")?;
    for name in catalog.dataset_names() {
        let models = catalog.model_names(name).unwrap_or_default();
        info!(dataset = name, models = ?models, "dataset available");
    }

    let builder = GraphBuilder::new(&config.cache_dir, config.backend);
    let cache = GraphCache::new(&config.cache_dir, builder).context("graph cache startup")?;
    info!(cached = cache.keys().len(), "cache primed");

    // Optional eager build: `recviz <dataset-name>` warms the unfiltered
    // graph for one dataset before any client asks for it.
    if let Some(name) = std::env::args().nth(1) {
        info!(dataset = name, "eager build requested");
        let entry = cache.get_graph(&catalog, &name, None)?;
        info!(dataset = name, entry = ?entry, "eager build complete");
    }

    Ok(())
}

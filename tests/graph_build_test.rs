use recviz::config::LayoutBackend;
use recviz::dataset::{Dataset, DatasetFiles};
use recviz::graph::{BuildMode, FilterSpec, GraphBuilder};
use recviz_graph_algorithms::LayoutConfig;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn minimal_dataset(dir: &TempDir) -> Dataset {
    fs::write(dir.path().join("d.user"), "user_id\tage:age\n1\t25\n").unwrap();
    fs::write(dir.path().join("d.item"), "item_id\ttype:type\nitem1\tbook\n").unwrap();
    fs::write(
        dir.path().join("d.inter"),
        "user_id\titem_id\ttimestamp:ts\n1\titem1\t1743179400\n",
    )
    .unwrap();
    let files = DatasetFiles {
        user_files: vec!["d.user".into()],
        item_files: vec!["d.item".into()],
        inter_files: vec!["d.inter".into()],
    };
    Dataset::load(dir.path(), "mini", &files).unwrap()
}

fn test_builder(cache_dir: &TempDir, backend: LayoutBackend) -> GraphBuilder {
    GraphBuilder::new(cache_dir.path(), backend).with_layout_config(LayoutConfig {
        iterations: 25,
        ..LayoutConfig::default()
    })
}

#[test]
fn test_unfiltered_build_end_to_end() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder.build(&ds, None, "mini", BuildMode::Persist).unwrap();

    assert!(built.is_ready());
    assert_eq!(built.graph.node_count(), 2);
    assert_eq!(built.graph.edge_count(), 1);
    assert_eq!(built.graph.edge_weight("user-1", "item-item1"), Some(1));

    let path = built.gexf_path().unwrap();
    assert!(path.exists());
    assert!(path.ends_with("mini.gexf"));
    // Cache-artifact hygiene: the raw history never reaches disk
    let doc = fs::read_to_string(path).unwrap();
    assert!(doc.contains("user-1"));
    for node in built.graph.nodes() {
        assert!(node.interaction_history.is_none());
    }
}

#[test]
fn test_edge_weight_counts_interactions() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(data_dir.path().join("d.user"), "user_id\tage:age\n1\t25\n").unwrap();
    fs::write(
        data_dir.path().join("d.item"),
        "item_id\ttype:type\nitem1\tbook\n",
    )
    .unwrap();
    let mut inter = String::from("user_id\titem_id\ttimestamp:ts\n");
    for ts in 0..5 {
        inter.push_str(&format!("1\titem1\t174317940{ts}\n"));
    }
    fs::write(data_dir.path().join("d.inter"), inter).unwrap();
    let files = DatasetFiles {
        user_files: vec!["d.user".into()],
        item_files: vec!["d.item".into()],
        inter_files: vec!["d.inter".into()],
    };
    let ds = Dataset::load(data_dir.path(), "mini", &files).unwrap();

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, None, "mini", BuildMode::SkipPersist)
        .unwrap();

    // Replaying N interactions of one pair yields weight exactly N
    assert_eq!(built.graph.edge_weight("user-1", "item-item1"), Some(5));
    assert_eq!(built.graph.edge_count(), 1);
}

#[test]
fn test_range_filter_includes_user_and_replays_item() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let mut filters: FilterSpec = BTreeMap::new();
    filters.insert("age".into(), vec!["20-30".into()]);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, Some(&filters), "mini_age", BuildMode::SkipPersist)
        .unwrap();

    // User 1 matches the range; item1 arrives via the interaction replay
    // because no item matched any filter (empty set = no constraint)
    assert_eq!(built.graph.node_count(), 2);
    assert_eq!(built.graph.edge_weight("user-1", "item-item1"), Some(1));

    let user = built.graph.get_node("user-1").unwrap();
    assert_eq!(user.filter_feature.as_deref(), Some("age"));
    assert_eq!(user.filter_query.as_deref(), Some("20-30"));
    // The replayed item carries no stamp
    let item = built.graph.get_node("item-item1").unwrap();
    assert!(item.filter_feature.is_none());
}

#[test]
fn test_filter_excludes_out_of_range_user() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let mut filters: FilterSpec = BTreeMap::new();
    filters.insert("age".into(), vec!["30-40".into()]);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, Some(&filters), "mini_age2", BuildMode::SkipPersist)
        .unwrap();

    assert_eq!(built.graph.node_count(), 0);
    assert_eq!(built.graph.edge_count(), 0);
}

#[test]
fn test_filter_union_across_features() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(
        data_dir.path().join("d.user"),
        "user_id\tage:age\tcity:city\n1\t25\tberlin\n2\t55\tberlin\n3\t60\toslo\n",
    )
    .unwrap();
    fs::write(
        data_dir.path().join("d.item"),
        "item_id\ttype:type\nitem1\tbook\n",
    )
    .unwrap();
    fs::write(
        data_dir.path().join("d.inter"),
        "user_id\titem_id\ttimestamp:ts\n1\titem1\t100\n2\titem1\t101\n3\titem1\t102\n",
    )
    .unwrap();
    let files = DatasetFiles {
        user_files: vec!["d.user".into()],
        item_files: vec!["d.item".into()],
        inter_files: vec!["d.inter".into()],
    };
    let ds = Dataset::load(data_dir.path(), "multi", &files).unwrap();

    // User 1 matches the age range, user 2 matches city equality (union);
    // user 1 matches only once despite also living in berlin
    let mut filters: FilterSpec = BTreeMap::new();
    filters.insert("age".into(), vec!["20-30".into()]);
    filters.insert("city".into(), vec!["berlin".into()]);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, Some(&filters), "multi_k", BuildMode::SkipPersist)
        .unwrap();

    assert!(built.graph.contains_node("user-1"));
    assert!(built.graph.contains_node("user-2"));
    assert!(!built.graph.contains_node("user-3"));
    assert_eq!(built.graph.edge_weight("user-1", "item-item1"), Some(1));
    assert_eq!(built.graph.edge_weight("user-2", "item-item1"), Some(1));
}

#[test]
fn test_unparsable_range_contributes_no_matches() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let mut filters: FilterSpec = BTreeMap::new();
    filters.insert("age".into(), vec!["two-dozen".into()]);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, Some(&filters), "mini_bad", BuildMode::SkipPersist)
        .unwrap();
    assert_eq!(built.graph.node_count(), 0);
}

#[test]
fn test_partition_reports_only_user_nodes() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, None, "mini", BuildMode::SkipPersist)
        .unwrap();

    let parts = built.louvain_parts();
    assert!(!parts.is_empty());
    for key in parts.keys() {
        assert!(key.starts_with("user-"), "unexpected partition key {key}");
    }
}

#[test]
fn test_layout_overwrites_initial_positions() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, None, "mini", BuildMode::SkipPersist)
        .unwrap();

    for node in built.graph.nodes() {
        assert!(node.x.is_finite() && node.y.is_finite());
        // Nobody is left on the (1, 1) placeholder
        assert!((node.x, node.y) != (1.0, 1.0));
    }
}

#[test]
fn test_parallel_backend_same_shape() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let cpu = test_builder(&cache_dir, LayoutBackend::Cpu)
        .build(&ds, None, "mini_cpu", BuildMode::SkipPersist)
        .unwrap();
    let par = test_builder(&cache_dir, LayoutBackend::Parallel)
        .build(&ds, None, "mini_par", BuildMode::SkipPersist)
        .unwrap();

    assert_eq!(cpu.graph.node_count(), par.graph.node_count());
    assert_eq!(cpu.louvain_parts().len(), par.louvain_parts().len());
}

#[test]
fn test_skip_persist_writes_nothing() {
    let data_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let ds = minimal_dataset(&data_dir);

    let builder = test_builder(&cache_dir, LayoutBackend::Cpu);
    let built = builder
        .build(&ds, None, "mini", BuildMode::SkipPersist)
        .unwrap();

    assert!(built.is_ready());
    assert!(built.gexf_path().is_none());
    assert_eq!(fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}

use recviz::dataset::{Dataset, DatasetFiles};
use std::fs;
use tempfile::TempDir;

fn fixture() -> (TempDir, DatasetFiles) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("users.user"), "user_id\tage:age\n1\t25\n").unwrap();
    fs::write(
        dir.path().join("items.item"),
        "item_id\ttype:type\nitem1\tbook\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("interactions.inter"),
        "user_id\titem_id\ttimestamp:ts\n1\titem1\t1743179400\n",
    )
    .unwrap();
    let files = DatasetFiles {
        user_files: vec!["users.user".into()],
        item_files: vec!["items.item".into()],
        inter_files: vec!["interactions.inter".into()],
    };
    (dir, files)
}

fn load() -> (TempDir, Dataset) {
    let (dir, files) = fixture();
    let ds = Dataset::load(dir.path(), "test_dataset", &files).unwrap();
    (dir, ds)
}

#[test]
fn test_validity() {
    let (_dir, ds) = load();
    assert!(ds.valid());
}

#[test]
fn test_user_ids() {
    let (_dir, ds) = load();
    assert_eq!(ds.user_ids(), ["1"]);
}

#[test]
fn test_user_mapping_contains_user() {
    let (_dir, ds) = load();
    assert!(ds.users().contains_key("1"));
}

#[test]
fn test_user_history_length() {
    let (_dir, ds) = load();
    assert_eq!(ds.users()["1"].history_length, 1);
}

#[test]
fn test_user_interaction_history_length() {
    let (_dir, ds) = load();
    assert_eq!(ds.users()["1"].interaction_history.len(), 1);
}

#[test]
fn test_user_features_contains_default() {
    let (_dir, ds) = load();
    assert!(ds.user_features().contains(&"user_history_length".to_string()));
}

#[test]
fn test_user_features_contains_age() {
    let (_dir, ds) = load();
    assert!(ds.user_features().contains(&"age".to_string()));
}

#[test]
fn test_item_ids() {
    let (_dir, ds) = load();
    assert_eq!(ds.item_ids(), ["item1"]);
}

#[test]
fn test_item_mapping_feature() {
    let (_dir, ds) = load();
    assert_eq!(ds.items()["item1"].feature("type"), Some("book"));
}

#[test]
fn test_interaction_history_contains_timestamp() {
    let (_dir, ds) = load();
    assert!(ds.interactions().contains_key("1743179400"));
}

#[test]
fn test_timestamps() {
    let (_dir, ds) = load();
    assert_eq!(ds.timestamps(), ["1743179400"]);
}

#[test]
fn test_dataset_name() {
    let (_dir, ds) = load();
    assert_eq!(ds.name(), "test_dataset");
}

#[test]
fn test_timestamps_sorted_across_files() {
    let (dir, mut files) = fixture();
    fs::write(
        dir.path().join("more.inter"),
        "user_id\titem_id\ttimestamp:ts\n1\titem1\t1743179100\n",
    )
    .unwrap();
    files.inter_files.push("more.inter".into());

    let ds = Dataset::load(dir.path(), "test_dataset", &files).unwrap();
    assert_eq!(ds.timestamps(), ["1743179100", "1743179400"]);
    // Both interactions hit the same user
    assert_eq!(ds.users()["1"].history_length, 2);
}

#[test]
fn test_collaborator_boundary_accessors() {
    let (_dir, ds) = load();
    // Similarity collaborator: ordered item references per user
    let history = ds.user_history("1").unwrap();
    assert_eq!(history[0].get("item_id"), Some("item1"));
    // Inference collaborator: display labels
    assert_eq!(ds.item_label("item1", "type"), "book");
    assert_eq!(ds.features().first().map(String::as_str), Some("user_history_length"));
}

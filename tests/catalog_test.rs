use recviz::dataset::DatasetCatalog;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_namespace(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("data.user"), "user_id\tage:age\n1\t25\n2\t40\n").unwrap();
    fs::write(dir.join("data.item"), "item_id\ttype:type\nitem1\tbook\n").unwrap();
    fs::write(
        dir.join("data.inter"),
        "user_id\titem_id\ttimestamp:ts\n1\titem1\t1743179400\n",
    )
    .unwrap();
}

#[test]
fn test_scan_registers_valid_dataset() {
    let root = TempDir::new().unwrap();
    write_namespace(root.path(), "ml-tiny");

    let catalog = DatasetCatalog::scan(root.path()).unwrap();
    assert_eq!(catalog.dataset_names(), ["ml-tiny"]);
    assert!(catalog.get("ml-tiny").is_some());
}

#[test]
fn test_unknown_dataset_is_none_not_error() {
    let root = TempDir::new().unwrap();
    let catalog = DatasetCatalog::scan(root.path()).unwrap();
    assert!(catalog.get("nope").is_none());
    assert!(catalog.model_names("nope").is_none());
}

#[test]
fn test_namespace_without_item_files_is_skipped() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("users-only");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("data.user"), "user_id\tage:age\n1\t25\n").unwrap();

    let catalog = DatasetCatalog::scan(root.path()).unwrap();
    assert!(catalog.dataset_names().is_empty());
}

#[test]
fn test_invalid_dataset_is_not_registered() {
    let root = TempDir::new().unwrap();
    // Users and items but no interactions: loads, but never valid
    let dir = root.path().join("no-inter");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("data.user"), "user_id\tage:age\n1\t25\n").unwrap();
    fs::write(dir.join("data.item"), "item_id\ttype:type\nitem1\tbook\n").unwrap();

    let catalog = DatasetCatalog::scan(root.path()).unwrap();
    assert!(catalog.dataset_names().is_empty());
}

#[test]
fn test_broken_namespace_does_not_abort_scan() {
    let root = TempDir::new().unwrap();
    write_namespace(root.path(), "good");

    let bad = root.path().join("bad");
    fs::create_dir_all(&bad).unwrap();
    fs::write(bad.join("data.user"), "user_id\tage:age\n1\n").unwrap();
    fs::write(bad.join("data.item"), "item_id\ttype:type\nitem1\tbook\n").unwrap();

    let catalog = DatasetCatalog::scan(root.path()).unwrap();
    assert_eq!(catalog.dataset_names(), ["good"]);
}

#[test]
fn test_model_artifacts_are_indexed_lazily() {
    let root = TempDir::new().unwrap();
    write_namespace(root.path(), "ml-tiny");
    let models = root.path().join("ml-tiny").join("models");
    fs::create_dir_all(&models).unwrap();
    // Contents are irrelevant; the catalog must index, never load
    fs::write(models.join("BPR.pth"), b"not a real checkpoint").unwrap();
    fs::write(models.join("notes.txt"), b"ignored").unwrap();

    let catalog = DatasetCatalog::scan(root.path()).unwrap();
    assert_eq!(catalog.model_names("ml-tiny").unwrap(), ["BPR.pth"]);

    let bundle = catalog.get("ml-tiny").unwrap();
    assert!(bundle.models["BPR.pth"].ends_with("models/BPR.pth"));
}

#[test]
fn test_missing_root_is_fatal() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nonexistent");
    assert!(DatasetCatalog::scan(&missing).is_err());
}

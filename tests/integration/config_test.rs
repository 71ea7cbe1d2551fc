use procwatch::core::config::Config;
use procwatch::core::process_monitor::{FilterMode, SortMode};
use tempfile::TempDir;

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("procwatch").join("config.json");

    let config = Config {
        refresh_interval_ms: 250,
        default_filter: FilterMode::NonRoot,
        default_sort: SortMode::CpuDesc,
        privileged_owners: vec!["root".to_string(), "daemon".to_string()],
        ..Default::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let loaded = Config::load_from(&temp_dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_corrupt_or_empty_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let corrupt = temp_dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{ not json").unwrap();
    assert_eq!(Config::load_from(&corrupt).unwrap(), Config::default());

    let empty = temp_dir.path().join("empty.json");
    std::fs::write(&empty, "   \n").unwrap();
    assert_eq!(Config::load_from(&empty).unwrap(), Config::default());
}

#[test]
fn test_unknown_fields_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{"pause_duration_ms": 1000, "theme": "dark"}"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.pause_duration_ms, 1000);
    assert_eq!(loaded.refresh_interval_ms, 100);
}

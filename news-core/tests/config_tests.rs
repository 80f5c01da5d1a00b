use std::path::PathBuf;

use news_core::{NewsConfig, DEFAULT_PLACEHOLDER};

#[test]
fn partial_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "api": { "query": "Rust" }, "storage": {} }"#).unwrap();

    let config = NewsConfig::load_from(&path).unwrap();
    assert_eq!(config.api.query, "Rust");
    assert_eq!(config.api.base_url, "https://newsapi.org/v2/");
    assert_eq!(config.api.sort_by, "popularity");
    assert_eq!(config.storage.favorites_file, "favorites.json");
    assert_eq!(config.placeholder, DEFAULT_PLACEHOLDER);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = NewsConfig::default();
    config.api.request_timeout_seconds = 3;
    config.storage.data_dir = Some(dir.path().to_path_buf());
    config.save_to(&path).unwrap();

    let loaded = NewsConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.favorites_path().unwrap(),
        dir.path().join("favorites.json")
    );
}

#[test]
fn broken_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(NewsConfig::load_from(&path).is_err());
    assert!(NewsConfig::load_from(PathBuf::from("/definitely/missing.json")).is_err());
}

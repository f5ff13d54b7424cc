use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use photosweep::config::{Config, ENV_PREFIX};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Figment without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.hash_workers, 4);
}

#[test]
fn test_config_layers() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        "hash_workers = 8\nprogress_interval_ms = 100\nshow_progress = false\n",
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert_eq!(config.hash_workers, 8);
    assert_eq!(config.progress_interval_ms, 100);
    assert!(!config.show_progress);
    assert!(config.color);

    // The environment wins over the file
    std::env::set_var("PHOTOSWEEP_PROGRESS_INTERVAL_MS", "40");
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed(ENV_PREFIX));
    let layered: Config = figment.extract().unwrap();
    std::env::remove_var("PHOTOSWEEP_PROGRESS_INTERVAL_MS");

    assert_eq!(layered.progress_interval_ms, 40);
    assert_eq!(layered.hash_workers, 8);
}

#[test]
fn test_unknown_keys_are_ignored() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "theme = \"dark\"\ncolor = false\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert!(!config.color);
    assert_eq!(config.hash_workers, 4);
}

//! Integration tests for ConfigManager and settings layering
//!
//! These tests verify:
//! - Defaults when no settings file exists
//! - YAML settings file round trip
//! - Environment overrides on top of the file
//! - Settings feeding a Workspace

use camino::Utf8PathBuf;
use control_center::config::SETTINGS_FILE;
use control_center::{AppSettings, ConfigManager, Workspace};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join(SETTINGS_FILE));
}

#[test]
fn test_missing_settings_dir_is_created() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("a/b");

    ConfigManager::new(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_yaml_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE),
        "snapshot_retention: 7\nautosave_debounce_ms: 500\ndocument_title: Lab\n",
    )
    .unwrap();

    let settings = ConfigManager::new(&config_path).unwrap().load_settings().unwrap();

    assert_eq!(settings.snapshot_retention, 7);
    assert_eq!(settings.autosave_debounce_ms, 500);
    assert_eq!(settings.document_title, "Lab");
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(config_path.join(SETTINGS_FILE), "snapshot_retention: [not a number\n").unwrap();

    assert!(ConfigManager::new(&config_path).unwrap().load_settings().is_err());
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(config_path.join(SETTINGS_FILE), "debug_mode: false\n").unwrap();

    let settings = ConfigManager::new(&config_path)
        .unwrap()
        .with_environment([("CC_DEBUG_MODE", "true"), ("CC_SNAPSHOT_RETENTION", "3")])
        .load_settings()
        .unwrap();

    assert!(settings.debug_mode);
    assert_eq!(settings.snapshot_retention, 3);
}

#[test]
fn test_injected_environment_replaces_process_environment() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(config_path.join(SETTINGS_FILE), "autosave_debounce_ms: 750\n").unwrap();

    let settings = ConfigManager::new(&config_path)
        .unwrap()
        .with_environment(Vec::<(String, String)>::new())
        .load_settings()
        .unwrap();

    assert_eq!(settings.autosave_debounce_ms, 750);
    assert!(!settings.debug_mode);
}

#[test]
fn test_settings_drive_workspace() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    manager
        .save_settings(&AppSettings {
            snapshot_retention: 2,
            ..AppSettings::default()
        })
        .unwrap();

    let settings = manager.load_settings().unwrap();
    let workspace = Workspace::open(settings).unwrap();

    assert!(config_path.join("data/configuration.json").exists());
    assert_eq!(workspace.archive().retention(), 2);
    for _ in 0..4 {
        workspace.snapshot(None).unwrap();
    }
    assert_eq!(workspace.archive().list_snapshots().unwrap().len(), 2);
}

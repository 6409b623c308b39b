//! Configuration resolution from a TOML file and command line values.

use media_catalog::config::{AppConfig, CliConfig, FileConfig};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_file_config_drives_resolution() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("catalog.toml");
    fs::write(
        &config_path,
        format!(
            "db_path = {:?}\nmax_backups = 5\n",
            dir.path().join("catalog.db").to_string_lossy()
        ),
    )
    .unwrap();

    let file = FileConfig::load(&config_path).unwrap();
    let config = AppConfig::resolve(&CliConfig::default(), Some(file)).unwrap();

    assert_eq!(config.db_path, dir.path().join("catalog.db"));
    assert_eq!(config.backup_dir, dir.path());
    assert_eq!(config.max_backups, 5);
}

#[test]
fn test_malformed_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("catalog.toml");
    fs::write(&config_path, "db_path = [").unwrap();

    let err = FileConfig::load(&config_path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

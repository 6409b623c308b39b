mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_BACKUPS: usize = 3;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub max_backups: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    /// Snapshots kept in `backup_dir`, older ones are deleted after each backup
    pub max_backups: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified on the command line or in config file")
            })?;

        let db_dir = parent_dir(&db_path);
        if !db_dir.is_dir() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let backup_dir = file
            .backup_dir
            .map(PathBuf::from)
            .or_else(|| cli.backup_dir.clone())
            .unwrap_or_else(|| db_dir.to_path_buf());

        let max_backups = file
            .max_backups
            .or(cli.max_backups)
            .unwrap_or(DEFAULT_MAX_BACKUPS);
        if max_backups == 0 {
            bail!("max_backups must be at least 1");
        }

        Ok(AppConfig {
            db_path,
            backup_dir,
            max_backups,
        })
    }
}

/// Directory holding `path`; a bare file name lives in the current directory.
fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let db_path = temp_dir.path().join("catalog.db");
        let cli = CliConfig {
            db_path: Some(db_path.clone()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.db_path, db_path);
        assert_eq!(config.backup_dir, temp_dir.path());
        assert_eq!(config.max_backups, DEFAULT_MAX_BACKUPS);
    }

    #[test]
    fn test_resolve_file_overrides_cli() {
        let cli_dir = make_temp_db_dir();
        let file_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_path: Some(cli_dir.path().join("cli.db")),
            backup_dir: Some(cli_dir.path().join("cli-backups")),
            max_backups: Some(2),
        };
        let file = FileConfig {
            db_path: Some(file_dir.path().join("file.db").to_string_lossy().into_owned()),
            backup_dir: None,
            max_backups: Some(10),
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.db_path, file_dir.path().join("file.db"));
        // Not set in the file, the CLI value stays
        assert_eq!(config.backup_dir, cli_dir.path().join("cli-backups"));
        assert_eq!(config.max_backups, 10);
    }

    #[test]
    fn test_resolve_requires_db_path() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_path must be specified"));
    }

    #[test]
    fn test_resolve_rejects_missing_parent_dir() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().join("missing").join("catalog.db")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Database directory does not exist"));
    }

    #[test]
    fn test_resolve_rejects_directory_as_db_path() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_resolve_rejects_zero_max_backups() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().join("catalog.db")),
            max_backups: Some(0),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_bare_file_name_lives_in_current_dir() {
        assert_eq!(parent_dir(Path::new("catalog.db")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/data/catalog.db")), Path::new("/data"));
    }
}

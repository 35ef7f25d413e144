// ABOUTME: Parses the optional TOML config file and merges it with CLI flags
// ABOUTME: Precedence is CLI flag, then config file, then built-in default

use crate::utils::validate_mysql_identifier;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_EXPORT_PATH: &str = "./archives";
pub const DEFAULT_LOG_DIR: &str = ".";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub archive: ArchiveSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ArchiveSection {
    pub days: Option<u32>,
    pub export_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

pub fn load_config_from_file(path: &Path) -> Result<ArchiveConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("Failed to parse TOML config at {}", path.display()))
}

/// Load `path` when given, otherwise start from an empty config.
pub fn load_optional_config(path: Option<&Path>) -> Result<ArchiveConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => Ok(ArchiveConfig::default()),
    }
}

impl ArchiveConfig {
    pub fn retention_days(&self, cli: Option<u32>) -> u32 {
        cli.or(self.archive.days).unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    pub fn export_path(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.archive.export_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH))
    }

    pub fn log_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.archive.log_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }
}

/// Connection flags as given on the command line; unset flags are `None`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

/// Fully resolved MySQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectionSettings {
    /// Merge CLI flags over the config file section over defaults.
    ///
    /// The database has no default and must come from one of the two sources.
    pub fn resolve(cli: &ConnectionOverrides, file: &ConnectionSection) -> Result<Self> {
        let database = match cli.database.clone().or_else(|| file.database.clone()) {
            Some(database) => database,
            None => bail!("A database name is required (use --database or [connection].database)"),
        };
        validate_mysql_identifier(&database).context("Invalid database name")?;

        let host = cli
            .host
            .clone()
            .or_else(|| file.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            bail!("Host cannot be empty");
        }

        Ok(Self {
            host,
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            user: cli
                .user
                .clone()
                .or_else(|| file.user.clone())
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: cli
                .password
                .clone()
                .or_else(|| file.password.clone())
                .unwrap_or_default(),
            database,
        })
    }

    /// `user@host:port/database`, safe to log.
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_sample_config() {
        let mut tmp = NamedTempFile::new().unwrap();
        let contents = r#"
            [connection]
            host = "db.internal"
            port = 3307
            user = "archiver"
            password = "s3cret"
            database = "sms"

            [archive]
            days = 30
            export_path = "/var/lib/archives"
            log_dir = "/var/log/archiver"
        "#;
        write!(tmp, "{}", contents).unwrap();

        let config = load_config_from_file(tmp.path()).unwrap();
        assert_eq!(config.connection.host.as_deref(), Some("db.internal"));
        assert_eq!(config.connection.port, Some(3307));
        assert_eq!(config.archive.days, Some(30));
        assert_eq!(
            config.export_path(None),
            PathBuf::from("/var/lib/archives")
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: ArchiveConfig = toml::from_str("").unwrap();
        assert_eq!(config.retention_days(None), DEFAULT_RETENTION_DAYS);
        assert_eq!(config.export_path(None), PathBuf::from(DEFAULT_EXPORT_PATH));
        assert_eq!(config.log_dir(None), PathBuf::from(DEFAULT_LOG_DIR));
    }

    #[test]
    fn test_cli_overrides_file() {
        let config: ArchiveConfig = toml::from_str("[archive]\ndays = 30\n").unwrap();
        assert_eq!(config.retention_days(Some(7)), 7);
        assert_eq!(config.retention_days(None), 30);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "[connection\nhost = ").unwrap();
        let err = load_config_from_file(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_resolve_connection_precedence() {
        let file = ConnectionSection {
            host: Some("file-host".to_string()),
            port: Some(3307),
            user: None,
            password: Some("from-file".to_string()),
            database: Some("filedb".to_string()),
        };
        let cli = ConnectionOverrides {
            host: Some("cli-host".to_string()),
            database: Some("clidb".to_string()),
            ..Default::default()
        };

        let settings = ConnectionSettings::resolve(&cli, &file).unwrap();
        assert_eq!(settings.host, "cli-host");
        assert_eq!(settings.port, 3307);
        assert_eq!(settings.user, DEFAULT_USER);
        assert_eq!(settings.password, "from-file");
        assert_eq!(settings.database, "clidb");
        assert_eq!(settings.target(), "root@cli-host:3307/clidb");
    }

    #[test]
    fn test_resolve_requires_valid_database() {
        let empty = ConnectionSection::default();
        assert!(ConnectionSettings::resolve(&ConnectionOverrides::default(), &empty).is_err());

        let bad = ConnectionOverrides {
            database: Some("shop\0".to_string()),
            ..Default::default()
        };
        assert!(ConnectionSettings::resolve(&bad, &empty).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let cli = ConnectionOverrides {
            password: Some("hunter2".to_string()),
            database: Some("shop".to_string()),
            ..Default::default()
        };
        let settings = ConnectionSettings::resolve(&cli, &ConnectionSection::default()).unwrap();
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::types::StorageBackend;
use crate::error_handling::types::ConfigError;
use crate::storage::DatabaseStorage;
use crate::storage::types::is_valid_segment;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8686;
const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Command-line arguments.
///
/// The configuration file is required; the flags override the matching file
/// entries and can also be given through the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "labelkeep")]
#[command(version)]
#[command(about = "Versioned annotation session server")]
pub struct Args {
    /// Path to the TOML configuration file
    pub config_file: PathBuf,

    /// Port to listen on
    #[arg(long, env = "LABELKEEP_PORT")]
    pub port: Option<u16>,

    /// Root directory of the stored documents
    #[arg(long, env = "LABELKEEP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend, `file` or `database`
    #[arg(long, env = "LABELKEEP_BACKEND")]
    pub backend: Option<StorageBackend>,
}

/// Application configuration that defines all runtime parameters.
///
/// # Fields Overview
/// - `bind_address`: address the HTTP server binds to
/// - `port`: HTTP port
/// - `data_dir`: root of the key namespace (or directory of the SQLite file)
/// - `backend`: which storage implementation to open
/// - `database_file`: SQLite file name, relative to `data_dir`
/// - `default_worker`: worker identity used by the labeling and export flows
/// - `max_body_bytes`: largest accepted request body
///
/// # Examples
///
/// ```toml
/// data_dir = "/var/lib/labelkeep"
/// port = 8686
/// backend = "file"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    pub database_file: String,
    pub default_worker: String,
    pub max_body_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::new(),
            backend: StorageBackend::default(),
            database_file: DatabaseStorage::DEFAULT_DB_FILE.to_string(),
            default_worker: crate::session_management::DEFAULT_WORKER.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Reads and validates the configuration at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Reading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Loads the file named by `args` and applies the flag overrides.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&args.config_file)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(port) = args.port {
            debug!("Overriding port with {}", port);
            self.port = port;
        }
        if let Some(dir) = &args.data_dir {
            debug!("Overriding data_dir with {}", dir.display());
            self.data_dir = dir.clone();
        }
        if let Some(backend) = args.backend {
            debug!("Overriding backend with {}", backend);
            self.backend = backend;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("data_dir must be set".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port must be non-zero".into()));
        }
        if !is_valid_segment(&self.default_worker) {
            return Err(ConfigError::InvalidValue(format!(
                "default_worker `{}` is not a valid key segment",
                self.default_worker
            )));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            ConfigError::InvalidValue(format!("invalid bind_address `{}`", self.bind_address))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = Config::from_toml(r#"data_dir = "/tmp/lk""#).unwrap();
        assert_eq!(config.port, 8686);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.backend, StorageBackend::File);
        assert_eq!(config.default_worker, "default_worker");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/lk/labelkeep.sqlite3"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let file = config_file(
            r#"
            data_dir = "/srv/labels"
            port = 9000
            backend = "database"
            default_worker = "annotator_1"
            "#,
        );
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.backend, StorageBackend::Database);
        assert_eq!(config.default_worker, "annotator_1");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = Config {
            data_dir: PathBuf::from("/tmp"),
            ..Default::default()
        };
        assert!(Config::default().validate().is_err());
        assert!(Config { port: 0, ..base.clone() }.validate().is_err());
        assert!(Config { default_worker: String::new(), ..base.clone() }.validate().is_err());
        assert!(Config { default_worker: "a/b".into(), ..base.clone() }.validate().is_err());
        assert!(Config { bind_address: "nowhere".into(), ..base }.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_and_missing_file() {
        assert!(matches!(Config::from_toml("port = ["), Err(ConfigError::Toml(_))));
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/labelkeep.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    #[serial]
    fn test_cli_flags_override_file() {
        std::env::remove_var("LABELKEEP_PORT");
        std::env::remove_var("LABELKEEP_DATA_DIR");
        std::env::remove_var("LABELKEEP_BACKEND");
        let file = config_file("data_dir = \"/srv/a\"\nport = 9000\n");
        let path = file.path().to_str().unwrap();
        let args = Args::try_parse_from(["labelkeep", path, "--port", "9100", "--backend", "database"])
            .unwrap();
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.backend, StorageBackend::Database);
        assert_eq!(config.data_dir, PathBuf::from("/srv/a"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        std::env::set_var("LABELKEEP_DATA_DIR", "/srv/from-env");
        let file = config_file("data_dir = \"/srv/a\"\n");
        let args = Args::try_parse_from(["labelkeep", file.path().to_str().unwrap()]).unwrap();
        std::env::remove_var("LABELKEEP_DATA_DIR");
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/from-env"));
    }
}

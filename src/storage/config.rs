//! Application configuration.
//!
//! Loaded from `config.toml` in the platform data directory. Every section
//! is optional; missing keys fall back to defaults.

use crate::session::builder::{SessionEntryBuilder, DEFAULT_MAX_NOTE_CHARS};
use crate::storage::backend::{MemoryBackend, SheetBackend};
use crate::storage::csv_file::CsvBackend;
use crate::storage::database::Database;
use crate::storage::http::HttpSheetBackend;
use crate::storage::record_store::{RecordStore, StoreSettings, DEFAULT_WORKSHEET};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Which worksheet backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process memory (lost on exit)
    Memory,
    /// Local SQLite database
    #[default]
    Sqlite,
    /// CSV files in a directory
    Csv,
    /// Remote sheet service
    Http,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Csv => write!(f, "csv"),
            BackendKind::Http => write!(f, "http"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Record store settings
    pub store: StoreConfig,
    /// Known players
    pub roster: Roster,
    /// Entry validation settings
    pub entry: EntrySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            store: StoreConfig::default(),
            roster: Roster::default(),
            entry: EntrySettings::default(),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend kind
    pub backend: BackendKind,
    /// Worksheet holding the log
    pub worksheet: String,
    /// Bound on each backend call in seconds
    pub timeout_secs: u64,
    /// SQLite file (defaults to `<data_dir>/trainlog.db`)
    pub sqlite_path: Option<PathBuf>,
    /// CSV directory (defaults to `<data_dir>/sheets`)
    pub csv_dir: Option<PathBuf>,
    /// Sheet service base URL
    pub http_base_url: Option<String>,
    /// Sheet service bearer token
    pub http_token: Option<String>,
    /// Route appends through the single-writer queue
    pub serialize_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            timeout_secs: 10,
            sqlite_path: None,
            csv_dir: None,
            http_base_url: None,
            http_token: None,
            serialize_writes: true,
        }
    }
}

/// Entry validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrySettings {
    /// Maximum note length in characters
    pub max_note_chars: usize,
}

impl Default for EntrySettings {
    fn default() -> Self {
        Self {
            max_note_chars: DEFAULT_MAX_NOTE_CHARS,
        }
    }
}

/// Known players. Open set: players can be added, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Roster {
    pub players: Vec<String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            players: ["김도영", "양현종", "나성범", "윤영철"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Roster {
    /// Whether the player is on the roster.
    pub fn contains(&self, player_id: &str) -> bool {
        let player_id = player_id.trim();
        self.players.iter().any(|p| p == player_id)
    }

    /// Add a player. Returns false if already present or blank.
    pub fn add(&mut self, player_id: &str) -> bool {
        let player_id = player_id.trim();
        if player_id.is_empty() || self.contains(player_id) {
            return false;
        }
        self.players.push(player_id.to_string());
        true
    }

    /// Players in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(String::as_str)
    }
}

impl AppConfig {
    /// Record store settings derived from this configuration.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            worksheet: self.store.worksheet.clone(),
            timeout: Duration::from_secs(self.store.timeout_secs.max(1)),
        }
    }

    /// Entry builder honoring the configured limits.
    pub fn entry_builder(&self) -> SessionEntryBuilder {
        SessionEntryBuilder::new().with_max_note_chars(self.entry.max_note_chars)
    }

    /// Construct the configured backend.
    ///
    /// The HTTP backend owns a blocking client: call this outside async code.
    pub fn open_backend(&self) -> Result<Arc<dyn SheetBackend>, ConfigError> {
        let backend: Arc<dyn SheetBackend> = match self.store.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::Sqlite => {
                let path = self
                    .store
                    .sqlite_path
                    .clone()
                    .unwrap_or_else(|| self.data_dir.join("trainlog.db"));
                Arc::new(Database::open(&path).map_err(|e| ConfigError::Backend(e.to_string()))?)
            }
            BackendKind::Csv => {
                let dir = self
                    .store
                    .csv_dir
                    .clone()
                    .unwrap_or_else(|| self.data_dir.join("sheets"));
                Arc::new(CsvBackend::new(dir))
            }
            BackendKind::Http => {
                let base_url = self.store.http_base_url.as_deref().ok_or_else(|| {
                    ConfigError::Backend("store.http_base_url is required for http".to_string())
                })?;
                Arc::new(
                    HttpSheetBackend::new(
                        base_url,
                        self.store.http_token.clone(),
                        self.store_settings().timeout,
                    )
                    .map_err(|e| ConfigError::Backend(e.to_string()))?,
                )
            }
        };

        tracing::debug!(backend = %self.store.backend, "Opened worksheet backend");
        Ok(backend)
    }

    /// Construct the configured record store.
    pub fn open_store(&self) -> Result<RecordStore, ConfigError> {
        Ok(RecordStore::new(self.open_backend()?, self.store_settings()))
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "trainlog", "TrainLog")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.data_dir = get_data_dir();
    Ok(config)
}

/// Load configuration from a specific file.
///
/// A missing file yields defaults. The data directory is the file's parent.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let data_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if !path.exists() {
        return Ok(AppConfig {
            data_dir,
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = data_dir;

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to a specific file.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

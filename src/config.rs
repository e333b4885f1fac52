//! On-disk settings: which backend to use, where its data lives, identity
//! provider credentials and logging.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::canvas::SpawnWindow;
use crate::db::Database;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Per-user rows in the relational store, behind sign-in
    #[default]
    Remote,
    /// Two JSON slots on this device, no sign-in
    Local,
}

impl BackendKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Some(Self::Remote),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Log directory; defaults to `<data dir>/ideacanvas/logs`
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub backend: BackendKind,
    /// Database file for the remote backend; defaults next to the config
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Slot directory for the local backend
    #[serde(default)]
    pub local_storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub spawn: SpawnWindow,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            backend: BackendKind::Remote,
            database_path: None,
            local_storage_dir: None,
            spawn: SpawnWindow::default(),
            google: GoogleConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Apply `IDEACANVAS_*` and `GOOGLE_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("IDEACANVAS_BACKEND") {
            match BackendKind::parse(&value) {
                Some(kind) => self.backend = kind,
                None => bail!("IDEACANVAS_BACKEND must be `remote` or `local`, got `{}`", value),
            }
        }
        if let Some(value) = lookup("IDEACANVAS_DB").filter(|v| !v.is_empty()) {
            self.database_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("IDEACANVAS_LOCAL_DIR").filter(|v| !v.is_empty()) {
            self.local_storage_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("GOOGLE_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.google.client_id = Some(value);
        }
        if let Some(value) = lookup("GOOGLE_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.google.client_secret = Some(value);
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Database::default_path()?),
        }
    }

    pub fn local_storage_dir(&self) -> Result<PathBuf> {
        match &self.local_storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("local")),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log.directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("logs")),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("Could not determine data directory")?;
    Ok(dir.join("ideacanvas"))
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("config.json"),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("Could not determine config directory")?;
        dir.push("ideacanvas");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            let config = AppConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut config: AppConfig =
            serde_json::from_str(&raw).context("failed to parse config json")?;
        if self.migrate(&mut config) {
            self.save(&config)?;
        }
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn migrate(&self, config: &mut AppConfig) -> bool {
        if config.schema_version >= CURRENT_SCHEMA_VERSION {
            return false;
        }

        warn!(
            from = config.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating config schema"
        );
        config.schema_version = CURRENT_SCHEMA_VERSION;
        true
    }
}

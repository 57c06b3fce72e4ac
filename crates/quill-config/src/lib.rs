//! Configuration management for Quill.
//!
//! Parses `quill.toml` with serde and discovers it in the working directory
//! or its parents. Relative paths resolve against the directory holding the
//! config file. CLI settings are applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `content.tenant`
//! - `store.database_url`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub source_dir: Option<PathBuf>,
    pub tenant: Option<String>,
    pub database_url: Option<String>,
    pub workers: Option<usize>,
    pub debounce_ms: Option<u64>,
}

const CONFIG_FILENAME: &str = "quill.toml";
const PROJECT_DIR: &str = ".quill";
const DATABASE_FILE: &str = "content.db";
const DEFAULT_SOURCE_DIR: &str = "content";
const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    content: ContentConfigRaw,
    store: StoreConfigRaw,
    pub sync: SyncConfig,
    pub watch: WatchConfig,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Resolved store configuration (set after loading).
    #[serde(skip)]
    pub store_resolved: StoreConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    source_dir: Option<String>,
    tenant: Option<String>,
}

/// Resolved content configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ContentConfig {
    /// Directory holding content files and their sidecars.
    pub source_dir: PathBuf,
    /// Project data directory (`.quill/`).
    pub project_dir: PathBuf,
    /// Tenant the content is synced for.
    pub tenant: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreConfigRaw {
    database_url: Option<String>,
}

/// Resolved store configuration.
#[derive(Debug, Default)]
pub struct StoreConfig {
    /// `sqlx` SQLite connection URL.
    pub database_url: String,
}

/// Sync configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Processing workers; `None` uses the available parallelism.
    pub workers: Option<usize>,
}

/// Watch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after the last change before a sync runs.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`content.tenant`").
        field: String,
        /// Error message (e.g., "${`QUILL_TENANT`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `quill.toml` in the current directory and parents, falling back to
    /// defaults relative to the current directory.
    ///
    /// CLI settings are applied after path resolution, and the result is
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.content_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(tenant) = &settings.tenant {
            self.content_resolved.tenant = Some(tenant.clone());
        }
        if let Some(database_url) = &settings.database_url {
            self.store_resolved.database_url.clone_from(database_url);
        }
        if let Some(workers) = settings.workers {
            self.sync.workers = Some(workers);
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.watch.debounce_ms = debounce_ms;
        }
    }

    /// Tenant to sync for.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no tenant is configured or it is
    /// blank.
    pub fn require_tenant(&self) -> Result<&str, ConfigError> {
        match self.content_resolved.tenant.as_deref() {
            Some(tenant) if !tenant.trim().is_empty() => Ok(tenant),
            _ => Err(ConfigError::Validation(
                "content.tenant is required (set it in quill.toml or pass --tenant)".to_owned(),
            )),
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Default config with paths relative to `base`.
    fn default_with_base(base: &Path) -> Self {
        let project_dir = base.join(PROJECT_DIR);
        Self {
            content: ContentConfigRaw::default(),
            store: StoreConfigRaw::default(),
            sync: SyncConfig::default(),
            watch: WatchConfig::default(),
            content_resolved: ContentConfig {
                source_dir: base.join(DEFAULT_SOURCE_DIR),
                tenant: None,
                project_dir: project_dir.clone(),
            },
            store_resolved: StoreConfig {
                database_url: default_database_url(&project_dir),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.debounce_ms must be greater than 0".to_owned(),
            ));
        }
        if self.sync.workers == Some(0) {
            return Err(ConfigError::Validation(
                "sync.workers must be greater than 0".to_owned(),
            ));
        }
        if !self.store_resolved.database_url.starts_with("sqlite:") {
            return Err(ConfigError::Validation(
                "store.database_url must start with sqlite:".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref tenant) = self.content.tenant {
            self.content.tenant = Some(expand::expand_env(tenant, "content.tenant")?);
        }
        if let Some(ref url) = self.store.database_url {
            self.store.database_url = Some(expand::expand_env(url, "store.database_url")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let project_dir = config_dir.join(PROJECT_DIR);

        self.content_resolved = ContentConfig {
            source_dir: config_dir.join(
                self.content
                    .source_dir
                    .as_deref()
                    .unwrap_or(DEFAULT_SOURCE_DIR),
            ),
            tenant: self.content.tenant.clone(),
            project_dir: project_dir.clone(),
        };

        self.store_resolved = StoreConfig {
            database_url: match &self.store.database_url {
                Some(url) => resolve_database_url(url, config_dir),
                None => default_database_url(&project_dir),
            },
        };
    }
}

fn default_database_url(project_dir: &Path) -> String {
    format!("sqlite://{}", project_dir.join(DATABASE_FILE).display())
}

/// Make the file path of a `sqlite://` URL absolute, relative to `base`.
///
/// In-memory and already absolute URLs are returned unchanged.
fn resolve_database_url(url: &str, base: &Path) -> String {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return url.to_owned();
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    if path.is_empty() || path.starts_with(':') || Path::new(path).is_absolute() {
        return url.to_owned();
    }

    let mut resolved = format!("sqlite://{}", base.join(path).display());
    if let Some(query) = query {
        resolved.push('?');
        resolved.push_str(query);
    }
    resolved
}

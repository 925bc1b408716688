//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PAGECTX_*)
//! 2. TOML config file (if PAGECTX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Persistence backend for the snapshot cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// One `.raw.html` / `.cleaned.html` pair per key under `cache_dir`.
    #[default]
    Fs,
    /// A single SQLite file at `db_path`.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PAGECTX_*)
/// 2. TOML config file (if PAGECTX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which snapshot cache backend to open.
    ///
    /// Set via PAGECTX_CACHE_BACKEND (`fs` or `sqlite`).
    #[serde(default)]
    pub cache_backend: CacheBackendKind,

    /// Root directory of the filesystem cache.
    ///
    /// Set via PAGECTX_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Path to the SQLite cache database.
    ///
    /// Set via PAGECTX_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Character budget for the STEP_HTMLS_CLEANED payload section.
    #[serde(default = "default_step_htmls_budget")]
    pub step_htmls_budget: usize,

    /// Character budget for the CURRENT_PAGE_HTML_CLEANED payload section.
    #[serde(default = "default_current_html_budget")]
    pub current_html_budget: usize,

    /// Text nodes longer than this are truncated by the compactor.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// `data-*` / `test-*` attributes with longer values are dropped.
    #[serde(default = "default_max_data_attr_chars")]
    pub max_data_attr_chars: usize,

    /// `data:` URIs in `href`/`src` longer than this are shortened.
    #[serde(default = "default_max_data_uri_chars")]
    pub max_data_uri_chars: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./pagectx-cache")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pagectx-cache.sqlite")
}

fn default_step_htmls_budget() -> usize {
    500_000
}

fn default_current_html_budget() -> usize {
    200_000
}

fn default_max_text_chars() -> usize {
    500
}

fn default_max_data_attr_chars() -> usize {
    200
}

fn default_max_data_uri_chars() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_backend: CacheBackendKind::Fs,
            cache_dir: default_cache_dir(),
            db_path: default_db_path(),
            step_htmls_budget: default_step_htmls_budget(),
            current_html_budget: default_current_html_budget(),
            max_text_chars: default_max_text_chars(),
            max_data_attr_chars: default_max_data_attr_chars(),
            max_data_uri_chars: default_max_data_uri_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PAGECTX_`
    /// 2. TOML file from `PAGECTX_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PAGECTX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PAGECTX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

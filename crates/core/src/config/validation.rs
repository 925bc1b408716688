//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, CacheBackendKind};
use thiserror::Error;

/// Upper bound for any payload section budget.
const MAX_BUDGET: usize = 10_000_000;

/// Shortened data URIs keep a 50 char prefix plus the truncation marker.
const MIN_DATA_URI_CHARS: usize = 64;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - a budget is 0 or exceeds 10,000,000 characters
    /// - a compaction threshold is 0
    /// - `max_data_uri_chars` is too small to hold a shortened data URI
    /// - the path for the selected backend is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in
            [("step_htmls_budget", self.step_htmls_budget), ("current_html_budget", self.current_html_budget)]
        {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
            if value > MAX_BUDGET {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("must not exceed {MAX_BUDGET} characters"),
                });
            }
        }

        if self.max_text_chars == 0 {
            return Err(ConfigError::Invalid { field: "max_text_chars".into(), reason: "must be greater than 0".into() });
        }
        if self.max_data_attr_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "max_data_attr_chars".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.max_data_uri_chars < MIN_DATA_URI_CHARS {
            return Err(ConfigError::Invalid {
                field: "max_data_uri_chars".into(),
                reason: format!("must be at least {MIN_DATA_URI_CHARS}"),
            });
        }

        match self.cache_backend {
            CacheBackendKind::Fs if self.cache_dir.as_os_str().is_empty() => {
                return Err(ConfigError::Invalid { field: "cache_dir".into(), reason: "must not be empty".into() });
            }
            CacheBackendKind::Sqlite if self.db_path.as_os_str().is_empty() => {
                return Err(ConfigError::Invalid { field: "db_path".into(), reason: "must not be empty".into() });
            }
            _ => {}
        }

        if self.current_html_budget > self.step_htmls_budget {
            tracing::warn!(
                current_html_budget = self.current_html_budget,
                step_htmls_budget = self.step_htmls_budget,
                "current page budget exceeds the step snapshot budget"
            );
        }

        Ok(())
    }
}

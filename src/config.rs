//! Runtime configuration for the defect engines.
//!
//! Configuration is plain data with sensible defaults and can be loaded from
//! JSON, so the transition table can be adjusted per deployment without code
//! changes.
//!
//! # Examples
//!
//! ```
//! use snaglist::config::TrackerConfig;
//! use snaglist::defect::domain::{DefectStatus, TransitionAction};
//!
//! let config = TrackerConfig::from_json_str(r#"{ "page_size": 50 }"#).expect("valid config");
//! assert_eq!(config.page_size, 50);
//!
//! let reopen = config.transitions.rule(TransitionAction::Reopen).expect("reopen rule");
//! assert!(!reopen.from.contains(&DefectStatus::Closed));
//! ```

use crate::defect::domain::TransitionPolicy;
use serde::Deserialize;
use thiserror::Error;

/// Default number of rows per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Lifecycle transition table.
    pub transitions: TransitionPolicy,
    /// Fixed listing page size.
    pub page_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            transitions: TransitionPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TrackerConfig {
    /// Parses and validates configuration from JSON. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidPageSize`] for a zero page size.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPageSize`] for a zero page size.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        Ok(())
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document is malformed or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// The page size is zero.
    #[error("page_size must be at least 1")]
    InvalidPageSize,
}

//! # Database Configuration
//!
//! Loaded once at startup, usually from a TOML file:
//!
//! ```toml
//! max_entity_count = 1000000
//! preallocated_pages = 16
//! free_list_capacity = 4096
//! ```
//!
//! Every field is optional; missing fields take their [`Default`] value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::generation::{PAGE_COUNT, PAGE_SIZE};
use crate::ecs::MAX_ENTITY_COUNT;
use crate::error::{DatabaseError, DatabaseResult};

/// Configuration for a [`Database`](crate::Database).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Highest entity index the allocator may hand out (1..=2^24-1).
    ///
    /// Once every index up to this bound has been used and the free list is
    /// empty, `create` produces null handles.
    pub max_entity_count: usize,
    /// Generation-table pages (65,536 indices each) materialised up front.
    pub preallocated_pages: usize,
    /// Initial capacity reserved for the index free list.
    pub free_list_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_entity_count: MAX_ENTITY_COUNT,
            preallocated_pages: 1,
            free_list_capacity: 0,
        }
    }
}

impl DatabaseConfig {
    /// Default configuration with a smaller index space.
    #[must_use]
    pub fn with_max_entity_count(max_entity_count: usize) -> Self {
        Self {
            max_entity_count,
            ..Self::default()
        }
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> DatabaseResult<()> {
        if self.max_entity_count == 0 {
            return Err(DatabaseError::InvalidConfig(
                "max_entity_count must be greater than zero".to_string(),
            ));
        }
        if self.max_entity_count > MAX_ENTITY_COUNT {
            return Err(DatabaseError::InvalidConfig(format!(
                "max_entity_count {} exceeds the 24-bit index space ({MAX_ENTITY_COUNT})",
                self.max_entity_count
            )));
        }
        if self.preallocated_pages > PAGE_COUNT {
            return Err(DatabaseError::InvalidConfig(format!(
                "preallocated_pages {} exceeds the page count ({PAGE_COUNT})",
                self.preallocated_pages
            )));
        }
        if self.free_list_capacity > self.max_entity_count {
            return Err(DatabaseError::InvalidConfig(format!(
                "free_list_capacity {} exceeds max_entity_count {}",
                self.free_list_capacity, self.max_entity_count
            )));
        }
        Ok(())
    }

    /// Number of generation pages needed to cover `max_entity_count`.
    #[must_use]
    pub fn page_budget(&self) -> usize {
        self.max_entity_count / PAGE_SIZE + 1
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConfigParse`] on malformed TOML or unknown
    /// fields, and [`DatabaseError::InvalidConfig`] on out-of-range values.
    pub fn from_toml_str(text: &str) -> DatabaseResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| DatabaseError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConfigRead`] if the file cannot be read, plus
    /// everything [`DatabaseConfig::from_toml_str`] can return.
    pub fn load(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DatabaseError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}

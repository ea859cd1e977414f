//! # Core Error Types
//!
//! Errors for the fallible, non-hot-path surface: configuration loading and
//! component-set registration. Allocation and component add/remove never
//! return errors; they report through null handles and instance `0`.

use thiserror::Error;

/// Errors that can occur while configuring a database or registering sets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// A configuration file could not be read.
    #[error("failed to read configuration {path}: {reason}")]
    ConfigRead {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },

    /// A component set for this schema already exists.
    #[error("component set {type_name} (schema {schema}) is already registered")]
    SchemaAlreadyRegistered {
        /// Schema id of the set.
        schema: u32,
        /// Rust type name of the set.
        type_name: &'static str,
    },

    /// The database was built from a fixed schema table that does not list this set.
    #[error("component set {type_name} is not declared in the schema table")]
    UndeclaredSchema {
        /// Rust type name of the set.
        type_name: &'static str,
    },
}

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

//! # Error Types
//!
//! Faults raised by component stores, the registry and config loading.
//!
//! Programming errors (touching an unregistered component type) are not
//! represented here: the plain registry operations panic on them. Only the
//! `try_*` registry variants surface them as [`RegistryError::Unregistered`].

use thiserror::Error;

/// Faults raised by a single packed component store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The index is not present in this store.
    #[error("index {index} is not present in this store")]
    NotFound {
        /// The requested index.
        index: u32,
    },

    /// The index is present, but the stored handle belongs to another
    /// generation. The requested handle was destroyed and its slot reused.
    #[error("stale handle for index {index}: requested generation {requested}, stored generation {stored}")]
    StaleHandle {
        /// The requested index.
        index: u32,
        /// Generation carried by the requested handle.
        requested: u32,
        /// Generation of the handle currently stored at that index.
        stored: u32,
    },

    /// The index lies beyond the store's fixed capacity.
    #[error("index {index} exceeds store capacity {capacity}")]
    CapacityExceeded {
        /// The requested index.
        index: u32,
        /// The store's capacity.
        capacity: usize,
    },
}

/// Faults raised by the fallible registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The component type was never registered.
    #[error("component type `{type_name}` was not registered")]
    Unregistered {
        /// Name of the offending type.
        type_name: &'static str,
    },

    /// The underlying store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Faults raised while loading an [`EcsConfig`](crate::config::EcsConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for fallible registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

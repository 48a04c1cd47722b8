//! # Store Configuration
//!
//! The only tunable is the per-store capacity ceiling. Every packed store's
//! sparse map and liveness bitset are sized to it once, at registration.
//!
//! ```toml
//! # tessera.toml
//! max_entities = 100000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default maximum number of entity indices a store can address.
pub const MAX_ENTITIES: usize = 65_536;

/// Configuration for component stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    max_entities: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
        }
    }
}

impl EcsConfig {
    /// Creates a config with the given capacity ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the ceiling is unusable.
    pub fn new(max_entities: usize) -> ConfigResult<Self> {
        let config = Self { max_entities };
        config.validate()?;
        Ok(config)
    }

    /// Maximum entity index (exclusive) each component store accepts.
    #[inline]
    #[must_use]
    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Parses a config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] if the parsed values are unusable.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`EcsConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid(
                "max_entities must be greater than zero".to_owned(),
            ));
        }
        // Indices are u32, so at most 2^32 distinct slots are addressable.
        let ceiling = u64::from(u32::MAX) + 1;
        if u64::try_from(self.max_entities).map_or(true, |max| max > ceiling) {
            return Err(ConfigError::Invalid(format!(
                "max_entities {} exceeds the addressable index range {ceiling}",
                self.max_entities
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(EcsConfig::default().max_entities, MAX_ENTITIES);
    }

    #[test]
    fn test_parse_toml() {
        let config = EcsConfig::from_toml_str("max_entities = 1024").unwrap();
        assert_eq!(config.max_entities, 1024);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let config = EcsConfig::from_toml_str("").unwrap();
        assert_eq!(config, EcsConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EcsConfig::from_toml_str("max_entities = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(EcsConfig::new(0).is_err());
    }

    #[test]
    fn test_new_validates_range() {
        assert_eq!(EcsConfig::new(16).unwrap().max_entities(), 16);
        let too_big = usize::try_from(u64::from(u32::MAX) + 2);
        if let Ok(too_big) = too_big {
            assert!(matches!(EcsConfig::new(too_big), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = EcsConfig::from_toml_str("max_entities = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EcsConfig::load("/definitely/not/here/tessera.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

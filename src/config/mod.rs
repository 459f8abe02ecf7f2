//! Run configuration, read from `.intcatalog.toml`.
//!
//! ```toml
//! strict = true
//!
//! [probe]
//! timeout_ms = 250
//! min_arg = 0
//! max_arg = 100
//! seed = 7
//!
//! [walk]
//! ignore = ["**/vendor/**"]
//! respect_gitignore = true
//! ```

pub mod loader;

pub use loader::{find_config_file, load_config, parse_and_validate_config, CONFIG_FILE_NAME};

use crate::analysis::Strictness;
use crate::errors::{Error, Result};
use crate::sandbox::SandboxLimits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Require an annotation on every parameter.
    pub strict: bool,
    pub probe: ProbeConfig,
    pub walk: WalkConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            strict: true,
            probe: ProbeConfig::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn strictness(&self) -> Strictness {
        Strictness::from_strict_flag(self.strict)
    }

    pub fn validate(&self) -> Result<()> {
        self.probe.validate()?;
        for pattern in &self.walk.ignore {
            glob::Pattern::new(pattern)?;
        }
        Ok(())
    }
}

/// Settings for dynamic probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    #[serde(flatten)]
    pub limits: SandboxLimits,
    /// Inclusive bounds for synthesized integer arguments.
    pub min_arg: i64,
    pub max_arg: i64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            limits: SandboxLimits::default(),
            min_arg: 0,
            max_arg: 100,
            seed: None,
        }
    }
}

impl ProbeConfig {
    fn validate(&self) -> Result<()> {
        if self.min_arg > self.max_arg {
            return Err(Error::Config(format!(
                "probe.min_arg ({}) exceeds probe.max_arg ({})",
                self.min_arg, self.max_arg
            )));
        }
        if self.limits.timeout_ms == 0 {
            return Err(Error::Config("probe.timeout_ms must be positive".into()));
        }
        if self.limits.max_steps == 0 {
            return Err(Error::Config("probe.max_steps must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Glob patterns of paths to leave out of the corpus.
    pub ignore: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            respect_gitignore: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert!(config.strict);
        assert_eq!(config.strictness(), Strictness::Strict);
        assert_eq!((config.probe.min_arg, config.probe.max_arg), (0, 100));
        assert_eq!(config.probe.limits.timeout_ms, 250);
        assert!(config.walk.respect_gitignore);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = CatalogConfig::default();
        config.probe.min_arg = 10;
        config.probe.max_arg = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds probe.max_arg"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = CatalogConfig::default();
        config.probe.limits.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::default();
        config.probe.limits.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let mut config = CatalogConfig::default();
        config.walk.ignore = vec!["[".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}

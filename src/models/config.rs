//! Configuration model for metanav

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// metanav configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NavConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl NavConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.navigation.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "navigation.timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.cache.max_documents == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache.max_documents".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Go-to-definition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Reconstruct member bodies instead of emitting declarations only.
    #[serde(default)]
    pub enable_decompilation: bool,

    /// Budget used when a request does not carry its own.
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// Lower bound of the budget granted to decompilation.
    #[serde(default = "defaults::decompile_min_budget_ms")]
    pub decompile_min_budget_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            enable_decompilation: false,
            timeout_ms: defaults::timeout_ms(),
            decompile_min_budget_ms: defaults::decompile_min_budget_ms(),
        }
    }
}

/// Materialized document cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::max_documents")]
    pub max_documents: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_documents: defaults::max_documents(),
        }
    }
}

/// Workspace discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Extra directories searched for `*.module.json` manifests.
    #[serde(default)]
    pub module_paths: Vec<String>,

    /// Paths to ignore
    #[serde(default = "defaults::ignored_paths")]
    pub ignored_paths: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            module_paths: Vec::new(),
            ignored_paths: defaults::ignored_paths(),
        }
    }
}

mod defaults {
    // Navigation
    pub fn timeout_ms() -> u64 {
        2000
    }
    pub fn decompile_min_budget_ms() -> u64 {
        10_000
    }

    // Cache
    pub fn max_documents() -> usize {
        256
    }

    // Workspace
    pub fn ignored_paths() -> Vec<String> {
        vec![
            "bin".to_string(),
            "obj".to_string(),
            "packages".to_string(),
            ".vs".to_string(),
            ".git".to_string(),
            ".metanav".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NavConfig::default();
        assert!(!config.navigation.enable_decompilation);
        assert_eq!(config.navigation.timeout_ms, 2000);
        assert_eq!(config.navigation.decompile_min_budget_ms, 10_000);
        assert_eq!(config.cache.max_documents, 256);
        assert!(config.workspace.ignored_paths.contains(&"obj".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: NavConfig = toml::from_str(
            r#"
            [navigation]
            enable_decompilation = true
            "#,
        )
        .unwrap();
        assert!(config.navigation.enable_decompilation);
        assert_eq!(config.navigation.timeout_ms, 2000);
        assert_eq!(config.cache.max_documents, 256);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = NavConfig::default();
        config.navigation.timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "navigation.timeout_ms"
        ));
    }
}

//! Global Configuration Singleton

use std::sync::OnceLock;
use std::time::Duration;

use crate::models::config::NavConfig;

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    default_timeout: Duration,
    decompile_min_budget: Duration,
    pub enable_decompilation: bool,
    pub max_documents: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(2000),
            decompile_min_budget: Duration::from_millis(10_000),
            enable_decompilation: false,
            max_documents: 256,
        }
    }
}

impl From<&NavConfig> for RuntimeConfig {
    fn from(config: &NavConfig) -> Self {
        Self {
            default_timeout: Duration::from_millis(config.navigation.timeout_ms),
            decompile_min_budget: Duration::from_millis(config.navigation.decompile_min_budget_ms),
            enable_decompilation: config.navigation.enable_decompilation,
            max_documents: config.cache.max_documents,
        }
    }
}

pub fn init(config: &NavConfig) {
    let _ = CONFIG.set(RuntimeConfig::from(config));
}

pub fn default_timeout() -> Duration {
    config().default_timeout
}

/// Floor applied to budgets granted to the decompiler.
pub fn decompile_min_budget() -> Duration {
    config().decompile_min_budget
}

pub fn enable_decompilation() -> bool {
    config().enable_decompilation
}

pub fn max_documents() -> usize {
    config().max_documents
}

pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}

fn config() -> RuntimeConfig {
    CONFIG.get().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_from_nav_config() {
        let mut nav = NavConfig::default();
        nav.navigation.timeout_ms = 500;
        nav.navigation.enable_decompilation = true;
        let runtime = RuntimeConfig::from(&nav);
        assert_eq!(runtime.default_timeout, Duration::from_millis(500));
        assert_eq!(runtime.decompile_min_budget, Duration::from_millis(10_000));
        assert!(runtime.enable_decompilation);
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let runtime = RuntimeConfig::default();
        let from_defaults = RuntimeConfig::from(&NavConfig::default());
        assert_eq!(runtime.default_timeout, from_defaults.default_timeout);
        assert_eq!(runtime.decompile_min_budget, from_defaults.decompile_min_budget);
        assert_eq!(runtime.max_documents, from_defaults.max_documents);
    }
}

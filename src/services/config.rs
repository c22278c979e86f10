//! Configuration service for metanav

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::models::config::{NavConfig, WorkspaceConfig};

#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn load(&self, global_only: bool) -> Result<NavConfig, ConfigError>;
    fn config_path(&self, global: bool) -> PathBuf;
    async fn init(&self, global: bool, force: bool) -> Result<PathBuf, ConfigError>;
}

pub struct DefaultConfigService {
    root: PathBuf,
}

impl DefaultConfigService {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn global_config_path() -> PathBuf {
        // XDG standard: ~/.config/metanav/config.toml
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("metanav")
            .join("config.toml")
    }

    fn project_config_path(&self) -> PathBuf {
        self.root.join(".metanav").join("config.toml")
    }

    async fn load_from_path(path: &Path) -> Result<NavConfig, ConfigError> {
        if !path.exists() {
            return Ok(NavConfig::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    async fn write_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let config = NavConfig::default();
        let content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigService for DefaultConfigService {
    async fn load(&self, global_only: bool) -> Result<NavConfig, ConfigError> {
        if global_only {
            return Self::load_from_path(&Self::global_config_path()).await;
        }

        let global = Self::load_from_path(&Self::global_config_path()).await?;
        let project = Self::load_from_path(&self.project_config_path()).await?;
        let config = apply_env_overrides(merge_config(global, project));
        config.validate()?;
        Ok(config)
    }

    fn config_path(&self, global: bool) -> PathBuf {
        if global {
            Self::global_config_path()
        } else {
            self.project_config_path()
        }
    }

    async fn init(&self, global: bool, force: bool) -> Result<PathBuf, ConfigError> {
        let path = self.config_path(global);

        if path.exists() && !force {
            return Err(ConfigError::InvalidValue {
                key: "config".to_string(),
                message: format!(
                    "Config already exists: {}. Use --force to overwrite.",
                    path.display()
                ),
            });
        }

        Self::write_default_config(&path).await?;
        Ok(path)
    }
}

fn merge_config(base: NavConfig, overlay: NavConfig) -> NavConfig {
    let mut module_paths = base.workspace.module_paths;
    for path in overlay.workspace.module_paths {
        if !module_paths.contains(&path) {
            module_paths.push(path);
        }
    }
    NavConfig {
        navigation: overlay.navigation,
        cache: overlay.cache,
        workspace: WorkspaceConfig {
            module_paths,
            ignored_paths: overlay.workspace.ignored_paths,
        },
    }
}

fn apply_env_overrides(mut config: NavConfig) -> NavConfig {
    if let Ok(val) = std::env::var("METANAV_ENABLE_DECOMPILATION") {
        config.navigation.enable_decompilation = matches!(
            val.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
    }
    if let Ok(val) = std::env::var("METANAV_TIMEOUT_MS")
        && let Ok(timeout) = val.parse()
    {
        config.navigation.timeout_ms = timeout;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_global_module_paths() {
        let mut global = NavConfig::default();
        global.workspace.module_paths = vec!["/opt/modules".to_string()];
        let mut project = NavConfig::default();
        project.workspace.module_paths = vec!["lib".to_string(), "/opt/modules".to_string()];
        project.navigation.enable_decompilation = true;

        let merged = merge_config(global, project);
        assert_eq!(merged.workspace.module_paths, vec!["/opt/modules", "lib"]);
        assert!(merged.navigation.enable_decompilation);
    }

    #[tokio::test]
    async fn test_init_writes_loadable_project_config() {
        let dir = tempfile::tempdir().unwrap();
        let service = DefaultConfigService::new(dir.path());

        let path = service.init(false, false).await.unwrap();
        assert_eq!(path, dir.path().join(".metanav").join("config.toml"));

        let loaded = DefaultConfigService::load_from_path(&path).await.unwrap();
        assert_eq!(loaded.navigation.timeout_ms, 2000);

        let again = service.init(false, false).await;
        assert!(matches!(again, Err(ConfigError::InvalidValue { .. })));
        assert!(service.init(false, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_project_config_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[navigation]\ntimeout_ms = \"soon\"\n")
            .await
            .unwrap();
        let result = DefaultConfigService::load_from_path(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

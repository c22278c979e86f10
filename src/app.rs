//! Application container for metanav

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cli::OutputContext;
use crate::config;
use crate::infra::workspace::{Workspace, load_workspace};
use crate::models::config::NavConfig;
use crate::services::config::{ConfigService, DefaultConfigService};
use crate::services::definition::{DefaultDefinitionService, DefinitionService};
use crate::services::metadata::{
    MaterializerOptions, MetadataCache, MetadataMaterializer, StrategyTable,
};
use crate::services::reanalysis::DefaultReAnalysisService;

/// Services over a loaded workspace.
pub struct Services {
    pub workspace: Arc<Workspace>,
    pub materializer: Arc<MetadataMaterializer>,
    pub definition: Arc<dyn DefinitionService>,
    pub reanalysis: Arc<DefaultReAnalysisService>,
}

pub struct App {
    root: PathBuf,
    pub(crate) output: OutputContext,
    pub(crate) config_service: Arc<dyn ConfigService>,
    pub(crate) config: NavConfig,
    services: OnceCell<Services>,
}

impl App {
    pub async fn new(root: Option<PathBuf>, decompile: bool) -> anyhow::Result<Self> {
        let root = match root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|e| anyhow::anyhow!("Invalid root {}: {}", root.display(), e))?;

        tracing::debug!("Initializing metanav at {:?}", root);

        let output = OutputContext::new(root.clone());
        let config_service = Arc::new(DefaultConfigService::new(&root));
        let mut config = match config_service.load(false).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                NavConfig::default()
            }
        };
        if decompile {
            config.navigation.enable_decompilation = true;
        }

        config::init(&config);

        Ok(Self {
            root,
            output,
            config_service,
            config,
            services: OnceCell::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Load the workspace on first use.
    pub async fn services(&self) -> anyhow::Result<&Services> {
        self.services
            .get_or_try_init(|| async {
                let workspace = Arc::new(load_workspace(&self.root, &self.config.workspace).await?);
                let cache = Arc::new(MetadataCache::new(self.config.cache.max_documents));
                let materializer = Arc::new(MetadataMaterializer::new(
                    workspace.clone(),
                    cache.clone(),
                    StrategyTable::detect(),
                    MaterializerOptions::default(),
                ));
                if materializer.active_strategy() != MaterializerOptions::default().strategy {
                    tracing::debug!(
                        "Decompiler unavailable, using {}",
                        materializer.active_strategy()
                    );
                }
                let definition = Arc::new(DefaultDefinitionService::new(
                    workspace.clone(),
                    materializer.clone(),
                ));
                let reanalysis = Arc::new(DefaultReAnalysisService::new(workspace.clone(), cache));

                tracing::info!(
                    "metanav ready (strategy: {})",
                    materializer.active_strategy()
                );

                Ok::<_, anyhow::Error>(Services {
                    workspace,
                    materializer,
                    definition,
                    reanalysis,
                })
            })
            .await
    }
}

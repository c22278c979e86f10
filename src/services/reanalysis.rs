//! Re-analysis and diagnostics
//!
//! Recomputes diagnostics per project, publishes one `ProjectAnalyzed`
//! event per affected project and drops materialized documents of projects
//! whose snapshot moved since their last analysis.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::error::WorkspaceError;
use crate::infra::workspace::Workspace;
use crate::models::diagnostic::{Diagnostic, ProjectAnalyzed, ReAnalyzeRequest};
use crate::models::project::ProjectId;
use crate::services::metadata::MetadataCache;
use crate::services::provider::SemanticProvider;

const EVENT_CAPACITY: usize = 64;

#[async_trait]
pub trait ReAnalysisService: Send + Sync {
    /// Recompute diagnostics for the project owning the context path, or for every project.
    async fn reanalyze(&self, request: &ReAnalyzeRequest) -> Result<Vec<ProjectAnalyzed>, WorkspaceError>;

    fn subscribe(&self) -> broadcast::Receiver<ProjectAnalyzed>;
}

#[async_trait]
pub trait DiagnosticsService: Send + Sync {
    /// Diagnostics of one file at the latest buffer state.
    async fn code_check(&self, file: &Path) -> Result<Vec<Diagnostic>, WorkspaceError>;
}

struct Published {
    version: u64,
    files: BTreeMap<PathBuf, Vec<Diagnostic>>,
}

pub struct DefaultReAnalysisService {
    workspace: Arc<Workspace>,
    cache: Arc<MetadataCache>,
    published: RwLock<HashMap<ProjectId, Published>>,
    events: broadcast::Sender<ProjectAnalyzed>,
}

impl DefaultReAnalysisService {
    pub fn new(workspace: Arc<Workspace>, cache: Arc<MetadataCache>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            workspace,
            cache,
            published: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Unknown context paths fall back to every project.
    async fn affected(&self, request: &ReAnalyzeRequest) -> Vec<ProjectId> {
        if let Some(path) = &request.current_open_file_path_as_context {
            match self.workspace.project_for_path(path).await {
                Some(project) => return vec![project],
                None => tracing::debug!("{} belongs to no project", path.display()),
            }
        }
        self.workspace
            .projects()
            .await
            .into_iter()
            .map(|p| p.id)
            .collect()
    }
}

#[async_trait]
impl ReAnalysisService for DefaultReAnalysisService {
    async fn reanalyze(&self, request: &ReAnalyzeRequest) -> Result<Vec<ProjectAnalyzed>, WorkspaceError> {
        let mut analyzed = Vec::new();
        for project in self.affected(request).await {
            let analysis = self.workspace.analyze_project(&project).await?;
            let event = ProjectAnalyzed {
                project_file_path: analysis.project_file_path.clone(),
            };
            tracing::debug!(
                "{} analyzed at version {}: {} diagnostics",
                project,
                analysis.version,
                analysis.total()
            );

            let previous = self.published.write().await.insert(
                project.clone(),
                Published {
                    version: analysis.version,
                    files: analysis.files,
                },
            );
            if previous.is_some_and(|p| p.version != analysis.version) {
                let removed = self.cache.invalidate_project(&project);
                if removed > 0 {
                    tracing::debug!("Dropped {} materialized documents of {}", removed, project);
                }
            }

            // No subscribers is not an error.
            let _ = self.events.send(event.clone());
            analyzed.push(event);
        }
        Ok(analyzed)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProjectAnalyzed> {
        self.events.subscribe()
    }
}

#[async_trait]
impl DiagnosticsService for DefaultReAnalysisService {
    async fn code_check(&self, file: &Path) -> Result<Vec<Diagnostic>, WorkspaceError> {
        let project = self
            .workspace
            .project_for_path(file)
            .await
            .ok_or_else(|| WorkspaceError::DocumentNotFound(file.to_path_buf()))?;
        let current = self.workspace.project(&project).await.map(|p| p.version);
        {
            let published = self.published.read().await;
            if let Some(entry) = published.get(&project)
                && Some(entry.version) == current
                && let Some(diagnostics) = entry.files.get(file)
            {
                return Ok(diagnostics.clone());
            }
        }
        self.workspace.diagnostics_for(file).await
    }
}

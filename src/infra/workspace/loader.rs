//! Workspace discovery on disk
//!
//! Walks the root with the `ignore` crate so `.gitignore` and
//! `.metanav/ignore` are honored. Each `*.csproj` becomes a project owning
//! the sources below its directory; `*.module.json` manifests describe the
//! compiled modules a project references.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::Workspace;
use crate::error::WorkspaceError;
use crate::models::config::WorkspaceConfig;
use crate::models::module::ModuleManifest;
use crate::models::project::ProjectId;

const PROJECT_EXTENSION: &str = "csproj";
const SOURCE_EXTENSION: &str = "cs";
const MANIFEST_SUFFIX: &str = ".module.json";

#[derive(Debug, Default)]
struct Discovered {
    projects: Vec<PathBuf>,
    sources: Vec<PathBuf>,
    manifests: Vec<PathBuf>,
}

impl Discovered {
    fn classify(&mut self, path: PathBuf) {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(MANIFEST_SUFFIX) {
            self.manifests.push(path);
            return;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(PROJECT_EXTENSION) => self.projects.push(path),
            Some(SOURCE_EXTENSION) => self.sources.push(path),
            _ => {}
        }
    }
}

fn walk(root: &Path, ignored: &[String], discovered: &mut Discovered) {
    let ignored = ignored.to_vec();
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(move |entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !ignored.iter().any(|i| i == name))
        });
    let custom = root.join(".metanav").join("ignore");
    if custom.is_file()
        && let Some(err) = builder.add_ignore(&custom)
    {
        tracing::warn!("Ignoring {}: {}", custom.display(), err);
    }

    for entry in builder.build().filter_map(|e| e.ok()) {
        if entry.file_type().is_some_and(|t| t.is_file()) {
            discovered.classify(entry.into_path());
        }
    }
}

pub async fn load_manifest(path: &Path) -> Result<ModuleManifest, WorkspaceError> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| WorkspaceError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Project whose directory is the deepest ancestor of `path`.
fn owner<'p>(projects: &'p [(PathBuf, ProjectId)], path: &Path) -> Option<&'p ProjectId> {
    projects
        .iter()
        .filter(|(dir, _)| path.starts_with(dir))
        .max_by_key(|(dir, _)| dir.components().count())
        .map(|(_, id)| id)
}

/// Load every project, source and module manifest under `root`.
pub async fn load_workspace(root: &Path, config: &WorkspaceConfig) -> Result<Workspace, WorkspaceError> {
    let root = tokio::fs::canonicalize(root).await?;
    let mut discovered = Discovered::default();
    walk(&root, &config.ignored_paths, &mut discovered);
    let mut shared_manifests = Vec::new();
    for module_path in &config.module_paths {
        let dir = root.join(module_path);
        let mut extra = Discovered::default();
        walk(&dir, &config.ignored_paths, &mut extra);
        shared_manifests.extend(extra.manifests);
    }
    discovered.projects.sort();
    discovered.sources.sort();
    discovered.manifests.sort();

    let workspace = Workspace::new()?;
    let mut projects = Vec::new();
    for file in &discovered.projects {
        let name = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("project")
            .to_string();
        let dir = file.parent().unwrap_or(&root).to_path_buf();
        let id = workspace.add_project(name, file.clone()).await;
        projects.push((dir, id));
    }
    if projects.is_empty() {
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workspace")
            .to_string();
        let file = root.join(format!("{}.{}", name, PROJECT_EXTENSION));
        tracing::debug!("No project file under {}, using implicit {}", root.display(), name);
        let id = workspace.add_project(name, file).await;
        projects.push((root.clone(), id));
    }

    let mut loaded = 0usize;
    for source in &discovered.sources {
        let Some(project) = owner(&projects, source) else {
            continue;
        };
        match tokio::fs::read_to_string(source).await {
            Ok(text) => {
                workspace.add_document(project, source.clone(), &text).await?;
                loaded += 1;
            }
            Err(err) => tracing::warn!("Skipping {}: {}", source.display(), err),
        }
    }

    for path in &discovered.manifests {
        let manifest = match load_manifest(path).await {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!("{}", err);
                continue;
            }
        };
        match owner(&projects, path) {
            Some(project) if !shared_manifests.contains(path) => {
                workspace.add_module(project, manifest).await?;
            }
            _ => shared_manifests.push(path.clone()),
        }
    }

    shared_manifests.sort();
    shared_manifests.dedup();
    for path in &shared_manifests {
        let manifest = match load_manifest(path).await {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!("{}", err);
                continue;
            }
        };
        for (_, project) in &projects {
            workspace.add_module(project, manifest.clone()).await?;
        }
    }

    tracing::info!(
        "Loaded {} projects, {} documents from {}",
        projects.len(),
        loaded,
        root.display()
    );
    Ok(workspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::SemanticProvider;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{ "name": "Acme.Core", "types": [
        { "namespace": "Acme.Text", "name": "Foo", "members": [] }
    ] }"#;

    #[tokio::test]
    async fn test_sources_belong_to_deepest_project() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("app/sub")).unwrap();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("app/app.csproj"), "<Project />").unwrap();
        std::fs::write(root.join("app/a.cs"), "class A { }").unwrap();
        std::fs::write(root.join("app/sub/b.cs"), "class B { }").unwrap();
        std::fs::write(root.join("lib/lib.csproj"), "<Project />").unwrap();
        std::fs::write(root.join("lib/c.cs"), "class C { }").unwrap();
        std::fs::write(root.join("app/acme.module.json"), MANIFEST).unwrap();

        let ws = load_workspace(root, &WorkspaceConfig::default()).await.unwrap();
        let projects = ws.projects().await;
        assert_eq!(projects.len(), 2);

        let app = projects.iter().find(|p| p.name == "app").unwrap();
        assert_eq!(app.documents.len(), 2);
        let lib = projects.iter().find(|p| p.name == "lib").unwrap();
        assert_eq!(lib.documents.len(), 1);

        assert!(ws.external_type(&app.id, None, "Acme.Text.Foo").await.is_some());
        assert!(ws.external_type(&lib.id, None, "Acme.Text.Foo").await.is_none());
    }

    #[tokio::test]
    async fn test_implicit_project_and_ignored_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("obj")).unwrap();
        std::fs::write(root.join("a.cs"), "class A { }").unwrap();
        std::fs::write(root.join("obj/gen.cs"), "class G { }").unwrap();

        let ws = load_workspace(root, &WorkspaceConfig::default()).await.unwrap();
        let projects = ws.projects().await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].documents.len(), 1);
        assert!(projects[0].documents[0].ends_with("a.cs"));
    }

    #[tokio::test]
    async fn test_shared_module_paths_reach_every_project() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("modules")).unwrap();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("app/app.csproj"), "<Project />").unwrap();
        std::fs::write(root.join("modules/acme.module.json"), MANIFEST).unwrap();
        std::fs::write(root.join("modules/broken.module.json"), "{").unwrap();

        let config = WorkspaceConfig {
            module_paths: vec!["modules".to_string()],
            ..WorkspaceConfig::default()
        };
        let ws = load_workspace(root, &config).await.unwrap();
        let app = &ws.projects().await[0];
        assert!(ws.external_type(&app.id, Some("Acme.Core"), "Acme.Text.Foo").await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_manifest_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.module.json");
        std::fs::write(&path, "{ \"types\": 3 }").unwrap();
        let err = load_manifest(&path).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Manifest { .. }));

        let missing = load_manifest(&temp.path().join("gone.module.json")).await;
        assert!(matches!(missing, Err(WorkspaceError::Io(_))));
    }
}

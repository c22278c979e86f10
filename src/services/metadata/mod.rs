//! Metadata materialization
//!
//! Turns a symbol declared in a compiled module into a navigable document
//! and a position inside it. Documents are synthesized on demand under a
//! deadline, cached per project snapshot and shared between callers.

pub mod budget;
pub mod cache;
pub mod strategy;
pub mod writer;

use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;

pub use budget::{Deadline, effective_budget};
pub use cache::{MetadataCache, MetadataCacheStats};
pub use strategy::{
    ManifestDecompiler, SignatureStubSynthesizer, StrategyTable, SynthesisInput, TypeSynthesizer,
};
pub use writer::{SourceWriter, SynthesizedText};

use crate::error::SynthesisError;
use crate::models::metadata::{
    MaterializedDocument, MetadataKey, MetadataSourceRequest, MetadataSourceResponse,
    SynthesisStrategy,
};
use crate::models::project::ProjectId;
use crate::models::symbol::{Location, Position, Symbol, SymbolId};
use crate::services::provider::SemanticProvider;

#[derive(Debug, Clone, Copy)]
pub struct MaterializerOptions {
    /// Configured strategy; downgraded when the build lacks it.
    pub strategy: SynthesisStrategy,
    pub decompile_min_budget: Duration,
}

impl Default for MaterializerOptions {
    fn default() -> Self {
        Self {
            strategy: if crate::config::enable_decompilation() {
                SynthesisStrategy::Decompile
            } else {
                SynthesisStrategy::StubFromSignature
            },
            decompile_min_budget: crate::config::decompile_min_budget(),
        }
    }
}

impl MaterializerOptions {
    pub fn with_strategy(mut self, strategy: SynthesisStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// A synthesized document and the position of the requested symbol in it.
#[derive(Debug, Clone)]
pub struct MetadataTarget {
    pub document: Arc<MaterializedDocument>,
    pub position: Position,
}

pub struct MetadataMaterializer {
    provider: Arc<dyn SemanticProvider>,
    cache: Arc<MetadataCache>,
    strategies: StrategyTable,
    options: MaterializerOptions,
}

impl MetadataMaterializer {
    pub fn new(
        provider: Arc<dyn SemanticProvider>,
        cache: Arc<MetadataCache>,
        strategies: StrategyTable,
        options: MaterializerOptions,
    ) -> Self {
        Self {
            provider,
            cache,
            strategies,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn active_strategy(&self) -> SynthesisStrategy {
        self.strategies.resolve(self.options.strategy)
    }

    pub fn effective_budget(&self, requested: Duration) -> Duration {
        effective_budget(
            self.active_strategy(),
            requested,
            self.options.decompile_min_budget,
        )
    }

    /// Materialize the document showing `symbol`; `None` when nothing can be shown in time.
    pub async fn materialize(
        &self,
        project: &ProjectId,
        symbol: &Symbol,
        budget: Duration,
    ) -> Option<MetadataTarget> {
        let deadline = Deadline::after(self.effective_budget(budget));
        self.materialize_until(project, symbol, deadline).await
    }

    pub async fn materialize_until(
        &self,
        project: &ProjectId,
        symbol: &Symbol,
        deadline: Deadline,
    ) -> Option<MetadataTarget> {
        let Some(Location::InExternalModule { module, type_name }) = symbol.primary_location()
        else {
            tracing::debug!("{} is not declared in an external module", symbol.id);
            return None;
        };

        let snapshot = self.provider.project(project).await?.version;
        if let Some((document, position)) = self.cache.cached_location(project, &symbol.id, snapshot)
        {
            tracing::trace!("Location cache hit: {}", symbol.id);
            return Some(MetadataTarget { document, position });
        }

        let document = match self
            .document_for_type(project, Some(module.as_str()), type_name, deadline)
            .await
        {
            Ok(document) => document,
            Err(err) if err.is_timeout() => {
                tracing::warn!("Metadata for {} unavailable: {}", symbol.id, err);
                return None;
            }
            Err(err) => {
                tracing::debug!("Metadata for {} unavailable: {}", symbol.id, err);
                return None;
            }
        };

        let position = locate(&document, symbol);
        self.cache.remember_location(
            project,
            &symbol.id,
            &document.key,
            position,
            document.snapshot,
        );
        Some(MetadataTarget { document, position })
    }

    /// Cached or freshly synthesized document for one external type.
    pub async fn document_for_type(
        &self,
        project: &ProjectId,
        module: Option<&str>,
        type_name: &str,
        deadline: Deadline,
    ) -> Result<Arc<MaterializedDocument>, SynthesisError> {
        let info = self
            .provider
            .project(project)
            .await
            .ok_or(SynthesisError::ProjectUnavailable)?;
        let external = self
            .provider
            .external_type(project, module, type_name)
            .await
            .ok_or_else(|| SynthesisError::TypeNotFound {
                module: module.unwrap_or("*").to_string(),
                type_name: type_name.to_string(),
            })?;

        let key = MetadataKey::new(
            project.clone(),
            external.module_name(),
            external.ty().full_name(),
        );
        let input = SynthesisInput {
            key: key.clone(),
            project_name: info.name,
            external,
            snapshot: info.version,
        };
        let strategies = self.strategies.clone();
        let requested = self.options.strategy;

        self.cache
            .get_or_synthesize(&key, info.version, deadline, move || {
                async move {
                    let (strategy, text) = strategies.run(requested, &input).await?;
                    Ok(MaterializedDocument {
                        path: input.key.document_path(&input.project_name),
                        key: input.key,
                        project_name: input.project_name,
                        text: text.text,
                        strategy,
                        snapshot: input.snapshot,
                        anchors: text.anchors,
                    })
                }
                .boxed()
            })
            .await
    }

    /// Text of the document a definition response pointed at.
    pub async fn fetch_source(
        &self,
        request: &MetadataSourceRequest,
    ) -> Option<MetadataSourceResponse> {
        let project = self.provider.project_named(&request.project_name).await?;
        let budget = self.effective_budget(Duration::from_millis(request.timeout_millis));
        match self
            .document_for_type(
                &project.id,
                request.module_name.as_deref(),
                &request.type_name,
                Deadline::after(budget),
            )
            .await
        {
            Ok(document) => Some(MetadataSourceResponse {
                source_name: document.path.display().to_string(),
                source: document.text.clone(),
            }),
            Err(err) => {
                tracing::warn!("Cannot fetch source of {}: {}", request.type_name, err);
                None
            }
        }
    }
}

/// Position of `symbol` in `document`, by identity.
///
/// Falls back to the containing type when the member was not emitted.
fn locate(document: &MaterializedDocument, symbol: &Symbol) -> Position {
    document
        .anchor(&symbol.id)
        .or_else(|| {
            symbol
                .containing_type_name()
                .and_then(|name| document.anchor(&SymbolId::for_type(name)))
        })
        .map(|anchor| anchor.position)
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::WorkspaceError;
    use crate::models::module::{ExternalTypeRef, ModuleManifest};
    use crate::models::project::ProjectInfo;
    use crate::services::provider::Document;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    /// One project that sees one module.
    pub(crate) struct ModuleOnlyProvider {
        pub info: ProjectInfo,
        pub module: Arc<ModuleManifest>,
    }

    impl ModuleOnlyProvider {
        pub(crate) fn new(manifest: ModuleManifest) -> Self {
            Self {
                info: ProjectInfo {
                    id: ProjectId::new("/ws/app.csproj"),
                    name: "app".to_string(),
                    file_path: PathBuf::from("/ws/app.csproj"),
                    version: 3,
                    documents: Vec::new(),
                },
                module: Arc::new(manifest),
            }
        }
    }

    #[async_trait]
    impl SemanticProvider for ModuleOnlyProvider {
        async fn document(&self, _path: &Path) -> Option<Document> {
            None
        }

        async fn symbol_at(
            &self,
            _document: &Document,
            _position: Position,
        ) -> Result<Option<Symbol>, WorkspaceError> {
            Ok(None)
        }

        async fn external_type(
            &self,
            _project: &ProjectId,
            module: Option<&str>,
            type_name: &str,
        ) -> Option<ExternalTypeRef> {
            if module.is_some_and(|m| m != self.module.name) {
                return None;
            }
            let index = self.module.find_type(type_name)?;
            ExternalTypeRef::new(Arc::clone(&self.module), index)
        }

        async fn project(&self, id: &ProjectId) -> Option<ProjectInfo> {
            (id == &self.info.id).then(|| self.info.clone())
        }

        async fn project_named(&self, name: &str) -> Option<ProjectInfo> {
            (name == self.info.name).then(|| self.info.clone())
        }
    }

    fn materializer(
        manifest: ModuleManifest,
        strategies: StrategyTable,
        strategy: SynthesisStrategy,
    ) -> MetadataMaterializer {
        MetadataMaterializer::new(
            Arc::new(ModuleOnlyProvider::new(manifest)),
            Arc::new(MetadataCache::new(16)),
            strategies,
            MaterializerOptions {
                strategy,
                decompile_min_budget: Duration::from_millis(10_000),
            },
        )
    }

    fn member(manifest: &ModuleManifest, index: usize) -> Symbol {
        let type_ref = ExternalTypeRef::new(Arc::new(manifest.clone()), 0).unwrap();
        let member = type_ref.ty().members[index].clone();
        type_ref.member_symbol(&member)
    }

    #[tokio::test]
    async fn test_materialize_locates_overload_by_identity() {
        let manifest = strategy::tests::manifest(true);
        let symbol = member(&manifest, 2);
        let nav = materializer(
            manifest,
            StrategyTable::stub_only(),
            SynthesisStrategy::StubFromSignature,
        );

        let target = nav
            .materialize(&ProjectId::new("/ws/app.csproj"), &symbol, Duration::from_secs(1))
            .await
            .unwrap();
        let line = target.document.line(target.position.line).unwrap();
        assert!(line.contains("Bar(int a, int b)"));
        assert_eq!(target.document.source().type_name, "Acme.Text.Foo");
        assert_eq!(target.document.snapshot, 3);
    }

    #[tokio::test]
    async fn test_second_materialize_reuses_document() {
        let manifest = strategy::tests::manifest(true);
        let bar = member(&manifest, 1);
        let count = member(&manifest, 3);
        let nav = materializer(
            manifest,
            StrategyTable::stub_only(),
            SynthesisStrategy::StubFromSignature,
        );
        let project = ProjectId::new("/ws/app.csproj");

        let first = nav.materialize(&project, &bar, Duration::from_secs(1)).await.unwrap();
        let second = nav.materialize(&project, &count, Duration::from_secs(1)).await.unwrap();
        assert!(Arc::ptr_eq(&first.document, &second.document));
        assert_ne!(first.position, second.position);
        assert_eq!(nav.cache().stats().syntheses, 1);
    }

    #[tokio::test]
    async fn test_unknown_type_yields_nothing() {
        let manifest = strategy::tests::manifest(true);
        let nav = materializer(
            manifest,
            StrategyTable::stub_only(),
            SynthesisStrategy::StubFromSignature,
        );
        let ghost = Symbol::new(
            SymbolId::for_type("Acme.Ghost"),
            "Ghost",
            crate::models::symbol::SymbolKind::Class,
        )
        .with_location(Location::in_module("Acme.Core", "Acme.Ghost"));

        assert!(
            nav.materialize(&ProjectId::new("/ws/app.csproj"), &ghost, Duration::from_secs(1))
                .await
                .is_none()
        );
        assert_eq!(nav.cache().stats().documents, 0);
    }

    #[test]
    fn test_decompile_budget_uses_floor_only_when_available() {
        let manifest = strategy::tests::manifest(true);
        let with_decompiler = materializer(
            manifest.clone(),
            StrategyTable::stub_only().with(Arc::new(ManifestDecompiler)),
            SynthesisStrategy::Decompile,
        );
        assert_eq!(
            with_decompiler.effective_budget(Duration::from_millis(1)),
            Duration::from_millis(10_000)
        );

        let without = materializer(manifest, StrategyTable::stub_only(), SynthesisStrategy::Decompile);
        assert_eq!(without.active_strategy(), SynthesisStrategy::StubFromSignature);
        assert_eq!(
            without.effective_budget(Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }

    #[tokio::test]
    async fn test_fetch_source_matches_definition_key() {
        let manifest = strategy::tests::manifest(true);
        let symbol = member(&manifest, 1);
        let nav = materializer(
            manifest,
            StrategyTable::stub_only().with(Arc::new(ManifestDecompiler)),
            SynthesisStrategy::Decompile,
        );
        let target = nav
            .materialize(&ProjectId::new("/ws/app.csproj"), &symbol, Duration::from_millis(1))
            .await
            .unwrap();

        let fetched = nav
            .fetch_source(&MetadataSourceRequest::from(target.document.source()))
            .await
            .unwrap();
        assert_eq!(fetched.source, target.document.text);
        assert_eq!(
            fetched.source_name,
            "$metadata$/Project/app/Assembly/Acme.Core/Symbol/Acme/Text/Foo.cs"
        );
        assert_eq!(nav.cache().stats().syntheses, 1);
    }
}

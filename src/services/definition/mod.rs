//! Go-to-definition
//!
//! Resolves the symbol under a cursor and reports where it is defined:
//! a workspace location, or a position inside a synthesized document for
//! symbols that live in compiled modules.

pub mod classify;
pub mod disambiguate;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use classify::{Destination, classify};
pub use disambiguate::disambiguate;

use crate::models::definition::{DefinitionRequest, DefinitionResponse};
use crate::models::symbol::SymbolKind;
use crate::services::metadata::MetadataMaterializer;
use crate::services::provider::{Document, SemanticProvider};

#[async_trait]
pub trait DefinitionService: Send + Sync {
    /// Definition of the symbol at the request position; empty when there is none.
    async fn goto_definition(&self, request: &DefinitionRequest) -> DefinitionResponse;
}

pub struct DefaultDefinitionService {
    provider: Arc<dyn SemanticProvider>,
    materializer: Arc<MetadataMaterializer>,
}

impl DefaultDefinitionService {
    pub fn new(provider: Arc<dyn SemanticProvider>, materializer: Arc<MetadataMaterializer>) -> Self {
        Self {
            provider,
            materializer,
        }
    }

    /// Synthesized documents are looked up before workspace files.
    async fn open(&self, path: &Path) -> Option<Document> {
        if let Some(document) = self.materializer.cache().document_for_path(path) {
            return Some(Document::from_metadata(document));
        }
        self.provider.document(path).await
    }
}

#[async_trait]
impl DefinitionService for DefaultDefinitionService {
    async fn goto_definition(&self, request: &DefinitionRequest) -> DefinitionResponse {
        let Some(document) = self.open(&request.file_path).await else {
            tracing::debug!("No document at {}", request.file_path.display());
            return DefinitionResponse::empty();
        };

        let position = request.position();
        let symbol = match self.provider.symbol_at(&document, position).await {
            Ok(Some(symbol)) => symbol,
            Ok(None) => {
                tracing::debug!("No symbol at {}:{}", request.file_path.display(), position);
                return DefinitionResponse::empty();
            }
            Err(err) => {
                tracing::warn!("Symbol lookup failed for {}: {}", request.file_path.display(), err);
                return DefinitionResponse::empty();
            }
        };
        if symbol.kind == SymbolKind::Namespace {
            return DefinitionResponse::empty();
        }
        let Some(symbol) = disambiguate(symbol) else {
            return DefinitionResponse::empty();
        };

        match classify(&symbol, request.want_metadata) {
            Destination::Source { file, position } => {
                DefinitionResponse::source(file.display().to_string(), position)
            }
            Destination::Materialize => {
                let budget = Duration::from_millis(request.timeout_millis);
                match self
                    .materializer
                    .materialize(&document.project, &symbol, budget)
                    .await
                {
                    Some(target) => {
                        DefinitionResponse::metadata(target.position, target.document.source())
                    }
                    None => DefinitionResponse::empty(),
                }
            }
            Destination::Unavailable => DefinitionResponse::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::workspace::fixtures::workspace;
    use crate::models::metadata::{MetadataKey, SynthesisStrategy};
    use crate::models::module::ModuleManifest;
    use crate::models::project::ProjectId;
    use crate::models::symbol::Position;
    use crate::services::metadata::strategy::tests::manifest;
    use crate::services::metadata::{
        ManifestDecompiler, MaterializerOptions, MetadataCache, StrategyTable,
    };

    const CALLER: &str = r#"using Acme.Text;
class Program
{
    void Run(Foo foo)
    {
        foo.Bar();
    }
}
"#;

    async fn service(
        files: &[(&str, &str)],
        modules: Vec<ModuleManifest>,
        strategy: SynthesisStrategy,
    ) -> (DefaultDefinitionService, Arc<MetadataMaterializer>) {
        let (ws, _) = workspace(files, modules).await;
        let provider: Arc<dyn SemanticProvider> = ws;
        let materializer = Arc::new(MetadataMaterializer::new(
            provider.clone(),
            Arc::new(MetadataCache::new(16)),
            StrategyTable::stub_only().with(Arc::new(ManifestDecompiler)),
            MaterializerOptions {
                strategy,
                decompile_min_budget: Duration::from_millis(10_000),
            },
        ));
        (
            DefaultDefinitionService::new(provider, materializer.clone()),
            materializer,
        )
    }

    fn request(path: &str, line: u32, column: u32) -> DefinitionRequest {
        DefinitionRequest::new(path, line, column)
    }

    fn metadata_path() -> std::path::PathBuf {
        MetadataKey::new(ProjectId::new("/ws/app.csproj"), "Acme.Core", "Acme.Text.Foo")
            .document_path("app")
    }

    #[tokio::test]
    async fn test_whitespace_and_comments_are_empty() {
        let source = "// a comment\nclass A { }\n\n";
        let (svc, _) = service(&[("/ws/a.cs", source)], vec![], SynthesisStrategy::StubFromSignature).await;

        assert!(svc.goto_definition(&request("/ws/a.cs", 0, 5)).await.is_empty());
        assert!(svc.goto_definition(&request("/ws/a.cs", 1, 9)).await.is_empty());
        assert!(svc.goto_definition(&request("/ws/a.cs", 2, 0)).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_document_is_empty() {
        let (svc, _) = service(&[], vec![], SynthesisStrategy::StubFromSignature).await;
        assert!(svc.goto_definition(&request("/ws/none.cs", 0, 0)).await.is_empty());
    }

    #[tokio::test]
    async fn test_namespace_tokens_are_empty() {
        let source = "using Acme.Text;\nnamespace App.Core { class A { } }\n";
        let (svc, _) = service(
            &[("/ws/a.cs", source)],
            vec![manifest(true)],
            SynthesisStrategy::StubFromSignature,
        )
        .await;

        assert!(svc.goto_definition(&request("/ws/a.cs", 0, 6)).await.is_empty());
        assert!(svc.goto_definition(&request("/ws/a.cs", 0, 11)).await.is_empty());
        assert!(svc.goto_definition(&request("/ws/a.cs", 1, 14)).await.is_empty());
    }

    #[tokio::test]
    async fn test_property_accessor_keywords_are_empty() {
        let source = "class P { public int Count { get; set; } }";
        let (svc, _) = service(&[("/ws/a.cs", source)], vec![], SynthesisStrategy::StubFromSignature).await;

        assert!(svc.goto_definition(&request("/ws/a.cs", 0, 29)).await.is_empty());
        assert!(svc.goto_definition(&request("/ws/a.cs", 0, 34)).await.is_empty());
        let count = svc.goto_definition(&request("/ws/a.cs", 0, 21)).await;
        assert_eq!(count.position(), Some(Position::new(0, 21)));
    }

    #[tokio::test]
    async fn test_partial_method_goes_to_implementation() {
        let a = "partial class W\n{\n    partial void Hook(int x);\n    void Call() { Hook(1); }\n}\n";
        let b = "partial class W\n{\n    partial void Hook(int x) { }\n}\n";
        let (svc, _) = service(
            &[("/ws/a.cs", a), ("/ws/b.cs", b)],
            vec![],
            SynthesisStrategy::StubFromSignature,
        )
        .await;
        let expected = DefinitionResponse::source("/ws/b.cs", Position::new(2, 17));

        let from_call = svc.goto_definition(&request("/ws/a.cs", 3, 18)).await;
        assert_eq!(from_call, expected);
        let from_declaration = svc.goto_definition(&request("/ws/a.cs", 2, 17)).await;
        assert_eq!(from_declaration, expected);
    }

    #[tokio::test]
    async fn test_source_symbols_are_repeatable_and_never_cached() {
        let source = "class A { }\nclass B { A a; }\n";
        let (svc, materializer) = service(
            &[("/ws/a.cs", source)],
            vec![],
            SynthesisStrategy::StubFromSignature,
        )
        .await;
        let req = request("/ws/a.cs", 1, 10).with_metadata(true);

        let first = svc.goto_definition(&req).await;
        let second = svc.goto_definition(&req).await;
        assert_eq!(first, DefinitionResponse::source("/ws/a.cs", Position::new(0, 6)));
        assert_eq!(first, second);
        assert_eq!(materializer.cache().stats().documents, 0);
        assert_eq!(materializer.cache().stats().syntheses, 0);
    }

    #[tokio::test]
    async fn test_external_symbol_requires_opt_in() {
        let (svc, materializer) = service(
            &[("/ws/a.cs", CALLER)],
            vec![manifest(true)],
            SynthesisStrategy::StubFromSignature,
        )
        .await;

        let without = svc.goto_definition(&request("/ws/a.cs", 5, 12)).await;
        assert!(without.is_empty());
        assert_eq!(materializer.cache().stats().syntheses, 0);

        let with = svc
            .goto_definition(&request("/ws/a.cs", 5, 12).with_metadata(true))
            .await;
        let source = with.metadata_source.clone().unwrap();
        assert_eq!(source.module_name, "Acme.Core");
        assert_eq!(source.project_name, "app");
        assert_eq!(source.type_name, "Acme.Text.Foo");

        let document = materializer.cache().document_for_path(&metadata_path()).unwrap();
        let line = document.line(with.line.unwrap()).unwrap();
        assert!(line.contains("Bar()"), "{line}");
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_synthesis() {
        let (svc, materializer) = service(
            &[("/ws/a.cs", CALLER)],
            vec![manifest(true)],
            SynthesisStrategy::StubFromSignature,
        )
        .await;
        let req = request("/ws/a.cs", 5, 12).with_metadata(true);

        let (first, second) = tokio::join!(svc.goto_definition(&req), svc.goto_definition(&req));
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert_eq!(materializer.cache().stats().syntheses, 1);
        assert_eq!(materializer.cache().stats().documents, 1);
    }

    #[tokio::test]
    async fn test_decompile_budget_covers_tiny_timeouts() {
        let (decompile, materializer) = service(
            &[("/ws/a.cs", CALLER)],
            vec![manifest(true)],
            SynthesisStrategy::Decompile,
        )
        .await;
        let req = request("/ws/a.cs", 5, 12).with_metadata(true).with_timeout(1);
        let found = decompile.goto_definition(&req).await;
        assert!(!found.is_empty());
        let document = materializer.cache().document_for_path(&metadata_path()).unwrap();
        assert_eq!(document.strategy, SynthesisStrategy::Decompile);

        let (stub, _) = service(
            &[("/ws/a.cs", CALLER)],
            vec![manifest(true)],
            SynthesisStrategy::StubFromSignature,
        )
        .await;
        let stub_found = stub
            .goto_definition(&request("/ws/a.cs", 5, 12).with_metadata(true))
            .await;
        assert_eq!(found.metadata_source, stub_found.metadata_source);
    }

    #[tokio::test]
    async fn test_undecompilable_module_still_yields_stub() {
        let (svc, materializer) = service(
            &[("/ws/a.cs", CALLER)],
            vec![manifest(false)],
            SynthesisStrategy::Decompile,
        )
        .await;
        let found = svc
            .goto_definition(&request("/ws/a.cs", 5, 12).with_metadata(true))
            .await;
        assert!(!found.is_empty());
        let document = materializer.cache().document_for_path(&metadata_path()).unwrap();
        assert_eq!(document.strategy, SynthesisStrategy::StubFromSignature);
    }

    #[tokio::test]
    async fn test_static_call_with_five_parameters() {
        let module: ModuleManifest = serde_json::from_value(serde_json::json!({
            "name": "Acme.Core",
            "types": [{
                "namespace": "Acme.Text",
                "name": "Foo",
                "members": [{
                    "name": "Bar",
                    "type": "void",
                    "is_static": true,
                    "parameters": [
                        { "name": "a", "type": "int" },
                        { "name": "b", "type": "string" },
                        { "name": "c", "type": "bool" },
                        { "name": "d", "type": "double" },
                        { "name": "e", "type": "object" }
                    ]
                }]
            }]
        }))
        .unwrap();
        let source = "using Acme.Text;\nclass Program {\n    void Run() {\n        Foo.Bar(1, \"s\", true, 2.0, null);\n    }\n}\n";
        let (svc, materializer) = service(
            &[("/ws/a.cs", source)],
            vec![module],
            SynthesisStrategy::StubFromSignature,
        )
        .await;

        let response = svc
            .goto_definition(&request("/ws/a.cs", 3, 12).with_metadata(true))
            .await;
        let metadata = response.metadata_source.clone().unwrap();
        assert_eq!(metadata.type_name, "Acme.Text.Foo");
        let document = materializer.cache().document_for_path(&metadata_path()).unwrap();
        assert!(document.line(response.line.unwrap()).unwrap().contains("Bar"));
    }

    #[tokio::test]
    async fn test_string_literal_picks_string_overload() {
        let module: ModuleManifest = serde_json::from_value(serde_json::json!({
            "name": "Acme.Core",
            "types": [{
                "namespace": "Acme.Text",
                "name": "Foo",
                "members": [
                    {
                        "name": "Bar",
                        "type": "void",
                        "is_static": true,
                        "parameters": [{ "name": "a", "type": "int" }]
                    },
                    {
                        "name": "Bar",
                        "type": "void",
                        "is_static": true,
                        "parameters": [{ "name": "s", "type": "string" }]
                    }
                ]
            }]
        }))
        .unwrap();
        let source = "using Acme.Text;\nclass Program {\n    void Run() {\n        Foo.Bar(\"x\");\n        Foo.Bar(-1);\n    }\n}\n";
        let (svc, materializer) = service(
            &[("/ws/a.cs", source)],
            vec![module],
            SynthesisStrategy::StubFromSignature,
        )
        .await;

        let text = svc
            .goto_definition(&request("/ws/a.cs", 3, 12).with_metadata(true))
            .await;
        let number = svc
            .goto_definition(&request("/ws/a.cs", 4, 12).with_metadata(true))
            .await;
        let document = materializer.cache().document_for_path(&metadata_path()).unwrap();
        assert!(document.line(text.line.unwrap()).unwrap().contains("string s"));
        assert!(document.line(number.line.unwrap()).unwrap().contains("int a"));
    }

    #[tokio::test]
    async fn test_using_static_target_is_a_type() {
        let source = "using static Acme.Text.Foo;\nclass Program { }\n";
        let (svc, _) = service(
            &[("/ws/a.cs", source)],
            vec![manifest(true)],
            SynthesisStrategy::StubFromSignature,
        )
        .await;

        let response = svc
            .goto_definition(&request("/ws/a.cs", 0, 24).with_metadata(true))
            .await;
        let metadata = response.metadata_source.unwrap();
        assert_eq!(metadata.type_name, "Acme.Text.Foo");
        assert!(svc.goto_definition(&request("/ws/a.cs", 0, 19)).await.is_empty());
    }

    #[tokio::test]
    async fn test_definition_inside_synthesized_document() {
        let (svc, _) = service(
            &[("/ws/a.cs", CALLER)],
            vec![manifest(true)],
            SynthesisStrategy::StubFromSignature,
        )
        .await;
        let first = svc
            .goto_definition(&request("/ws/a.cs", 5, 12).with_metadata(true))
            .await;
        let position = first.position().unwrap();

        let path = metadata_path();
        let again = svc
            .goto_definition(
                &DefinitionRequest::new(path, position.line, position.column).with_metadata(true),
            )
            .await;
        assert_eq!(again, first);
    }
}

//! Data models for metanav
//!
//! Contains core type definitions used throughout the application.

pub mod call;
pub mod config;
pub mod definition;
pub mod diagnostic;
pub mod metadata;
pub mod module;
pub mod project;
pub mod symbol;

// Re-export commonly used types
pub use call::{CallShape, LiteralKind};
pub use config::NavConfig;
pub use definition::{DefinitionRequest, DefinitionResponse};
pub use diagnostic::{Diagnostic, DiagnosticSeverity, ProjectAnalyzed, ReAnalyzeRequest};
pub use metadata::{
    MaterializedDocument, MetadataKey, MetadataSource, MetadataSourceRequest,
    MetadataSourceResponse, SymbolAnchor, SynthesisStrategy,
};
pub use module::{ExternalMember, ExternalType, ExternalTypeRef, ModuleManifest};
pub use project::{ChangeBufferRequest, ProjectId, ProjectInfo};
pub use symbol::{Location, Position, Symbol, SymbolId, SymbolKind};

//! Service layer for metanav

pub mod config;
pub mod definition;
pub mod metadata;
pub mod provider;
pub mod reanalysis;

pub use config::{ConfigService, DefaultConfigService};
pub use definition::{DefaultDefinitionService, DefinitionService};
pub use metadata::{MaterializerOptions, MetadataCache, MetadataMaterializer, StrategyTable};
pub use provider::{Document, DocumentOrigin, SemanticProvider};
pub use reanalysis::{DefaultReAnalysisService, DiagnosticsService, ReAnalysisService};

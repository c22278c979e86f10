//! Def command implementation

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::ParsedLocation;
use crate::cli::response::{DefinitionOutput, LocationOutput};
use crate::models::definition::DefinitionRequest;
use crate::models::metadata::MetadataSourceRequest;
use crate::services::definition::DefinitionService;

#[derive(Args, Debug)]
pub struct DefArgs {
    /// Position (file:line:column, 1-based)
    pub location: String,

    /// Follow symbols declared in compiled modules into synthesized documents
    #[arg(long)]
    pub metadata: bool,

    /// Include the synthesized document text
    #[arg(long, requires = "metadata")]
    pub source: bool,

    /// Budget in milliseconds (default from config: navigation.timeout_ms)
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn execute(args: DefArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let location = ParsedLocation::parse(&args.location)?.resolve(app.root())?;
    let content = tokio::fs::read_to_string(&location.file).await?;
    location.validate_position_with_content(&content)?;

    let services = app.services().await?;
    let position = location.position();
    let timeout = args.timeout.unwrap_or(app.config().navigation.timeout_ms);
    let request = DefinitionRequest::new(&location.file, position.line, position.column)
        .with_metadata(args.metadata)
        .with_timeout(timeout);
    let response = services.definition.goto_definition(&request).await;

    let Some(position) = response.position() else {
        ctx.print_success_flat(DefinitionOutput::not_found());
        return Ok(());
    };

    let output = match response.metadata_source {
        Some(metadata_source) => {
            let source_request = MetadataSourceRequest {
                timeout_millis: timeout,
                ..MetadataSourceRequest::from(metadata_source.clone())
            };
            let fetched = services.materializer.fetch_source(&source_request).await;
            let file = fetched
                .as_ref()
                .map(|f| f.source_name.clone())
                .unwrap_or_else(|| metadata_source.type_name.clone());
            DefinitionOutput {
                found: true,
                definition: Some(LocationOutput::new(file, position.line + 1, position.column + 1)),
                metadata_source: Some(metadata_source),
                source: fetched.filter(|_| args.source).map(|f| f.source),
            }
        }
        None => {
            let file = response
                .file_name
                .as_deref()
                .map(|f| ctx.relative_path(Path::new(f)))
                .unwrap_or_default();
            DefinitionOutput {
                found: true,
                definition: Some(LocationOutput::new(file, position.line + 1, position.column + 1)),
                metadata_source: None,
                source: None,
            }
        }
    };
    ctx.print_success_flat(output);
    Ok(())
}

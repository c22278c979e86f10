//! Source command implementation
//!
//! Prints the document synthesized for a type of a compiled module.

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::response::SourceOutput;
use crate::models::metadata::MetadataSourceRequest;

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Project name
    pub project: String,

    /// Fully qualified type name (e.g. Acme.Text.Foo)
    #[arg(value_name = "TYPE")]
    pub type_name: String,

    /// Module declaring the type (default: first module that does)
    #[arg(short, long)]
    pub module: Option<String>,

    /// Budget in milliseconds (default from config: navigation.timeout_ms)
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn execute(args: SourceArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let services = app.services().await?;
    let request = MetadataSourceRequest {
        project_name: args.project,
        module_name: args.module,
        type_name: args.type_name,
        timeout_millis: args.timeout.unwrap_or(app.config().navigation.timeout_ms),
    };

    match services.materializer.fetch_source(&request).await {
        Some(response) => ctx.print_success_flat(SourceOutput {
            lines: response.source.lines().count(),
            source_name: response.source_name,
            source: response.source,
        }),
        None => ctx.print_error(&format!(
            "No source available for {} in project {}",
            request.type_name, request.project_name
        )),
    }
    Ok(())
}

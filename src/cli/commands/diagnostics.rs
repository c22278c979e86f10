//! Diagnostics command implementation

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::response::{DiagnosticOutput, DiagnosticsResponse};
use crate::models::diagnostic::DiagnosticSeverity;
use crate::services::reanalysis::DiagnosticsService;

#[derive(Args, Debug)]
pub struct DiagnosticsArgs {
    /// File path to check
    pub file: PathBuf,

    /// Errors only
    #[arg(long)]
    pub errors: bool,
}

pub async fn execute(args: DiagnosticsArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let file = app.root().join(&args.file);
    let file = tokio::fs::canonicalize(&file)
        .await
        .map_err(|_| anyhow::anyhow!("File not found: {}", file.display()))?;

    let services = app.services().await?;
    match services.reanalysis.code_check(&file).await {
        Ok(diagnostics) => {
            let diagnostics: Vec<DiagnosticOutput> = diagnostics
                .iter()
                .filter(|d| !args.errors || d.severity == DiagnosticSeverity::Error)
                .map(DiagnosticOutput::from)
                .collect();
            ctx.print_success_flat(DiagnosticsResponse {
                file: ctx.relative_path(&file),
                count: diagnostics.len(),
                diagnostics,
            });
        }
        Err(e) => ctx.print_error(&e.to_string()),
    }
    Ok(())
}

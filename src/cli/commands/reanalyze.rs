//! Reanalyze command implementation

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::response::ReanalyzeResponse;
use crate::models::diagnostic::ReAnalyzeRequest;
use crate::services::reanalysis::ReAnalysisService;

#[derive(Args, Debug)]
pub struct ReanalyzeArgs {
    /// A file of the project to re-analyze, or its project file (default: every project)
    #[arg(long)]
    pub context: Option<PathBuf>,
}

pub async fn execute(args: ReanalyzeArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let request = match args.context {
        Some(path) => {
            let path = app.root().join(path);
            // Unknown paths are passed through and widen to every project.
            let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
            ReAnalyzeRequest::for_file(path)
        }
        None => ReAnalyzeRequest::all(),
    };

    let services = app.services().await?;
    match services.reanalysis.reanalyze(&request).await {
        Ok(events) => {
            let projects: Vec<String> = events
                .iter()
                .map(|e| ctx.relative_path(&e.project_file_path))
                .collect();
            ctx.print_success_flat(ReanalyzeResponse {
                count: projects.len(),
                projects,
            });
        }
        Err(e) => ctx.print_error(&e.to_string()),
    }
    Ok(())
}

//! metanav - go-to-definition CLI for C# workspaces
//!
//! Prints JSON on stdout; logs go to stderr.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metanav::app::App;
use metanav::cli::{Cli, Commands};

fn main() {
    // Quiet by default; RUST_LOG=metanav=debug for verbose output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metanav=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!(
                r#"{{"success":false,"error":"Failed to create runtime: {}"}}"#,
                e
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main()) {
        let response = serde_json::json!({
            "success": false,
            "error": e.to_string()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&response)
                .unwrap_or_else(|_| format!(r#"{{"success":false,"error":"{}"}}"#, e))
        );
        std::process::exit(2);
    }
}

async fn async_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app = App::new(cli.root, cli.decompile)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize: {}", e))?;

    execute_command(cli.command, &app).await
}

async fn execute_command(command: Commands, app: &App) -> anyhow::Result<()> {
    use metanav::cli::commands;

    match command {
        Commands::Def(args) => commands::definition::execute(args, app).await,
        Commands::Source(args) => commands::source::execute(args, app).await,
        Commands::Diagnostics(args) => commands::diagnostics::execute(args, app).await,
        Commands::Reanalyze(args) => commands::reanalyze::execute(args, app).await,
        Commands::Config(args) => commands::config::execute(args, app).await,
    }
}

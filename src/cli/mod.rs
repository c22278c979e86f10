//! CLI module for metanav
//!
//! Provides command-line interface using clap derive macros.

pub mod commands;
pub mod location;
pub mod output;
pub mod response;

pub use location::ParsedLocation;
pub use output::OutputContext;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{
    config::ConfigArgs, definition::DefArgs, diagnostics::DiagnosticsArgs,
    reanalyze::ReanalyzeArgs, source::SourceArgs,
};

const LONG_ABOUT: &str = r#"
metanav - go-to-definition for C# workspaces

Resolves the symbol at a position and prints where it is declared. Symbols
declared in compiled modules are shown as documents synthesized from the
module manifest (*.module.json).

QUICK START:
  metanav def src/Program.cs:12:9                 # Declaration in source
  metanav def src/Program.cs:12:9 --metadata      # Also follow into modules
  metanav source app Acme.Text.Foo                # Print a synthesized document
  metanav diagnostics src/Program.cs              # Code check
  metanav reanalyze --context src/Program.cs      # Re-analyze one project

Lines and columns are 1-based.
"#;

/// metanav - go-to-definition for C# workspaces
#[derive(Parser, Debug)]
#[command(name = "metanav")]
#[command(author, version, about, long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
#[command(after_help = "Use 'metanav <COMMAND> --help' for more information about a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root (default: current directory)
    #[arg(long, global = true, env = "METANAV_ROOT")]
    pub root: Option<PathBuf>,

    /// Reconstruct member bodies when synthesizing documents
    #[arg(long, global = true)]
    pub decompile: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Go to the definition of the symbol at a position
    Def(DefArgs),

    /// Print the document synthesized for a type of a compiled module
    Source(SourceArgs),

    /// Diagnostics of a file
    Diagnostics(DiagnosticsArgs),

    /// Recompute diagnostics and print the projects analyzed
    Reanalyze(ReanalyzeArgs),

    /// Configuration management
    Config(ConfigArgs),
}

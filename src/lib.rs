//! metanav - go-to-definition for C# workspaces
//!
//! Resolves the symbol under a position and answers with its declaration in
//! source, or with a document synthesized on demand from the compiled module
//! that declares it.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod models;
pub mod services;

pub use error::{NavError, NavResult};

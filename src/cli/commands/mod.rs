//! Command implementations for metanav
//!
//! Each command is implemented in its own module.

pub mod config;
pub mod definition;
pub mod diagnostics;
pub mod reanalyze;
pub mod source;

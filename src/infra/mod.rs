//! Infrastructure layer for metanav
//!
//! C# parsing and the in-memory workspace backing the semantic provider.

pub mod csharp;
pub mod workspace;

//! Error types for metanav

use std::path::PathBuf;

use thiserror::Error;

pub type NavResult<T> = std::result::Result<T, NavError>;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("{0}")]
    Workspace(#[from] WorkspaceError),

    #[error("{0}")]
    Synthesis(#[from] SynthesisError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure to produce a materialized document.
///
/// Cloneable because one synthesis outcome is handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("Synthesis of {type_name} exceeded its {budget_ms}ms budget")]
    Timeout { type_name: String, budget_ms: u64 },

    #[error("Module {0} cannot be decompiled")]
    Unsupported(String),

    #[error("Type {type_name} not found in module {module}")]
    TypeNotFound { module: String, type_name: String },

    #[error("Decompilation failed: {0}")]
    Decompile(String),

    #[error("Project is no longer loaded")]
    ProjectUnavailable,

    #[error("Synthesis abandoned before completion")]
    Abandoned,
}

impl SynthesisError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Decompiler failures that the declaration-only view can still cover.
    pub fn falls_back_to_stub(&self) -> bool {
        matches!(self, Self::Unsupported(_) | Self::Decompile(_))
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Document not found in workspace: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Failed to parse {}", .0.display())]
    Parse(PathBuf),

    #[error("Failed to load C# grammar: {0}")]
    Grammar(String),

    #[error("Invalid module manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_does_not_fall_back() {
        let err = SynthesisError::Timeout {
            type_name: "Acme.Foo".to_string(),
            budget_ms: 10,
        };
        assert!(err.is_timeout());
        assert!(!err.falls_back_to_stub());
    }

    #[test]
    fn test_decompiler_failures_fall_back() {
        assert!(SynthesisError::Unsupported("Acme.Core".into()).falls_back_to_stub());
        assert!(SynthesisError::Decompile("bad IL".into()).falls_back_to_stub());
        assert!(!SynthesisError::ProjectUnavailable.falls_back_to_stub());
        assert!(
            !SynthesisError::TypeNotFound {
                module: "m".into(),
                type_name: "t".into()
            }
            .falls_back_to_stub()
        );
    }

    #[test]
    fn test_nested_error_messages_pass_through() {
        let err: NavError = WorkspaceError::ProjectNotFound("app".into()).into();
        assert_eq!(err.to_string(), "Project not found: app");

        let err: NavError = SynthesisError::Unsupported("Acme.Core".into()).into();
        assert_eq!(err.to_string(), "Module Acme.Core cannot be decompiled");
    }
}

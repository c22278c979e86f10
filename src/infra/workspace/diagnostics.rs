//! Compiler-style diagnostics derived from the declaration index

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::resolve::{Binder, Scope};
use crate::infra::csharp::ParsedDocument;
use crate::infra::csharp::syntax::simple_type_name;
use crate::models::diagnostic::{Diagnostic, UNRESOLVED_TYPE_CODE};
use crate::models::project::ProjectId;

const MISSING_SEMICOLON_CODE: &str = "CS1002";
const MISSING_TOKEN_CODE: &str = "CS1003";

/// Diagnostics of one project at one snapshot.
#[derive(Debug, Clone)]
pub struct ProjectDiagnostics {
    pub project: ProjectId,
    pub project_file_path: PathBuf,
    pub version: u64,
    pub files: BTreeMap<PathBuf, Vec<Diagnostic>>,
}

impl ProjectDiagnostics {
    pub fn total(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

pub(crate) fn document_diagnostics(
    binder: &Binder<'_>,
    path: &Path,
    doc: &ParsedDocument,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for issue in &doc.index.syntax_issues {
        let diagnostic = match issue.missing.as_deref() {
            Some(";") => Diagnostic::error(
                path.to_path_buf(),
                issue.start,
                issue.end,
                "; expected".to_string(),
            )
            .with_code(MISSING_SEMICOLON_CODE),
            Some(token) => Diagnostic::error(
                path.to_path_buf(),
                issue.start,
                issue.end,
                format!("Syntax error, '{}' expected", token),
            )
            .with_code(MISSING_TOKEN_CODE),
            None => Diagnostic::error(
                path.to_path_buf(),
                issue.start,
                issue.end,
                "Syntax error".to_string(),
            ),
        };
        diagnostics.push(diagnostic);
    }

    for reference in &doc.index.type_references {
        let name = simple_type_name(&reference.name);
        if doc.index.type_parameters.contains(name) {
            continue;
        }
        let scope = Scope {
            namespace: reference.namespace.clone(),
            container: reference.container.clone(),
            usings: &doc.index.usings,
        };
        if binder.resolve_type(&reference.name, &scope).is_none()
            && !binder.may_bind_to_framework(&reference.name, &scope)
        {
            diagnostics.push(
                Diagnostic::error(
                    path.to_path_buf(),
                    reference.start,
                    reference.end,
                    format!(
                        "The type or namespace name '{}' could not be found (are you missing a using directive or an assembly reference?)",
                        name
                    ),
                )
                .with_code(UNRESOLVED_TYPE_CODE),
            );
        }
    }

    diagnostics.sort_by_key(|d| d.start);
    diagnostics
}

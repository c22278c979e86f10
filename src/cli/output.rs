//! Output formatting for CLI commands

use std::path::{Path, PathBuf};

use serde::Serialize;

/// JSON envelope shared by every command.
#[derive(Debug, Clone)]
pub struct OutputContext {
    /// Workspace root for relative path calculation
    root: PathBuf,
}

impl OutputContext {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the root when inside it; synthesized paths are left as is.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }

    /// `{"success": true, "data": ...}`
    pub fn print_success<T: Serialize>(&self, data: T) {
        let response = serde_json::json!({
            "success": true,
            "data": data
        });
        print_json(&response);
    }

    /// Data fields at top level next to `success`.
    pub fn print_success_flat<T: Serialize>(&self, data: T) {
        let mut response = serde_json::to_value(data).unwrap_or(serde_json::json!({}));
        if let Some(obj) = response.as_object_mut() {
            obj.insert("success".to_string(), serde_json::json!(true));
        }
        print_json(&response);
    }

    pub fn print_error(&self, message: &str) {
        let response = serde_json::json!({
            "success": false,
            "error": message
        });
        print_json(&response);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let ctx = OutputContext::new(PathBuf::from("/ws"));
        assert_eq!(ctx.relative_path(Path::new("/ws/src/A.cs")), "src/A.cs");
        assert_eq!(ctx.relative_path(Path::new("/other/B.cs")), "/other/B.cs");
    }

    #[test]
    fn test_synthesized_paths_are_kept() {
        let ctx = OutputContext::new(PathBuf::from("/ws"));
        let path = Path::new("$metadata$/Project/app/Assembly/Acme.Core/Symbol/Acme/Text/Foo.cs");
        assert_eq!(ctx.relative_path(path), path.display().to_string());
    }
}

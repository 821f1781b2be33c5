//! Local provider for offline runs
//!
//! No model is consulted. Only import specifiers that can be read off a
//! single line are reported, so non-Python files still get IMPORTS edges.

use anyhow::Result;

use super::super::bridge::{AnalysisProvider, FileAnalysis};

pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// First quoted string on the line, either quote style.
fn quoted(line: &str) -> Option<&str> {
    let start = line.find(['"', '\''])?;
    let quote = line[start..].chars().next()?;
    let rest = &line[start + 1..];
    let end = rest.find(quote)?;
    Some(&rest[..end]).filter(|s| !s.is_empty())
}

/// Heuristic import specifier for one source line.
fn import_specifier(line: &str) -> Option<String> {
    let line = line.trim();
    if line.starts_with("#include") {
        return quoted(line).map(str::to_string);
    }
    if line.starts_with("import ") || (line.starts_with("export ") && line.contains(" from ")) {
        return quoted(line).map(str::to_string);
    }
    if line.contains("require(") {
        let after = &line[line.find("require(")? + "require(".len()..];
        return quoted(after).map(str::to_string);
    }
    None
}

#[async_trait::async_trait]
impl AnalysisProvider for LocalProvider {
    async fn analyze_file(&self, content: &str, _file_type: &str) -> Result<FileAnalysis> {
        let mut imports: Vec<String> = Vec::new();
        for spec in content.lines().filter_map(import_specifier) {
            if !imports.contains(&spec) {
                imports.push(spec);
            }
        }
        Ok(FileAnalysis {
            imports,
            ..FileAnalysis::default()
        })
    }

    fn name(&self) -> &str {
        "Local"
    }
}

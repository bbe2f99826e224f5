//
// types.rs
//
// Value types shared by the search engine, classifier and LSP glue
//

use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::{Location, Position, Range, Url};

/// A line in a file on disk. Columns are not tracked; every location
/// is presented to the editor at column 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// Zero-based line number
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Convert to an LSP location. Returns `None` for paths that cannot be
    /// expressed as `file://` URLs (relative paths).
    pub fn to_lsp_location(&self) -> Option<Location> {
        let uri = Url::from_file_path(&self.file).ok()?;
        let position = Position::new(self.line, 0);
        Some(Location::new(uri, Range::new(position, position)))
    }
}

/// Result of one query: the name that was searched and every location that
/// matched, in file-scan order then line order. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub query_name: String,
    pub locations: Vec<SourceLocation>,
}

impl SearchResult {
    pub fn new(query_name: impl Into<String>, locations: Vec<SourceLocation>) -> Self {
        Self {
            query_name: query_name.into(),
            locations,
        }
    }

    pub fn empty(query_name: impl Into<String>) -> Self {
        Self::new(query_name, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }
}

/// "template X defined within WorkflowTemplate Y"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRefContext {
    pub workflow_template_name: String,
    pub template_name: String,
}

impl TemplateRefContext {
    pub fn new(workflow_template_name: impl Into<String>, template_name: impl Into<String>) -> Self {
        Self {
            workflow_template_name: workflow_template_name.into(),
            template_name: template_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_converts_at_column_zero() {
        let dir = tempfile::tempdir().unwrap();
        let loc = SourceLocation::new(dir.path().join("a.yaml"), 7);
        let lsp = loc.to_lsp_location().unwrap();
        assert_eq!(lsp.range.start, Position::new(7, 0));
        assert_eq!(lsp.range.end, Position::new(7, 0));
        assert!(lsp.uri.as_str().ends_with("/a.yaml"));
    }

    #[test]
    fn test_relative_path_has_no_lsp_location() {
        let loc = SourceLocation::new("relative/a.yaml", 0);
        assert!(loc.to_lsp_location().is_none());
    }

    #[test]
    fn test_search_result_keeps_duplicates() {
        let loc = SourceLocation::new("/w/a.yaml", 3);
        let result = SearchResult::new("greet", vec![loc.clone(), loc]);
        assert_eq!(result.len(), 2);
        assert!(!result.is_empty());
        assert!(SearchResult::empty("x").is_empty());
    }
}

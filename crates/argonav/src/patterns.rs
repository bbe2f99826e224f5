//
// patterns.rs
//
// Line patterns that recognize Argo WorkflowTemplate constructs in raw YAML
//

use regex::Regex;
use std::sync::OnceLock;

pub const WORKFLOW_TEMPLATE_KIND: &str = "kind: WorkflowTemplate";
pub const KIND: &str = "kind:";
pub const API_VERSION: &str = "apiVersion:";
pub const DOCUMENT_SEPARATOR: &str = "---";
pub const METADATA: &str = "metadata:";
pub const SPEC: &str = "spec:";
pub const STATUS: &str = "status:";
pub const TEMPLATES: &str = "templates:";
pub const TEMPLATE_REF: &str = "templateRef:";
pub const WORKFLOW_TEMPLATE_REF: &str = "workflowTemplateRef:";
pub const NAME: &str = "name:";
pub const TEMPLATE: &str = "template:";

/// Compiled regex patterns for line classification
struct LinePatterns {
    name_value: Regex,
    template_value: Regex,
    list_entry_name: Regex,
    new_list_item: Regex,
    token: Regex,
}

fn patterns() -> &'static LinePatterns {
    static PATTERNS: OnceLock<LinePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinePatterns {
        name_value: Regex::new(r##"name:\s*['"]?([^'"#\s]+)['"]?\s*(?:#.*)?$"##).unwrap(),
        template_value: Regex::new(r##"template:\s*['"]?([^'"#\s]+)['"]?\s*(?:#.*)?$"##).unwrap(),
        list_entry_name: Regex::new(r"^\s*-\s+name:\s*(.+)$").unwrap(),
        new_list_item: Regex::new(r"^\s*-\s+(?:name:|-)").unwrap(),
        token: Regex::new(r#""[^"]+"|'[^']+'|[\w-]+"#).unwrap(),
    })
}

/// Value of a `name:` key, with quotes and a trailing comment stripped
pub fn extract_name(line: &str) -> Option<&str> {
    patterns()
        .name_value
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Value of a `template:` key, with quotes and a trailing comment stripped
pub fn extract_template(line: &str) -> Option<&str> {
    patterns()
        .template_value
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Raw text after `- name:` when the line is a list entry
pub fn list_entry_name(line: &str) -> Option<&str> {
    patterns()
        .list_entry_name
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A `- name:` or `- -` line, which starts a new step
pub fn is_new_list_item(line: &str) -> bool {
    patterns().new_list_item.is_match(line)
}

/// Pattern matching the `- name: <name>` entry of a templates list
pub fn template_entry_pattern(name: &str) -> Regex {
    let pattern = format!(r"^\s*-\s+name:\s*{}\s*(?:#.*)?$", regex::escape(name));
    // An escaped literal always compiles
    Regex::new(&pattern).unwrap()
}

/// Token under the byte offset `column`: a quoted string or a run of word
/// characters and hyphens. Quotes are stripped.
pub fn token_at(line: &str, column: usize) -> Option<String> {
    patterns()
        .token
        .find_iter(line)
        .find(|m| m.start() <= column && column <= m.end())
        .map(|m| m.as_str().replace(['"', '\''], ""))
}

/// First line of a document that starts a new YAML document block
pub fn is_block_boundary(lines: &[&str], index: usize) -> bool {
    let line = lines[index];
    line.starts_with(KIND)
        || (line.starts_with(API_VERSION)
            && index > 0
            && lines[index - 1] == DOCUMENT_SEPARATOR)
}

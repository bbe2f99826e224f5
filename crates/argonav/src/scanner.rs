//
// scanner.rs
//
// Per-file symbol rules: where WorkflowTemplates and their templates are
// defined and referenced within one document's text
//

use crate::config::{TEMPLATE_REF_BLOCK_LINES, WORKFLOW_TEMPLATE_REF_LOOKAHEAD};
use crate::patterns::{
    extract_name, extract_template, is_block_boundary, is_new_list_item, template_entry_pattern,
    METADATA, NAME, TEMPLATE, TEMPLATES, TEMPLATE_REF, WORKFLOW_TEMPLATE_KIND,
    WORKFLOW_TEMPLATE_REF,
};

/// Rules that locate symbols inside a single document.
///
/// All methods return zero-based line numbers in document order. The search
/// engine only talks to this trait, so the line heuristics can be swapped
/// for a structured parser without touching callers.
pub trait SymbolRules: Send + Sync {
    /// Metadata `name:` lines of WorkflowTemplates called `name`
    fn workflow_template_definitions(&self, text: &str, name: &str) -> Vec<u32>;

    /// The `- name:` entry of `template` inside WorkflowTemplate `workflow_template`
    fn template_definition(&self, text: &str, workflow_template: &str, template: &str)
        -> Option<u32>;

    /// `template:` lines of `templateRef` blocks pointing at `workflow_template`/`template`
    fn template_references(&self, text: &str, workflow_template: &str, template: &str)
        -> Vec<u32>;

    /// `name:` lines of `templateRef` and `workflowTemplateRef` blocks naming `workflow_template`
    fn workflow_template_references(&self, text: &str, workflow_template: &str) -> Vec<u32>;
}

/// Line-pattern implementation of [`SymbolRules`]
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicRules;

/// Names pulled out of the lines following a `templateRef:` marker
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TemplateRefBlock<'a> {
    pub workflow_template: Option<(&'a str, u32)>,
    pub template: Option<(&'a str, u32)>,
}

/// Parse the block that follows the `templateRef:` line at `ref_line`.
///
/// Looks at up to [`TEMPLATE_REF_BLOCK_LINES`] lines and stops early at a new
/// list item after the first line. The WorkflowTemplate name is taken from
/// the first `name:` line that is not a `template:` line.
pub fn parse_template_ref_block<'a>(lines: &[&'a str], ref_line: usize) -> TemplateRefBlock<'a> {
    let mut block = TemplateRefBlock::default();
    let mut name_seen = false;

    for offset in 1..=TEMPLATE_REF_BLOCK_LINES {
        let index = ref_line + offset;
        let Some(line) = lines.get(index) else {
            break;
        };
        if offset > 1 && is_new_list_item(line) {
            break;
        }

        if line.contains(TEMPLATE) {
            if block.template.is_none() {
                block.template = extract_template(line).map(|t| (t, index as u32));
            }
        } else if line.contains(NAME) && !name_seen {
            name_seen = true;
            block.workflow_template = extract_name(line).map(|n| (n, index as u32));
        }
    }

    block
}

/// First line at or after `start` whose previous line contains `metadata:`
/// and whose `name:` value is exactly `name`.
pub fn find_metadata_name(lines: &[&str], start: usize, name: &str) -> Option<usize> {
    (start.max(1)..lines.len()).find(|&j| {
        lines[j - 1].contains(METADATA) && extract_name(lines[j]) == Some(name)
    })
}

/// End (exclusive) of the document block whose `kind:` marker is at `kind_line`
pub fn block_end(lines: &[&str], kind_line: usize) -> usize {
    (kind_line + 1..lines.len())
        .find(|&j| is_block_boundary(lines, j))
        .unwrap_or(lines.len())
}

impl SymbolRules for HeuristicRules {
    fn workflow_template_definitions(&self, text: &str, name: &str) -> Vec<u32> {
        let lines: Vec<&str> = text.lines().collect();

        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(WORKFLOW_TEMPLATE_KIND))
            .filter_map(|(start, _)| find_metadata_name(&lines, start, name))
            .map(|j| j as u32)
            .collect()
    }

    fn template_definition(
        &self,
        text: &str,
        workflow_template: &str,
        template: &str,
    ) -> Option<u32> {
        let lines: Vec<&str> = text.lines().collect();
        let entry = template_entry_pattern(template);

        for (kind_line, line) in lines.iter().enumerate() {
            if !line.contains(WORKFLOW_TEMPLATE_KIND) {
                continue;
            }
            let end = block_end(&lines, kind_line);
            let Some(name_line) = find_metadata_name(&lines, kind_line, workflow_template) else {
                continue;
            };
            // The name belongs to a later document
            if name_line >= end {
                continue;
            }
            let Some(section) = (kind_line..end).find(|&j| lines[j].contains(TEMPLATES)) else {
                continue;
            };
            if let Some(j) = (section + 1..end).find(|&j| entry.is_match(lines[j])) {
                return Some(j as u32);
            }
        }

        None
    }

    fn template_references(&self, text: &str, workflow_template: &str, template: &str) -> Vec<u32> {
        let lines: Vec<&str> = text.lines().collect();
        let mut found = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if !line.contains(TEMPLATE_REF) {
                continue;
            }
            let block = parse_template_ref_block(&lines, i);
            if let (Some((wft, _)), Some((tpl, tpl_line))) = (block.workflow_template, block.template)
            {
                if wft == workflow_template && tpl == template {
                    found.push(tpl_line);
                }
            }
        }

        found
    }

    fn workflow_template_references(&self, text: &str, workflow_template: &str) -> Vec<u32> {
        let lines: Vec<&str> = text.lines().collect();
        let mut found = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if line.contains(TEMPLATE_REF) {
                let block = parse_template_ref_block(&lines, i);
                if let Some((wft, name_line)) = block.workflow_template {
                    if wft == workflow_template {
                        found.push(name_line);
                    }
                }
            }

            if line.contains(WORKFLOW_TEMPLATE_REF) {
                let window = i + 1..(i + 1 + WORKFLOW_TEMPLATE_REF_LOOKAHEAD).min(lines.len());
                if let Some(j) = window.into_iter().find(|&j| {
                    lines[j].contains(NAME) && extract_name(lines[j]) == Some(workflow_template)
                }) {
                    found.push(j as u32);
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = "\
apiVersion: argoproj.io/v1alpha1
kind: WorkflowTemplate
metadata:
  name: greet
spec:
  templates:
  - name: say-hello
    container:
      image: alpine
  - name: say-bye   # farewell
    container:
      image: alpine
---
apiVersion: argoproj.io/v1alpha1
kind: WorkflowTemplate
metadata:
  name: other
spec:
  templates:
  - name: say-hello
";

    const CALLER: &str = "\
apiVersion: argoproj.io/v1alpha1
kind: Workflow
metadata:
  generateName: caller-
spec:
  templates:
  - name: main
    steps:
    - - name: first
        templateRef:
          name: greet
          template: say-hello
      - name: second
        templateRef:
          name: other
          template: say-hello
  - name: dag
    workflowTemplateRef:
      name: greet
";

    #[test]
    fn test_definition_found_at_name_line() {
        let text = "apiVersion: v1\nkind: WorkflowTemplate\nmetadata:\n  name: greet\n";
        assert_eq!(HeuristicRules.workflow_template_definitions(text, "greet"), vec![3]);
    }

    #[test]
    fn test_definition_per_block() {
        assert_eq!(HeuristicRules.workflow_template_definitions(LIBRARY, "greet"), vec![3]);
        assert!(HeuristicRules.workflow_template_definitions(LIBRARY, "gree").is_empty());
    }

    #[test]
    fn test_definition_scan_crosses_into_later_blocks() {
        // Both `kind:` markers scan forward to the second block's name
        assert_eq!(
            HeuristicRules.workflow_template_definitions(LIBRARY, "other"),
            vec![16, 16]
        );
    }

    #[test]
    fn test_definition_requires_metadata_on_previous_line() {
        let text = "kind: WorkflowTemplate\nmetadata:\n  labels:\n    a: b\n  name: greet\n";
        assert!(HeuristicRules.workflow_template_definitions(text, "greet").is_empty());
    }

    #[test]
    fn test_definition_ignores_other_kinds() {
        assert!(HeuristicRules.workflow_template_definitions(CALLER, "caller-").is_empty());
    }

    #[test]
    fn test_template_definition_within_named_block() {
        assert_eq!(
            HeuristicRules.template_definition(LIBRARY, "greet", "say-hello"),
            Some(6)
        );
        assert_eq!(
            HeuristicRules.template_definition(LIBRARY, "greet", "say-bye"),
            Some(9)
        );
        assert_eq!(
            HeuristicRules.template_definition(LIBRARY, "other", "say-hello"),
            Some(19)
        );
        assert_eq!(HeuristicRules.template_definition(LIBRARY, "other", "say-bye"), None);
        assert_eq!(HeuristicRules.template_definition(LIBRARY, "missing", "say-hello"), None);
    }

    #[test]
    fn test_block_end_at_separator_or_kind() {
        let lines: Vec<&str> = LIBRARY.lines().collect();
        assert_eq!(block_end(&lines, 1), 13);
        assert_eq!(block_end(&lines, 14), lines.len());
    }

    #[test]
    fn test_template_references_point_at_template_line() {
        assert_eq!(
            HeuristicRules.template_references(CALLER, "greet", "say-hello"),
            vec![11]
        );
        assert_eq!(
            HeuristicRules.template_references(CALLER, "other", "say-hello"),
            vec![15]
        );
        assert!(HeuristicRules
            .template_references(CALLER, "greet", "say-bye")
            .is_empty());
    }

    #[test]
    fn test_template_ref_block_stops_at_next_step() {
        let lines: Vec<&str> = CALLER.lines().collect();
        let block = parse_template_ref_block(&lines, 9);
        assert_eq!(block.workflow_template, Some(("greet", 10)));
        assert_eq!(block.template, Some(("say-hello", 11)));
    }

    #[test]
    fn test_template_ref_block_name_after_template() {
        let text = "templateRef:\n  template: t\n  name: wft\n";
        let lines: Vec<&str> = text.lines().collect();
        let block = parse_template_ref_block(&lines, 0);
        assert_eq!(block.workflow_template, Some(("wft", 2)));
        assert_eq!(block.template, Some(("t", 1)));
    }

    #[test]
    fn test_workflow_template_references_from_both_markers() {
        assert_eq!(
            HeuristicRules.workflow_template_references(CALLER, "greet"),
            vec![10, 18]
        );
        assert_eq!(
            HeuristicRules.workflow_template_references(CALLER, "other"),
            vec![14]
        );
    }

    #[test]
    fn test_workflow_template_ref_lookahead_is_bounded() {
        let near = "workflowTemplateRef:\n  a: 1\n  b: 2\n  c: 3\n  d: 4\n  name: near\n";
        assert_eq!(HeuristicRules.workflow_template_references(near, "near"), vec![5]);

        let text = "workflowTemplateRef:\n  a: 1\n  b: 2\n  c: 3\n  d: 4\n  e: 5\n  name: far\n";
        assert!(HeuristicRules
            .workflow_template_references(text, "far")
            .is_empty());
    }

    fn template_ref_with_gap(gap: usize) -> String {
        let mut lines = vec!["templateRef:".to_string()];
        lines.extend((0..gap).map(|i| format!("  k{i}: v")));
        lines.push("  name: wft".to_string());
        lines.push("  template: t".to_string());
        lines.join("\n")
    }

    #[test]
    fn test_template_ref_block_is_bounded() {
        // `name:` on the last line of the block, `template:` just past it
        let text = template_ref_with_gap(TEMPLATE_REF_BLOCK_LINES - 1);
        let lines: Vec<&str> = text.lines().collect();
        let block = parse_template_ref_block(&lines, 0);
        assert_eq!(block.workflow_template, Some(("wft", TEMPLATE_REF_BLOCK_LINES as u32)));
        assert_eq!(block.template, None);
        assert_eq!(
            HeuristicRules.workflow_template_references(&text, "wft"),
            vec![TEMPLATE_REF_BLOCK_LINES as u32]
        );
        assert!(HeuristicRules.template_references(&text, "wft", "t").is_empty());

        let text = template_ref_with_gap(TEMPLATE_REF_BLOCK_LINES);
        let lines: Vec<&str> = text.lines().collect();
        let block = parse_template_ref_block(&lines, 0);
        assert_eq!(block.workflow_template, None);
        assert!(HeuristicRules.workflow_template_references(&text, "wft").is_empty());
    }

    #[test]
    fn test_template_ref_block_holds_both_keys() {
        let text = template_ref_with_gap(TEMPLATE_REF_BLOCK_LINES - 2);
        assert_eq!(
            HeuristicRules.template_references(&text, "wft", "t"),
            vec![TEMPLATE_REF_BLOCK_LINES as u32]
        );
    }

    #[test]
    fn test_overlapping_markers_are_not_deduplicated() {
        let text = "\
workflowTemplateRef:
  x: 1
templateRef:
  name: wft
  template: t
";
        assert_eq!(
            HeuristicRules.workflow_template_references(text, "wft"),
            vec![3, 3]
        );
    }
}

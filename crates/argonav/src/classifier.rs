//
// classifier.rs
//
// Decide what the cursor is pointing at and which workspace query answers it
//

use crate::config::{
    METADATA_LOOKBACK, MIN_NAME_LENGTH, TEMPLATES_SECTION_LOOKBACK, TEMPLATE_REF_INNER_LOOKBACK,
    TEMPLATE_REF_OUTER_LOOKBACK, TEMPLATE_REF_SIBLING_LOOKAHEAD, WORKFLOW_TEMPLATE_NAME_LOOKAHEAD,
};
use crate::patterns::{
    extract_name, extract_template, list_entry_name, token_at, API_VERSION, KIND, METADATA, NAME,
    SPEC, STATUS, TEMPLATE, TEMPLATES, TEMPLATE_REF, WORKFLOW_TEMPLATE_KIND,
};
use crate::search::SymbolQuery;
use crate::types::TemplateRefContext;
use crate::utf16::utf16_column_to_byte_offset;

/// What the cursor is on. Variants are listed in rule precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationContext {
    /// A `- name:` entry in the templates list of a WorkflowTemplate
    TemplateDefinition(TemplateRefContext),
    /// The metadata name of a WorkflowTemplate
    WorkflowTemplateDefinition(String),
    /// The `template:` line of a `templateRef` block
    TemplateReference(TemplateRefContext),
    /// The `name:` line of a `templateRef` block
    WorkflowTemplateReference(String),
    /// Any other identifier-like token
    Name(String),
}

impl NavigationContext {
    /// Workspace query that answers this context
    pub fn query(&self) -> SymbolQuery {
        match self {
            NavigationContext::TemplateDefinition(ctx) => SymbolQuery::TemplateReferences(ctx.clone()),
            NavigationContext::WorkflowTemplateDefinition(name) => {
                SymbolQuery::WorkflowTemplateReferences {
                    workflow_template_name: name.clone(),
                }
            }
            NavigationContext::TemplateReference(ctx) => {
                SymbolQuery::TemplateInWorkflowTemplate(ctx.clone())
            }
            NavigationContext::WorkflowTemplateReference(name) | NavigationContext::Name(name) => {
                SymbolQuery::Definition { name: name.clone() }
            }
        }
    }

    /// Definition sites are answered with references, everything else with definitions
    pub fn is_definition_site(&self) -> bool {
        matches!(
            self,
            NavigationContext::TemplateDefinition(_)
                | NavigationContext::WorkflowTemplateDefinition(_)
        )
    }
}

/// Classify the cursor at `line` / `utf16_col` (LSP units) in `text`.
///
/// Rules are tried in order and the first match wins:
///
/// 1. `- name:` entry under `templates:` in a WorkflowTemplate
/// 2. `name:` under the `metadata:` of a WorkflowTemplate
/// 3. `template:` inside a `templateRef` block
/// 4. `name:` inside a `templateRef` block
/// 5. the token under the cursor, if at least two characters long
pub fn classify(text: &str, line: u32, utf16_col: u32) -> Option<NavigationContext> {
    let lines: Vec<&str> = text.lines().collect();
    let index = line as usize;
    let current = *lines.get(index)?;

    if let Some(ctx) = template_definition_context(&lines, index) {
        return Some(NavigationContext::TemplateDefinition(ctx));
    }
    if let Some(name) = workflow_template_definition_context(&lines, index) {
        return Some(NavigationContext::WorkflowTemplateDefinition(name.to_string()));
    }
    if let Some(ctx) = template_reference_context(&lines, index) {
        return Some(NavigationContext::TemplateReference(ctx));
    }
    if let Some(name) = workflow_template_reference_context(&lines, index) {
        return Some(NavigationContext::WorkflowTemplateReference(name.to_string()));
    }

    let column = utf16_column_to_byte_offset(current, utf16_col);
    token_at(current, column)
        .filter(|token| token.chars().count() >= MIN_NAME_LENGTH)
        .map(NavigationContext::Name)
}

fn template_definition_context(lines: &[&str], index: usize) -> Option<TemplateRefContext> {
    let raw = list_entry_name(lines[index])?;
    if !within_templates_section(lines, index) {
        return None;
    }
    let workflow_template = containing_workflow_template(lines, index)?;
    let template = extract_name(lines[index]).unwrap_or_else(|| raw.trim());
    Some(TemplateRefContext::new(workflow_template, template))
}

/// `templates:` appears at or above `index` before any `kind:` or `apiVersion:`
pub fn within_templates_section(lines: &[&str], index: usize) -> bool {
    for i in (index.saturating_sub(TEMPLATES_SECTION_LOOKBACK)..=index).rev() {
        let line = lines[i];
        if line.contains(TEMPLATES) {
            return true;
        }
        if line.contains(KIND) || line.contains(API_VERSION) {
            return false;
        }
    }
    false
}

/// Name of the nearest WorkflowTemplate at or above `index` whose `name:`
/// follows its `kind:` line closely enough
pub fn containing_workflow_template<'a>(lines: &[&'a str], index: usize) -> Option<&'a str> {
    (0..=index)
        .rev()
        .filter(|&i| lines[i].contains(WORKFLOW_TEMPLATE_KIND))
        .find_map(|i| {
            let end = (i + WORKFLOW_TEMPLATE_NAME_LOOKAHEAD).min(lines.len());
            (i + 1..end)
                .filter(|&j| lines[j].contains(NAME))
                .find_map(|j| extract_name(lines[j]))
        })
}

fn workflow_template_definition_context<'a>(lines: &[&'a str], index: usize) -> Option<&'a str> {
    let current = lines[index];
    if !current.contains(NAME) {
        return None;
    }

    let mut seen_metadata = false;
    for i in (index.saturating_sub(METADATA_LOOKBACK)..index).rev() {
        let line = lines[i];
        if line.contains(SPEC) || line.contains(STATUS) {
            return None;
        }
        if line.contains(METADATA) {
            seen_metadata = true;
        }
        if line.contains(WORKFLOW_TEMPLATE_KIND) {
            return if seen_metadata {
                extract_name(current)
            } else {
                None
            };
        }
    }
    None
}

fn template_reference_context(lines: &[&str], index: usize) -> Option<TemplateRefContext> {
    let current = lines[index];
    if !current.contains(TEMPLATE) {
        return None;
    }

    let ref_line = (index.saturating_sub(TEMPLATE_REF_INNER_LOOKBACK)..index)
        .rev()
        .find(|&i| lines[i].contains(TEMPLATE_REF))?;

    let last = (index + TEMPLATE_REF_SIBLING_LOOKAHEAD).min(lines.len() - 1);
    let workflow_template = (ref_line + 1..=last)
        .filter(|&j| lines[j].contains(NAME) && !lines[j].contains(TEMPLATE))
        .find_map(|j| extract_name(lines[j]))?;
    let template = extract_template(current)?;

    Some(TemplateRefContext::new(workflow_template, template))
}

fn workflow_template_reference_context<'a>(lines: &[&'a str], index: usize) -> Option<&'a str> {
    let current = lines[index];
    if !current.contains(NAME) || current.contains(TEMPLATE) {
        return None;
    }

    for i in (index.saturating_sub(TEMPLATE_REF_OUTER_LOOKBACK)..index).rev() {
        let line = lines[i];
        if line.contains(TEMPLATE_REF) {
            return extract_name(current);
        }
        if list_entry_name(line).is_some() {
            return None;
        }
    }
    None
}

//
// navigator.rs
//
// Cursor to locations: classification, workspace query and the
// cancellation checkpoints between them
//

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::MessageType;

use crate::classifier::{classify, NavigationContext};
use crate::config::{NavigationConfig, QUIET_NAMES};
use crate::search::TemplateSearch;
use crate::types::{SearchResult, TemplateRefContext};
use crate::watcher::FileChangeEvent;

/// A classified cursor and what the workspace query found for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub context: NavigationContext,
    pub result: SearchResult,
}

impl Resolution {
    pub fn is_definition_site(&self) -> bool {
        self.context.is_definition_site()
    }
}

#[derive(Debug)]
pub struct Navigator {
    search: TemplateSearch,
}

impl Navigator {
    pub fn new(search: TemplateSearch) -> Self {
        Self { search }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(TemplateSearch::from_config(config))
    }

    pub fn search(&self) -> &TemplateSearch {
        &self.search
    }

    /// Resolve the cursor at `line` / `utf16_col` of `text` against `root`.
    ///
    /// Returns `None` when nothing is recognized at the cursor or when
    /// `token` is cancelled at any checkpoint. A running scan is not
    /// interrupted; its result is dropped.
    pub async fn resolve(
        &self,
        root: &Path,
        text: &str,
        line: u32,
        utf16_col: u32,
        token: &CancellationToken,
    ) -> Option<Resolution> {
        if token.is_cancelled() {
            return None;
        }

        let context = classify(text, line, utf16_col)?;
        log::trace!("Cursor at {}:{} classified as {:?}", line, utf16_col, context);

        if token.is_cancelled() {
            return None;
        }

        let result = self.search.run(root, &context.query()).await;

        if token.is_cancelled() {
            log::trace!("Navigation cancelled after scan");
            return None;
        }

        Some(Resolution { context, result })
    }

    pub fn handle_file_change(&self, event: &FileChangeEvent) {
        log::trace!(
            "Invalidating caches for {:?} {}",
            event.kind,
            event.path.display()
        );
        self.search.invalidate(Some(&event.path));
    }

    pub fn invalidate_all(&self) {
        self.search.invalidate(None);
    }
}

/// Message shown to the user after a go-to-definition lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionNotice {
    NotFound { name: String },
    MultipleDefinitions { name: String, count: usize },
}

impl DefinitionNotice {
    /// Pick the notice for a lookup result, honoring the notification settings
    pub fn for_result(result: &SearchResult, config: &NavigationConfig) -> Option<Self> {
        let name = &result.query_name;
        match result.len() {
            0 if config.notify_not_found && !QUIET_NAMES.contains(&name.as_str()) => {
                Some(DefinitionNotice::NotFound { name: name.clone() })
            }
            count if count > 1 && config.notify_multiple_definitions => {
                Some(DefinitionNotice::MultipleDefinitions {
                    name: name.clone(),
                    count,
                })
            }
            _ => None,
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            DefinitionNotice::NotFound { .. } => MessageType::WARNING,
            DefinitionNotice::MultipleDefinitions { .. } => MessageType::INFO,
        }
    }

    pub fn message(&self) -> String {
        match self {
            DefinitionNotice::NotFound { name } => format!("WorkflowTemplate '{}' not found.", name),
            DefinitionNotice::MultipleDefinitions { name, count } => {
                format!("Found {} WorkflowTemplate definitions for '{}'", count, name)
            }
        }
    }
}

/// Message shown after a reference search on a template definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceNotice {
    Found { template: TemplateRefContext, count: usize },
    NoneFound { template: TemplateRefContext },
}

impl ReferenceNotice {
    /// `count` is the number of locations returned to the client, which
    /// includes the declaration when it was requested
    pub fn for_resolution(
        resolution: &Resolution,
        count: usize,
        config: &NavigationConfig,
    ) -> Option<Self> {
        let NavigationContext::TemplateDefinition(template) = &resolution.context else {
            return None;
        };
        if !config.notify_references {
            return None;
        }
        let template = template.clone();
        Some(match count {
            0 => ReferenceNotice::NoneFound { template },
            count => ReferenceNotice::Found { template, count },
        })
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            ReferenceNotice::Found { .. } => MessageType::INFO,
            ReferenceNotice::NoneFound { .. } => MessageType::WARNING,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ReferenceNotice::Found { template, count } => format!(
                "Found {} reference(s) to template '{}' from WorkflowTemplate '{}'",
                count, template.template_name, template.workflow_template_name
            ),
            ReferenceNotice::NoneFound { template } => format!(
                "No references found for template '{}' from WorkflowTemplate '{}'",
                template.template_name, template.workflow_template_name
            ),
        }
    }
}

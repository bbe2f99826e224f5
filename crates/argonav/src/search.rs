//
// search.rs
//
// Workspace-wide symbol queries over YAML files, scanned in parallel batches
//

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::NavigationConfig;
use crate::content_cache::ContentCache;
use crate::discovery::FileDiscovery;
use crate::perf::{self, TimingGuard};
use crate::scanner::{HeuristicRules, SymbolRules};
use crate::types::{SearchResult, SourceLocation, TemplateRefContext};
use crate::workspace_cache::WorkspaceCache;

/// One of the four workspace queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolQuery {
    /// Where is the WorkflowTemplate (or anything) called `name` defined
    Definition { name: String },
    /// Where is `template_name` defined inside `workflow_template_name`
    TemplateInWorkflowTemplate(TemplateRefContext),
    /// Which `templateRef` blocks point at this template
    TemplateReferences(TemplateRefContext),
    /// Which `templateRef` / `workflowTemplateRef` blocks name this WorkflowTemplate
    WorkflowTemplateReferences { workflow_template_name: String },
}

impl SymbolQuery {
    /// The name reported back in the [`SearchResult`]
    pub fn query_name(&self) -> &str {
        match self {
            SymbolQuery::Definition { name } => name,
            SymbolQuery::TemplateInWorkflowTemplate(ctx) | SymbolQuery::TemplateReferences(ctx) => {
                &ctx.template_name
            }
            SymbolQuery::WorkflowTemplateReferences {
                workflow_template_name,
            } => workflow_template_name,
        }
    }
}

/// Executes [`SymbolQuery`]s against every YAML file under a root.
///
/// Files are scanned in batches of `max_concurrent_files`; each batch runs
/// concurrently and is awaited in order, so results follow file order and
/// then line order. A file that cannot be read contributes nothing.
pub struct TemplateSearch {
    discovery: FileDiscovery,
    content: Arc<ContentCache>,
    workspace: Arc<WorkspaceCache>,
    rules: Arc<dyn SymbolRules>,
    max_concurrent_files: usize,
}

impl std::fmt::Debug for TemplateSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSearch")
            .field("discovery", &self.discovery)
            .field("max_concurrent_files", &self.max_concurrent_files)
            .finish_non_exhaustive()
    }
}

impl TemplateSearch {
    pub fn new(
        discovery: FileDiscovery,
        content: Arc<ContentCache>,
        workspace: Arc<WorkspaceCache>,
        rules: Arc<dyn SymbolRules>,
        max_concurrent_files: usize,
    ) -> Self {
        Self {
            discovery,
            content,
            workspace,
            rules,
            max_concurrent_files: max_concurrent_files.max(1),
        }
    }

    /// Build a search using the line-pattern rules and fresh caches
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(
            FileDiscovery::from_config(config),
            Arc::new(ContentCache::from_config(config)),
            Arc::new(WorkspaceCache::from_config(config)),
            Arc::new(HeuristicRules),
            config.max_concurrent_files,
        )
    }

    pub fn content_cache(&self) -> &Arc<ContentCache> {
        &self.content
    }

    pub fn workspace_cache(&self) -> &Arc<WorkspaceCache> {
        &self.workspace
    }

    /// Drop cached state after a file event. `None` drops every cached file.
    pub fn invalidate(&self, path: Option<&Path>) {
        self.workspace.invalidate();
        match path {
            Some(path) => self.content.invalidate(path),
            None => self.content.invalidate_all(),
        }
    }

    pub async fn run(&self, root: &Path, query: &SymbolQuery) -> SearchResult {
        match query {
            SymbolQuery::Definition { name } => self.find_definition(root, name).await,
            SymbolQuery::TemplateInWorkflowTemplate(ctx) => {
                self.find_template_in_workflow_template(
                    root,
                    &ctx.workflow_template_name,
                    &ctx.template_name,
                )
                .await
            }
            SymbolQuery::TemplateReferences(ctx) => {
                self.find_template_references(root, &ctx.workflow_template_name, &ctx.template_name)
                    .await
            }
            SymbolQuery::WorkflowTemplateReferences {
                workflow_template_name,
            } => {
                self.find_workflow_template_references(root, workflow_template_name)
                    .await
            }
        }
    }

    /// Metadata name lines of every WorkflowTemplate called `name`.
    ///
    /// Answered from the workspace cache while it is live.
    pub async fn find_definition(&self, root: &Path, name: &str) -> SearchResult {
        let _timing = TimingGuard::with_threshold("find_definition", 500);

        if let Some(locations) = self.workspace.lookup(name) {
            log::trace!("Workspace cache hit for '{}'", name);
            perf::record_definition_cache_hit();
            return SearchResult::new(name, locations);
        }

        let generation = self.workspace.generation();
        let target: Arc<str> = Arc::from(name);
        let locations = self
            .scan(root, None, move |rules, text| {
                rules.workflow_template_definitions(text, &target)
            })
            .await;

        self.workspace.record(generation, name, locations.clone());
        SearchResult::new(name, locations)
    }

    /// The `- name:` entry of `template_name` inside `workflow_template_name`.
    /// At most one location is returned.
    pub async fn find_template_in_workflow_template(
        &self,
        root: &Path,
        workflow_template_name: &str,
        template_name: &str,
    ) -> SearchResult {
        let _timing = TimingGuard::with_threshold("find_template_in_workflow_template", 500);

        let workflow_template: Arc<str> = Arc::from(workflow_template_name);
        let template: Arc<str> = Arc::from(template_name);
        let mut locations = self
            .scan(root, Some(1), move |rules, text| {
                rules
                    .template_definition(text, &workflow_template, &template)
                    .into_iter()
                    .collect()
            })
            .await;
        locations.truncate(1);

        SearchResult::new(template_name, locations)
    }

    /// `template:` lines of `templateRef` blocks pointing at the template
    pub async fn find_template_references(
        &self,
        root: &Path,
        workflow_template_name: &str,
        template_name: &str,
    ) -> SearchResult {
        let _timing = TimingGuard::with_threshold("find_template_references", 500);

        let workflow_template: Arc<str> = Arc::from(workflow_template_name);
        let template: Arc<str> = Arc::from(template_name);
        let locations = self
            .scan(root, None, move |rules, text| {
                rules.template_references(text, &workflow_template, &template)
            })
            .await;

        SearchResult::new(template_name, locations)
    }

    /// Name lines of `templateRef` and `workflowTemplateRef` blocks naming
    /// the WorkflowTemplate. Both rules may report the same line.
    pub async fn find_workflow_template_references(
        &self,
        root: &Path,
        workflow_template_name: &str,
    ) -> SearchResult {
        let _timing = TimingGuard::with_threshold("find_workflow_template_references", 500);

        let workflow_template: Arc<str> = Arc::from(workflow_template_name);
        let locations = self
            .scan(root, None, move |rules, text| {
                rules.workflow_template_references(text, &workflow_template)
            })
            .await;

        SearchResult::new(workflow_template_name, locations)
    }

    async fn scan<F>(&self, root: &Path, limit: Option<usize>, rule: F) -> Vec<SourceLocation>
    where
        F: Fn(&dyn SymbolRules, &str) -> Vec<u32> + Send + Sync + 'static,
    {
        let files: Vec<PathBuf> = self
            .discovery
            .find_source_files(root)
            .await
            .into_iter()
            .collect();
        self.scan_files(&files, limit, rule).await
    }

    /// Apply `rule` to each file, batch by batch. With a `limit`, no further
    /// batch is started once that many locations have been found.
    pub async fn scan_files<F>(
        &self,
        files: &[PathBuf],
        limit: Option<usize>,
        rule: F,
    ) -> Vec<SourceLocation>
    where
        F: Fn(&dyn SymbolRules, &str) -> Vec<u32> + Send + Sync + 'static,
    {
        perf::record_files_scanned(files.len());
        let rule = Arc::new(rule);
        let mut locations = Vec::new();

        for batch in files.chunks(self.max_concurrent_files) {
            let handles: Vec<_> = batch
                .iter()
                .cloned()
                .map(|path| {
                    let content = self.content.clone();
                    let rules = self.rules.clone();
                    let rule = rule.clone();
                    tokio::spawn(async move {
                        match content.get_content(&path).await {
                            Ok(text) => (*rule)(&*rules, &*text)
                                .into_iter()
                                .map(|line| SourceLocation::new(path.clone(), line))
                                .collect(),
                            Err(e) => {
                                log::trace!("Skipping file in scan: {}", e);
                                Vec::new()
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                match handle.await {
                    Ok(found) => locations.extend(found),
                    Err(e) => log::trace!("File scan task failed: {}", e),
                }
            }

            if limit.is_some_and(|limit| locations.len() >= limit) {
                break;
            }
        }

        locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn wft(name: &str, templates: &[&str]) -> String {
        let mut text = format!(
            "apiVersion: argoproj.io/v1alpha1\nkind: WorkflowTemplate\nmetadata:\n  name: {name}\nspec:\n  templates:\n"
        );
        for t in templates {
            text.push_str(&format!("  - name: {t}\n    container:\n      image: alpine\n"));
        }
        text
    }

    fn search() -> TemplateSearch {
        TemplateSearch::from_config(&NavigationConfig::default())
    }

    #[tokio::test]
    async fn test_find_definition_scenario() {
        let dir = TempDir::new().unwrap();
        let a = write(
            dir.path(),
            "a.yaml",
            "apiVersion: v1\nkind: WorkflowTemplate\nmetadata:\n  name: greet\n",
        );

        let result = search().find_definition(dir.path(), "greet").await;
        assert_eq!(result.query_name, "greet");
        assert_eq!(result.locations, vec![SourceLocation::new(a, 3)]);
    }

    #[tokio::test]
    async fn test_find_definition_is_idempotent() {
        let dir = TempDir::new().unwrap();
        for i in 0..15 {
            write(dir.path(), &format!("d{i}/t.yaml"), &wft("shared", &["a"]));
        }
        let search = search();
        let first = search.find_definition(dir.path(), "shared").await;
        search.invalidate(None);
        let second = search.find_definition(dir.path(), "shared").await;

        assert_eq!(first.len(), 15);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_results_follow_file_order_across_batches() {
        let dir = TempDir::new().unwrap();
        let mut expected = Vec::new();
        for i in 0..25 {
            let path = write(dir.path(), &format!("f{i:02}.yaml"), &wft("same", &["x"]));
            expected.push(SourceLocation::new(path, 3));
        }
        let config = NavigationConfig {
            max_concurrent_files: 4,
            ..NavigationConfig::default()
        };
        let result = TemplateSearch::from_config(&config)
            .find_definition(dir.path(), "same")
            .await;
        assert_eq!(result.locations, expected);
    }

    #[tokio::test]
    async fn test_git_directory_is_never_scanned() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".git/a.yaml", &wft("hidden", &["x"]));
        let result = search().find_definition(dir.path(), "hidden").await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.yaml"), [0xffu8, 0xfe, 0x80]).unwrap();
        let good = write(dir.path(), "good.yaml", &wft("greet", &["x"]));

        let result = search().find_definition(dir.path(), "greet").await;
        assert_eq!(result.locations, vec![SourceLocation::new(good, 3)]);
    }

    #[tokio::test]
    async fn test_cached_definition_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.yaml", &wft("greet", &["x"]));
        let search = search();

        assert_eq!(search.find_definition(dir.path(), "greet").await.len(), 1);
        fs::remove_file(&path).unwrap();
        assert_eq!(search.find_definition(dir.path(), "greet").await.len(), 1);

        search.invalidate(Some(&path));
        assert!(search.find_definition(dir.path(), "greet").await.is_empty());
    }

    #[tokio::test]
    async fn test_find_template_in_workflow_template_returns_one() {
        let dir = TempDir::new().unwrap();
        let lib = write(dir.path(), "a/lib.yaml", &wft("greet", &["hello", "bye"]));
        write(dir.path(), "b/copy.yaml", &wft("greet", &["hello"]));

        let result = search()
            .find_template_in_workflow_template(dir.path(), "greet", "hello")
            .await;
        assert_eq!(result.query_name, "hello");
        assert_eq!(result.locations, vec![SourceLocation::new(lib, 6)]);
    }

    #[tokio::test]
    async fn test_find_template_references() {
        let dir = TempDir::new().unwrap();
        let caller = write(
            dir.path(),
            "caller.yaml",
            "\
kind: Workflow
spec:
  templates:
  - name: main
    steps:
    - - name: a
        templateRef:
          name: greet
          template: hello
",
        );

        let search = search();
        let result = search
            .find_template_references(dir.path(), "greet", "hello")
            .await;
        assert_eq!(result.locations, vec![SourceLocation::new(caller.clone(), 8)]);

        let result = search
            .find_workflow_template_references(dir.path(), "greet")
            .await;
        assert_eq!(result.locations, vec![SourceLocation::new(caller, 7)]);
    }

    #[tokio::test]
    async fn test_run_dispatches_by_query() {
        let dir = TempDir::new().unwrap();
        let lib = write(dir.path(), "lib.yaml", &wft("greet", &["hello"]));
        let search = search();

        let query = SymbolQuery::TemplateInWorkflowTemplate(TemplateRefContext::new("greet", "hello"));
        let result = search.run(dir.path(), &query).await;
        assert_eq!(result.locations, vec![SourceLocation::new(lib.clone(), 6)]);

        let query = SymbolQuery::Definition {
            name: "greet".to_string(),
        };
        assert_eq!(query.query_name(), "greet");
        let result = search.run(dir.path(), &query).await;
        assert_eq!(result.locations, vec![SourceLocation::new(lib, 3)]);
    }

    struct FixedRules;

    impl SymbolRules for FixedRules {
        fn workflow_template_definitions(&self, _: &str, _: &str) -> Vec<u32> {
            vec![0, 0]
        }
        fn template_definition(&self, _: &str, _: &str, _: &str) -> Option<u32> {
            None
        }
        fn template_references(&self, _: &str, _: &str, _: &str) -> Vec<u32> {
            Vec::new()
        }
        fn workflow_template_references(&self, _: &str, _: &str) -> Vec<u32> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_rules_are_pluggable() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "x.yml", "anything\n");
        let search = TemplateSearch::new(
            FileDiscovery::default(),
            Arc::new(ContentCache::default()),
            Arc::new(WorkspaceCache::default()),
            Arc::new(FixedRules),
            10,
        );

        let result = search.find_definition(dir.path(), "whatever").await;
        assert_eq!(
            result.locations,
            vec![SourceLocation::new(path.clone(), 0), SourceLocation::new(path, 0)]
        );
    }
}

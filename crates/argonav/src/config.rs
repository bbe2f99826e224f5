//
// config.rs
//
// Configuration for workspace navigation
//

use std::time::Duration;

/// Lines scanned backward from a `- name:` entry looking for `templates:`
pub const TEMPLATES_SECTION_LOOKBACK: usize = 50;
/// Lines scanned after `kind: WorkflowTemplate` for its `name:`
pub const WORKFLOW_TEMPLATE_NAME_LOOKAHEAD: usize = 20;
/// Lines scanned backward from a `name:` looking for `metadata:`
pub const METADATA_LOOKBACK: usize = 20;
/// Lines scanned backward from `template:` looking for `templateRef:`
pub const TEMPLATE_REF_INNER_LOOKBACK: usize = 15;
/// Lines past the cursor searched for the `templateRef` sibling `name:`
pub const TEMPLATE_REF_SIBLING_LOOKAHEAD: usize = 3;
/// Lines scanned backward from `name:` looking for `templateRef:`
pub const TEMPLATE_REF_OUTER_LOOKBACK: usize = 5;
/// Lines following `templateRef:` that belong to its block
pub const TEMPLATE_REF_BLOCK_LINES: usize = 10;
/// Lines following `workflowTemplateRef:` inspected for `name:`
pub const WORKFLOW_TEMPLATE_REF_LOOKAHEAD: usize = 5;
/// Shortest token the fallback rule will search for
pub const MIN_NAME_LENGTH: usize = 2;

/// File extensions treated as YAML sources
pub const YAML_EXTENSIONS: &[&str] = &[".yaml", ".yml"];

/// Directory names never descended into
pub const IGNORED_DIRECTORIES: &[&str] = &[
    "node_modules",
    ".git",
    ".vscode",
    "dist",
    "build",
    "out",
    "target",
];

/// Names that do not produce a "not found" warning when unresolved
pub const QUIET_NAMES: &[&str] = &["main", "default"];

/// Navigation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationConfig {
    /// Maximum directory depth below the workspace root
    pub max_depth: usize,
    /// Maximum concurrent directory reads during discovery
    pub max_concurrent_directories: usize,
    /// Maximum concurrent file scans per batch
    pub max_concurrent_files: usize,
    /// How long file content stays fresh in the content cache
    pub content_cache_timeout: Duration,
    /// Entry count above which expired content is swept
    pub content_cache_sweep_threshold: usize,
    /// How long resolved definitions stay fresh in the workspace cache
    pub workspace_cache_timeout: Duration,
    /// Show a warning when a definition lookup finds nothing
    pub notify_not_found: bool,
    /// Show an info message when a lookup finds more than one definition
    pub notify_multiple_definitions: bool,
    /// Summarize template reference searches in a message
    pub notify_references: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_concurrent_directories: 20,
            max_concurrent_files: 10,
            content_cache_timeout: Duration::from_secs(30),
            content_cache_sweep_threshold: 100,
            workspace_cache_timeout: Duration::from_secs(5 * 60),
            notify_not_found: true,
            notify_multiple_definitions: true,
            notify_references: true,
        }
    }
}

impl NavigationConfig {
    /// Check if settings that shape the search or its caches changed.
    /// Notification toggles are not included.
    pub fn search_settings_changed(&self, other: &Self) -> bool {
        self.max_depth != other.max_depth
            || self.max_concurrent_directories != other.max_concurrent_directories
            || self.max_concurrent_files != other.max_concurrent_files
            || self.content_cache_timeout != other.content_cache_timeout
            || self.content_cache_sweep_threshold != other.content_cache_sweep_threshold
            || self.workspace_cache_timeout != other.workspace_cache_timeout
    }

    fn log(&self) {
        log::info!("  max_depth: {}", self.max_depth);
        log::info!(
            "  max_concurrent_directories: {}",
            self.max_concurrent_directories
        );
        log::info!("  max_concurrent_files: {}", self.max_concurrent_files);
        log::info!("  content_cache_timeout: {:?}", self.content_cache_timeout);
        log::info!(
            "  content_cache_sweep_threshold: {}",
            self.content_cache_sweep_threshold
        );
        log::info!(
            "  workspace_cache_timeout: {:?}",
            self.workspace_cache_timeout
        );
        log::info!("  notify_not_found: {}", self.notify_not_found);
        log::info!(
            "  notify_multiple_definitions: {}",
            self.notify_multiple_definitions
        );
        log::info!("  notify_references: {}", self.notify_references);
    }
}

/// Parse navigation configuration from LSP settings.
///
/// Reads the top-level `argonav` section of `settings`. Only fields present
/// in the JSON are applied; absent fields keep their defaults. Zero values
/// for depth and concurrency limits are ignored.
///
/// Returns `None` if the `argonav` section is missing.
pub fn parse_navigation_config(settings: &serde_json::Value) -> Option<NavigationConfig> {
    let section = settings.get("argonav")?;
    let mut config = NavigationConfig::default();

    if let Some(v) = section.get("maxDepth").and_then(|v| v.as_u64()) {
        config.max_depth = v as usize;
    }
    if let Some(v) = section
        .get("maxConcurrentDirectories")
        .and_then(|v| v.as_u64())
        .filter(|v| *v > 0)
    {
        config.max_concurrent_directories = v as usize;
    }
    if let Some(v) = section
        .get("maxConcurrentFiles")
        .and_then(|v| v.as_u64())
        .filter(|v| *v > 0)
    {
        config.max_concurrent_files = v as usize;
    }
    if let Some(v) = section
        .get("contentCacheTimeoutSecs")
        .and_then(|v| v.as_u64())
    {
        config.content_cache_timeout = Duration::from_secs(v);
    }
    if let Some(v) = section
        .get("contentCacheSweepThreshold")
        .and_then(|v| v.as_u64())
    {
        config.content_cache_sweep_threshold = v as usize;
    }
    if let Some(v) = section
        .get("workspaceCacheTimeoutSecs")
        .and_then(|v| v.as_u64())
    {
        config.workspace_cache_timeout = Duration::from_secs(v);
    }

    if let Some(notifications) = section.get("notifications") {
        if let Some(v) = notifications.get("notFound").and_then(|v| v.as_bool()) {
            config.notify_not_found = v;
        }
        if let Some(v) = notifications
            .get("multipleDefinitions")
            .and_then(|v| v.as_bool())
        {
            config.notify_multiple_definitions = v;
        }
        if let Some(v) = notifications.get("references").and_then(|v| v.as_bool()) {
            config.notify_references = v;
        }
    }

    log::info!("Navigation configuration loaded from LSP settings:");
    config.log();

    Some(config)
}

//
// discovery.rs
//
// Workspace YAML file discovery with bounded parallel directory traversal
//

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;

use crate::config::{NavigationConfig, IGNORED_DIRECTORIES, YAML_EXTENSIONS};

/// Contents of one directory read
#[derive(Debug, Default)]
struct DirectoryListing {
    files: Vec<PathBuf>,
    subdirectories: Vec<PathBuf>,
}

/// Finds YAML files under a workspace root.
///
/// Directories are visited level by level. Within a level, at most
/// `max_concurrency` directory reads are in flight at once. Symbolic links
/// are never followed, so cycles cannot be entered.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    max_depth: usize,
    max_concurrency: usize,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::from_config(&NavigationConfig::default())
    }
}

impl FileDiscovery {
    pub fn new(max_depth: usize, max_concurrency: usize) -> Self {
        Self {
            max_depth,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(config.max_depth, config.max_concurrent_directories)
    }

    /// Recursively collect every `.yaml` / `.yml` file under `root`.
    ///
    /// Unreadable directories are skipped silently. Directories deeper than
    /// `max_depth` levels below `root` are not read.
    pub async fn find_source_files(&self, root: &Path) -> BTreeSet<PathBuf> {
        let mut files = BTreeSet::new();
        let mut frontier = vec![root.to_path_buf()];
        let mut depth = 0;

        while !frontier.is_empty() && depth <= self.max_depth {
            let mut next_frontier = Vec::new();

            for batch in frontier.chunks(self.max_concurrency) {
                let mut reads = JoinSet::new();
                for dir in batch {
                    reads.spawn(read_directory(dir.clone()));
                }
                while let Some(joined) = reads.join_next().await {
                    match joined {
                        Ok(listing) => {
                            files.extend(listing.files);
                            next_frontier.extend(listing.subdirectories);
                        }
                        Err(e) => log::trace!("Directory read task failed: {}", e),
                    }
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        if !frontier.is_empty() {
            log::trace!(
                "Skipped {} directories below max depth {} under {}",
                frontier.len(),
                self.max_depth,
                root.display()
            );
        }

        log::trace!("Discovered {} YAML files under {}", files.len(), root.display());
        files
    }
}

async fn read_directory(dir: PathBuf) -> DirectoryListing {
    let mut listing = DirectoryListing::default();

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) => {
            log::trace!("Skipping unreadable directory {}: {}", dir.display(), e);
            return listing;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                log::trace!("Stopped reading {}: {}", dir.display(), e);
                break;
            }
        };
        // file_type() does not follow symlinks
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_file() && is_yaml_file(&name) {
            listing.files.push(entry.path());
        } else if file_type.is_dir() && !should_ignore_directory(&name) {
            listing.subdirectories.push(entry.path());
        }
    }

    listing
}

pub fn is_yaml_file(file_name: &str) -> bool {
    YAML_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext))
}

pub fn is_yaml_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| is_yaml_file(&name.to_string_lossy()))
        .unwrap_or(false)
}

pub fn should_ignore_directory(dir_name: &str) -> bool {
    IGNORED_DIRECTORIES.contains(&dir_name) || dir_name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "kind: WorkflowTemplate\n").unwrap();
        path
    }

    #[test]
    fn test_yaml_extensions() {
        assert!(is_yaml_file("a.yaml"));
        assert!(is_yaml_file("a.yml"));
        assert!(!is_yaml_file("a.json"));
        assert!(!is_yaml_file("yaml"));
        assert!(is_yaml_path(Path::new("/w/x/b.yml")));
        assert!(!is_yaml_path(Path::new("/w/x/")));
    }

    #[test]
    fn test_ignored_directories() {
        for name in ["node_modules", ".git", ".vscode", "dist", "build", "out", "target"] {
            assert!(should_ignore_directory(name), "{name} should be ignored");
        }
        assert!(should_ignore_directory(".cache"));
        assert!(!should_ignore_directory("workflows"));
    }

    #[tokio::test]
    async fn test_finds_nested_yaml_files() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.yaml");
        let b = touch(dir.path(), "nested/deeper/b.yml");
        touch(dir.path(), "nested/readme.md");

        let files = FileDiscovery::default().find_source_files(dir.path()).await;
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_skips_ignored_and_hidden_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".git/hooks.yaml");
        touch(dir.path(), "node_modules/pkg/x.yaml");
        touch(dir.path(), "target/out.yaml");
        touch(dir.path(), ".hidden/y.yaml");
        let kept = touch(dir.path(), "charts/z.yaml");

        let files = FileDiscovery::default().find_source_files(dir.path()).await;
        assert_eq!(files.len(), 1);
        assert!(files.contains(&kept));
    }

    #[tokio::test]
    async fn test_depth_limit_truncates_silently() {
        let dir = TempDir::new().unwrap();
        let shallow = touch(dir.path(), "l1/l2/shallow.yaml");
        touch(dir.path(), "l1/l2/l3/l4/deep.yaml");

        let files = FileDiscovery::new(2, 20).find_source_files(dir.path()).await;
        assert_eq!(files.len(), 1);
        assert!(files.contains(&shallow));
    }

    #[tokio::test]
    async fn test_default_depth_reads_ten_levels() {
        let dir = TempDir::new().unwrap();
        let at_ten = touch(dir.path(), "1/2/3/4/5/6/7/8/9/10/in.yaml");
        touch(dir.path(), "1/2/3/4/5/6/7/8/9/10/11/out.yaml");

        let files = FileDiscovery::default().find_source_files(dir.path()).await;
        assert_eq!(files.len(), 1);
        assert!(files.contains(&at_ten));
    }

    #[tokio::test]
    async fn test_missing_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let files = FileDiscovery::default()
            .find_source_files(&dir.path().join("missing"))
            .await;
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_many_siblings_with_small_concurrency() {
        let dir = TempDir::new().unwrap();
        for i in 0..25 {
            touch(dir.path(), &format!("d{i}/f.yaml"));
        }
        let files = FileDiscovery::new(10, 3).find_source_files(dir.path()).await;
        assert_eq!(files.len(), 25);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_directories_are_not_followed() {
        let dir = TempDir::new().unwrap();
        let real = touch(dir.path(), "real/a.yaml");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real/loop")).unwrap();

        let files = FileDiscovery::default().find_source_files(dir.path()).await;
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec![real]);
    }
}

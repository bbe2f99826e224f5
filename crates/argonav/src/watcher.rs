//
// watcher.rs
//
// File change events that invalidate navigation caches
//

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tower_lsp::lsp_types::{FileChangeType, FileEvent};

use crate::discovery::is_yaml_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

/// A YAML file was created, changed or deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Convert a `workspace/didChangeWatchedFiles` entry. Non-YAML and
    /// non-file URIs yield `None`.
    pub fn from_lsp(event: &FileEvent) -> Option<Self> {
        let path = event.uri.to_file_path().ok()?;
        if !is_yaml_path(&path) {
            return None;
        }
        let kind = match event.typ {
            FileChangeType::CREATED => FileChangeKind::Created,
            FileChangeType::DELETED => FileChangeKind::Deleted,
            _ => FileChangeKind::Changed,
        };
        Some(Self::new(path, kind))
    }

    /// Convert a `notify` event into one change per YAML path
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => FileChangeKind::Created,
            EventKind::Modify(_) => FileChangeKind::Changed,
            EventKind::Remove(_) => FileChangeKind::Deleted,
            _ => return Vec::new(),
        };
        event
            .paths
            .iter()
            .filter(|path| is_yaml_path(path))
            .map(|path| Self::new(path.clone(), kind))
            .collect()
    }
}

/// Send `change` to the invalidation task. Returns false once the receiver
/// is gone.
pub fn forward_change(
    sender: &mpsc::UnboundedSender<FileChangeEvent>,
    change: FileChangeEvent,
) -> bool {
    match sender.send(change) {
        Ok(()) => true,
        Err(e) => {
            log::trace!("Change receiver closed, dropping {}", e.0.path.display());
            false
        }
    }
}

/// Watch `root` recursively, forwarding YAML changes to `sender`.
///
/// Used when the client cannot register file watchers. The returned watcher
/// stops when dropped.
pub fn watch_workspace(
    root: &Path,
    sender: mpsc::UnboundedSender<FileChangeEvent>,
) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                for change in FileChangeEvent::from_notify(&event) {
                    log::trace!("File change: {:?} {}", change.kind, change.path.display());
                    forward_change(&sender, change);
                }
            }
            Err(e) => log::warn!("File watcher error: {}", e),
        }
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    log::info!("Watching {} for YAML changes", root.display());
    Ok(watcher)
}

//
// state.rs
//
// Open documents and per-session server state
//

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use crate::config::NavigationConfig;
use crate::navigator::Navigator;
use crate::utf16::utf16_column_to_char_offset;

/// An open document
pub struct Document {
    pub contents: Rope,
    pub version: Option<i32>,
}

impl Document {
    pub fn new(text: &str, version: Option<i32>) -> Self {
        Self {
            contents: Rope::from_str(text),
            version,
        }
    }

    /// Char index of a UTF-16 position. Positions past the end clamp.
    fn char_index(&self, line: usize, utf16_col: u32) -> usize {
        match self.contents.get_line(line) {
            Some(slice) => {
                let text = slice.to_string();
                let text = text.trim_end_matches(['\n', '\r']);
                self.contents.line_to_char(line) + utf16_column_to_char_offset(text, utf16_col)
            }
            None => self.contents.len_chars(),
        }
    }

    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        if let Some(range) = change.range {
            let start_idx = self.char_index(range.start.line as usize, range.start.character);
            let end_idx = self
                .char_index(range.end.line as usize, range.end.character)
                .max(start_idx);

            self.contents.remove(start_idx..end_idx);
            self.contents.insert(start_idx, &change.text);
        } else {
            // Full document sync
            self.contents = Rope::from_str(&change.text);
        }
    }

    pub fn text(&self) -> String {
        self.contents.to_string()
    }
}

pub struct WorldState {
    pub documents: HashMap<Url, Document>,
    pub workspace_folders: Vec<Url>,
    pub config: NavigationConfig,
    // Cloned out by handlers, never used under the state lock
    pub navigator: Arc<Navigator>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}

impl WorldState {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            documents: HashMap::new(),
            workspace_folders: Vec::new(),
            navigator: Arc::new(Navigator::from_config(&config)),
            config,
        }
    }

    /// Apply new settings. The navigator and its caches are rebuilt only
    /// when search or cache settings changed.
    pub fn update_config(&mut self, config: NavigationConfig) {
        if self.config.search_settings_changed(&config) {
            log::info!("Search settings changed, rebuilding navigator");
            self.navigator = Arc::new(Navigator::from_config(&config));
        }
        self.config = config;
    }

    pub fn open_document(&mut self, uri: Url, text: &str, version: Option<i32>) {
        self.documents.insert(uri, Document::new(text, version));
    }

    pub fn close_document(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn apply_change(&mut self, uri: &Url, change: TextDocumentContentChangeEvent) {
        if let Some(doc) = self.documents.get_mut(uri) {
            doc.apply_change(change);
        }
    }

    pub fn get_document(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// Root searched by workspace queries: the first workspace folder
    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace_folders
            .first()
            .and_then(|folder| folder.to_file_path().ok())
    }
}

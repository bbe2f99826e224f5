//
// backend.rs
//
// LSP server wiring for WorkflowTemplate navigation
//

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::config::{parse_navigation_config, NavigationConfig};
use crate::handlers;
use crate::navigator::{DefinitionNotice, Navigator, ReferenceNotice, Resolution};
use crate::perf;
use crate::state::WorldState;
use crate::watcher::{forward_change, watch_workspace, FileChangeEvent};

const YAML_GLOB: &str = "**/*.{yaml,yml}";
const WATCHER_REGISTRATION_ID: &str = "argonav-yaml-watcher";

pub struct Backend {
    client: Client,
    state: Arc<RwLock<WorldState>>,
    file_events: mpsc::UnboundedSender<FileChangeEvent>,
    dynamic_watch_registration: AtomicBool,
    // Fallback watcher, kept alive for the session
    fs_watcher: std::sync::Mutex<Option<RecommendedWatcher>>,
}

/// Consume file change events, invalidating the current navigator's caches
fn spawn_invalidation_task(
    state: Arc<RwLock<WorldState>>,
    mut receiver: mpsc::UnboundedReceiver<FileChangeEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let navigator = state.read().await.navigator.clone();
            navigator.handle_file_change(&event);
        }
        log::trace!("File change channel closed");
    });
}

/// What a navigation request needs, captured under a brief read lock
struct RequestContext {
    root: PathBuf,
    text: String,
    navigator: Arc<Navigator>,
    config: NavigationConfig,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let state = Arc::new(RwLock::new(WorldState::default()));
        let (file_events, receiver) = mpsc::unbounded_channel();
        spawn_invalidation_task(state.clone(), receiver);

        Self {
            client,
            state,
            file_events,
            dynamic_watch_registration: AtomicBool::new(false),
            fs_watcher: std::sync::Mutex::new(None),
        }
    }

    async fn request_context(&self, uri: &Url) -> Option<RequestContext> {
        let (root, open_text, navigator, config) = {
            let state = self.state.read().await;
            (
                state.workspace_root(),
                state.get_document(uri).map(|doc| doc.text()),
                state.navigator.clone(),
                state.config.clone(),
            )
        };

        let Some(root) = root else {
            log::trace!("No workspace folder, skipping navigation");
            return None;
        };

        let text = match open_text {
            Some(text) => text,
            None => {
                let path = uri.to_file_path().ok()?;
                match navigator.search().content_cache().get_content(&path).await {
                    Ok(content) => content.to_string(),
                    Err(e) => {
                        log::trace!("Cannot read requesting document: {}", e);
                        return None;
                    }
                }
            }
        };

        Some(RequestContext {
            root,
            text,
            navigator,
            config,
        })
    }

    /// Resolve on a separate task. Dropping the returned future (request
    /// cancelled by the client) cancels the token seen by the resolver.
    async fn resolve(&self, uri: &Url, position: Position) -> Option<(Resolution, NavigationConfig)> {
        let RequestContext {
            root,
            text,
            navigator,
            config,
        } = self.request_context(uri).await?;
        let token = CancellationToken::new();
        let _cancel_on_drop = token.clone().drop_guard();

        let handle = tokio::spawn(async move {
            navigator
                .resolve(&root, &text, position.line, position.character, &token)
                .await
        });

        match handle.await {
            Ok(resolution) => resolution.map(|r| (r, config)),
            Err(e) => {
                log::trace!("Navigation task failed: {}", e);
                None
            }
        }
    }

    async fn start_fallback_watcher(&self) {
        let Some(root) = self.state.read().await.workspace_root() else {
            return;
        };
        match watch_workspace(&root, self.file_events.clone()) {
            Ok(watcher) => {
                if let Ok(mut slot) = self.fs_watcher.lock() {
                    *slot = Some(watcher);
                }
            }
            Err(e) => log::warn!("Failed to watch {}: {}", root.display(), e),
        }
    }

    async fn register_file_watcher(&self) -> anyhow::Result<()> {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String(YAML_GLOB.to_string()),
                kind: None,
            }],
        };
        let registration = Registration {
            id: WATCHER_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(serde_json::to_value(options)?),
        };
        self.client.register_capability(vec![registration]).await?;
        Ok(())
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing argonav");

        let dynamic = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|w| w.did_change_watched_files.as_ref())
            .and_then(|c| c.dynamic_registration)
            .unwrap_or(false);
        self.dynamic_watch_registration
            .store(dynamic, Ordering::SeqCst);

        let mut state = self.state.write().await;

        if let Some(folders) = params.workspace_folders {
            for folder in folders {
                log::info!("Adding workspace folder: {}", folder.uri);
                state.workspace_folders.push(folder.uri);
            }
        } else if let Some(root_uri) = params.root_uri {
            log::info!("Adding root URI as workspace folder: {}", root_uri);
            state.workspace_folders.push(root_uri);
        }

        if let Some(config) = params
            .initialization_options
            .as_ref()
            .and_then(parse_navigation_config)
        {
            state.update_config(config);
        }

        drop(state);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("argonav"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("argonav initialized");

        if self.dynamic_watch_registration.load(Ordering::SeqCst) {
            match self.register_file_watcher().await {
                Ok(()) => {
                    log::info!("Registered client file watcher for {}", YAML_GLOB);
                    return;
                }
                Err(e) => log::warn!("File watcher registration failed: {}", e),
            }
        }

        self.start_fallback_watcher().await;
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("argonav shutting down");
        perf::log_summary();
        if let Ok(mut slot) = self.fs_watcher.lock() {
            slot.take();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let mut state = self.state.write().await;
        state.open_document(doc.uri, &doc.text, Some(doc.version));
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut state = self.state.write().await;
        for change in params.content_changes {
            state.apply_change(&uri, change);
        }
        if let Some(doc) = state.documents.get_mut(&uri) {
            doc.version = Some(params.text_document.version);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let mut state = self.state.write().await;
        state.close_document(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed");
        match parse_navigation_config(&params.settings) {
            Some(config) => self.state.write().await.update_config(config),
            None => log::trace!("No argonav section in settings, keeping configuration"),
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        log::trace!(
            "Received watched files change: {} changes",
            params.changes.len()
        );
        for event in params.changes.iter().filter_map(FileChangeEvent::from_lsp) {
            forward_change(&self.file_events, event);
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position_params = params.text_document_position_params;
        let Some((resolution, config)) = self
            .resolve(&position_params.text_document.uri, position_params.position)
            .await
        else {
            return Ok(None);
        };

        if !resolution.is_definition_site() {
            if let Some(notice) = DefinitionNotice::for_result(&resolution.result, &config) {
                self.client
                    .show_message(notice.message_type(), notice.message())
                    .await;
            }
        }

        Ok(handlers::goto_definition(&resolution))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position_params = params.text_document_position;
        let uri = position_params.text_document.uri;
        let Some((resolution, config)) = self.resolve(&uri, position_params.position).await else {
            return Ok(None);
        };

        let locations = handlers::references(
            &resolution,
            &uri,
            position_params.position,
            params.context.include_declaration,
        );
        log::trace!("Found {} references for '{}'", locations.len(), resolution.result.query_name);

        if let Some(notice) = ReferenceNotice::for_resolution(&resolution, locations.len(), &config) {
            self.client
                .show_message(notice.message_type(), notice.message())
                .await;
        }

        Ok(Some(locations))
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new).finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

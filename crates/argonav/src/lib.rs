// lib.rs - Navigation engine and LSP server for Argo WorkflowTemplates.
//
// The binary entry point lives in main.rs; benches/ and tests/ use the
// modules exposed here.

pub mod backend;
pub mod classifier;
pub mod config;
pub mod content_cache;
pub mod discovery;
pub mod handlers;
pub mod navigator;
pub mod patterns;
pub mod perf;
pub mod scanner;
pub mod search;
pub mod state;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod types;
pub mod utf16;
pub mod watcher;
pub mod workspace_cache;

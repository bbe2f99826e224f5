//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates synthetic Argo workspaces: WorkflowTemplate libraries under
//! `lib/` and Workflows calling them through `templateRef` under `callers/`.
//!
//! All output is deterministic, so benchmarks are reproducible.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Line of the metadata `name:` in every generated library file
pub const DEFINITION_LINE: u32 = 3;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub library_count: usize,
    pub templates_per_library: usize,
    pub caller_count: usize,
    pub steps_per_caller: usize,
    pub extra_lines_per_file: usize,
}

impl FixtureConfig {
    /// Small workspace: 5 libraries, 10 callers.
    pub fn small() -> Self {
        Self {
            library_count: 5,
            templates_per_library: 3,
            caller_count: 10,
            steps_per_caller: 2,
            extra_lines_per_file: 5,
        }
    }

    /// Medium workspace: 25 libraries, 75 callers.
    pub fn medium() -> Self {
        Self {
            library_count: 25,
            templates_per_library: 5,
            caller_count: 75,
            steps_per_caller: 4,
            extra_lines_per_file: 20,
        }
    }

    /// Large workspace: 100 libraries, 300 callers.
    pub fn large() -> Self {
        Self {
            library_count: 100,
            templates_per_library: 10,
            caller_count: 300,
            steps_per_caller: 8,
            extra_lines_per_file: 50,
        }
    }
}

pub fn library_name(index: usize) -> String {
    format!("wft-{}", index)
}

pub fn template_name(library: usize, template: usize) -> String {
    format!("tpl-{}-{}", library, template)
}

pub fn library_path(dir: &Path, index: usize) -> PathBuf {
    dir.join("lib").join(format!("wft_{}.yaml", index))
}

pub fn caller_path(dir: &Path, index: usize) -> PathBuf {
    dir.join("callers").join(format!("caller_{}.yaml", index))
}

/// Line of the `- name:` entry for template `template` in a library file
pub fn template_line(template: usize) -> u32 {
    6 + 3 * template as u32
}

/// Library and template called by step `step` of caller `caller`
pub fn step_target(caller: usize, step: usize, config: &FixtureConfig) -> (usize, usize) {
    (
        (caller + step) % config.library_count,
        step % config.templates_per_library,
    )
}

/// Line of the `template:` in step `step` of a caller file
pub fn step_template_line(step: usize) -> u32 {
    12 + 4 * step as u32
}

fn generate_library_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "apiVersion: argoproj.io/v1alpha1").unwrap();
    writeln!(content, "kind: WorkflowTemplate").unwrap();
    writeln!(content, "metadata:").unwrap();
    writeln!(content, "  name: {}", library_name(index)).unwrap();
    writeln!(content, "spec:").unwrap();
    writeln!(content, "  templates:").unwrap();
    for t in 0..config.templates_per_library {
        writeln!(content, "  - name: {}", template_name(index, t)).unwrap();
        writeln!(content, "    container:").unwrap();
        writeln!(content, "      image: alpine:3.{}", t).unwrap();
    }
    for i in 0..config.extra_lines_per_file {
        writeln!(content, "# padding line {}", i).unwrap();
    }
    content
}

fn generate_caller_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "apiVersion: argoproj.io/v1alpha1").unwrap();
    writeln!(content, "kind: Workflow").unwrap();
    writeln!(content, "metadata:").unwrap();
    writeln!(content, "  generateName: caller-{}-", index).unwrap();
    writeln!(content, "spec:").unwrap();
    writeln!(content, "  entrypoint: main").unwrap();
    writeln!(content, "  templates:").unwrap();
    writeln!(content, "  - name: main").unwrap();
    writeln!(content, "    steps:").unwrap();
    for s in 0..config.steps_per_caller {
        let (library, template) = step_target(index, s, config);
        writeln!(content, "    - - name: step-{}", s).unwrap();
        writeln!(content, "        templateRef:").unwrap();
        writeln!(content, "          name: {}", library_name(library)).unwrap();
        writeln!(content, "          template: {}", template_name(library, template)).unwrap();
    }
    for i in 0..config.extra_lines_per_file {
        writeln!(content, "# padding line {}", i).unwrap();
    }
    content
}

/// Create a temporary fixture workspace from the given configuration.
///
/// The directory is cleaned up when the `TempDir` is dropped. Calling this
/// twice with the same `FixtureConfig` produces byte-identical files.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    std::fs::create_dir_all(dir.join("lib")).expect("Failed to create lib/");
    std::fs::create_dir_all(dir.join("callers")).expect("Failed to create callers/");

    for i in 0..config.library_count {
        let path = library_path(dir, i);
        std::fs::write(&path, generate_library_content(i, config))
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", path.display(), e));
    }
    for i in 0..config.caller_count {
        let path = caller_path(dir, i);
        std::fs::write(&path, generate_caller_content(i, config))
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", path.display(), e));
    }
}

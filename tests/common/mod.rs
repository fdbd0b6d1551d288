// Shared helpers for integration tests.
//
// Provides a temporary configuration directory and a fluent builder so each
// integration test can lay out default config, custom config and task
// scripts without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use provision::config::PackageLocator;
use provision::resolver::ResolveOptions;

/// Bash script with one function per name and an entrypoint calling the
/// first one.
pub fn bash_script(functions: &[&str]) -> String {
    let mut body = String::from("#!/usr/bin/env bash\nset -euo pipefail\n\n");
    for function in functions {
        body.push_str(&format!(
            "{function}() {{\n  # (STEP) {function}\n  echo \"__STEP__: {function}\"\n}}\n\n"
        ));
    }
    if let Some(first) = functions.first() {
        body.push_str(&format!(
            "if [[ \"${{BASH_SOURCE[0]}}\" == \"$0\" ]]; then\n  {first} \"$@\"\nfi\n"
        ));
    }
    body
}

/// Locator that finds no packages.
#[derive(Debug)]
pub struct NoPackages;

impl PackageLocator for NoPackages {
    fn locate(&self, _package: &str) -> Option<PathBuf> {
        None
    }
}

/// An isolated configuration directory backed by a [`tempfile::TempDir`].
pub struct ConfigDir {
    /// Directory holding `default.yaml`, custom configs and scripts.
    pub root: tempfile::TempDir,
}

impl ConfigDir {
    /// Path to the configuration directory.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Path of `default.yaml`.
    pub fn default_config(&self) -> PathBuf {
        self.path().join("default.yaml")
    }

    /// Resolver options reading `default.yaml` from this directory.
    pub fn options(&self) -> ResolveOptions {
        ResolveOptions {
            default_config: self.default_config(),
            config_directory: self.path().to_path_buf(),
            ..ResolveOptions::default()
        }
    }

    /// Resolver options that also layer `custom.yaml`.
    pub fn options_with_custom(&self) -> ResolveOptions {
        ResolveOptions {
            config_file: Some(self.path().join("custom.yaml")),
            ..self.options()
        }
    }
}

/// Fluent builder for [`ConfigDir`].
pub struct ConfigDirBuilder {
    dir: ConfigDir,
}

impl ConfigDirBuilder {
    /// Begin with an empty directory.
    pub fn new() -> Self {
        Self {
            dir: ConfigDir {
                root: tempfile::tempdir().expect("create temp dir"),
            },
        }
    }

    /// Write `content` to `<dir>/<name>`, creating parent directories.
    pub fn with_file(self, name: &str, content: &str) -> Self {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write file");
        self
    }

    /// Write `default.yaml`.
    pub fn with_default_config(self, content: &str) -> Self {
        self.with_file("default.yaml", content)
    }

    /// Write `custom.yaml`.
    pub fn with_custom_config(self, content: &str) -> Self {
        self.with_file("custom.yaml", content)
    }

    /// Write a Bash script defining `functions`.
    pub fn with_bash_script(self, name: &str, functions: &[&str]) -> Self {
        self.with_file(name, &bash_script(functions))
    }

    /// Finish building.
    pub fn build(self) -> ConfigDir {
        self.dir
    }
}

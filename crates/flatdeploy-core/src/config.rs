//! Configuration file parsing and merging
//!
//! This module handles parsing of `flatdeploy.toml` and its optional
//! `flatdeploy.local.toml` override. The file carries what the package
//! resolver knows about the dependency graph plus the deployment settings.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::deploy::{CyclePolicy, DeployProfile};
use crate::graph::{DependencyGraph, DependencyNode, RootPackage};
use crate::{Error, Result};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "flatdeploy.toml";

/// Main configuration structure for flatdeploy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The package being deployed for
    pub package: PackageConfig,

    /// Install information for every package reachable from `package.requires`
    pub dependencies: BTreeMap<String, DependencyConfig>,

    /// Deployment settings
    pub deploy: DeployConfig,
}

/// Root package description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Package name (default: none, deploys into `flatdeploy/`)
    pub name: Option<String>,

    /// Package version
    pub version: Option<String>,

    /// Direct requirements in declaration order
    pub requires: Vec<String>,
}

/// Install information for one dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Install root of the dependency
    pub root: Utf8PathBuf,

    /// Public dependencies in declaration order
    #[serde(default)]
    pub public_deps: Vec<String>,
}

/// Deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Directory receiving the isolated deployment and the manifest (default: ".")
    pub output_dir: Utf8PathBuf,

    /// Deployment profile (default: "flatdeploy")
    pub profile: DeployProfile,

    /// What to do when the dependency graph contains a cycle (default: "warn")
    pub on_cycle: CyclePolicy,

    /// Target root for the persistent profile (default: `$HOME/.local`)
    pub persistent_prefix: Option<Utf8PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from("."),
            profile: DeployProfile::default(),
            on_cycle: CyclePolicy::default(),
            persistent_prefix: None,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// The sibling `<stem>.local.toml` is merged over it when present, and
    /// relative paths are resolved against the directory holding the file.
    pub fn load(config_path: &Utf8Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(Error::config(
                format!("Configuration file not found: {}", config_path),
                "Create a flatdeploy.toml describing the package and its dependencies, or pass --config",
            ));
        }

        let local_config_path = local_override_path(config_path);

        let content = std::fs::read_to_string(config_path)?;
        let base_config = toml::from_str::<toml::Value>(&content)?;

        let local_config = match &local_config_path {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path, "Merging local configuration override");
                let content = std::fs::read_to_string(path)?;
                Some(toml::from_str::<toml::Value>(&content)?)
            }
            _ => None,
        };

        let merged = if let Some(local) = local_config {
            merge_toml_values(base_config, local)
        } else {
            base_config
        };

        let mut config: Config = merged.try_into()?;

        let base_dir = match config_path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        let base_dir = base_dir.canonicalize_utf8().map_err(|e| {
            Error::config(
                format!("Failed to canonicalize config directory {}: {}", base_dir, e),
                "Ensure the path exists and is accessible",
            )
        })?;
        config.resolve_paths(&base_dir);

        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Make every relative path in the configuration relative to `base`
    pub fn resolve_paths(&mut self, base: &Utf8Path) {
        for dependency in self.dependencies.values_mut() {
            dependency.root = rebase(base, &dependency.root);
        }

        self.deploy.output_dir = rebase(base, &self.deploy.output_dir);

        if let Some(prefix) = &mut self.deploy.persistent_prefix {
            *prefix = rebase(base, prefix);
        }
    }

    /// The root package described by `[package]`
    pub fn root_package(&self) -> RootPackage {
        RootPackage {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
            requires: self.package.requires.clone(),
        }
    }

    /// The dependency graph described by `[dependencies]`
    pub fn graph(&self) -> DependencyGraph {
        self.dependencies
            .iter()
            .map(|(name, dependency)| DependencyNode {
                name: name.clone(),
                root: dependency.root.clone(),
                public_deps: dependency.public_deps.clone(),
            })
            .collect()
    }
}

/// Join a relative `path` onto `base`, dropping `.` components
fn rebase(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let mut rebased = base.to_path_buf();
    for component in path.components() {
        if component != Utf8Component::CurDir {
            rebased.push(component.as_str());
        }
    }
    rebased
}

/// `dir/flatdeploy.toml` -> `dir/flatdeploy.local.toml`
fn local_override_path(config_path: &Utf8Path) -> Option<Utf8PathBuf> {
    let stem = config_path.file_stem()?;
    let file_name = match config_path.extension() {
        Some(extension) => format!("{}.local.{}", stem, extension),
        None => format!("{}.local", stem),
    };
    Some(config_path.with_file_name(file_name))
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}

//! Dependency graph supplied by the package resolver
//!
//! The resolver decides which packages exist, where they were installed and
//! which public dependencies each one exposes. This module only holds that
//! answer in a form the deployment walk can query by name.

use camino::Utf8PathBuf;
use std::collections::HashMap;

use crate::{Error, Result};

/// One installed package: its install root plus its direct public dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Package identifier
    pub name: String,

    /// Directory containing the package's installed files
    pub root: Utf8PathBuf,

    /// Direct dependencies, in declaration order
    pub public_deps: Vec<String>,
}

impl DependencyNode {
    /// Create a node without dependencies
    pub fn new(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            public_deps: Vec::new(),
        }
    }

    /// Builder-style helper to set the direct dependencies
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_deps = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// The package being deployed for: the consumer of the dependency graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootPackage {
    /// Package name, if the consumer has one
    pub name: Option<String>,

    /// Package version
    pub version: Option<String>,

    /// Direct requirements, in declaration order
    pub requires: Vec<String>,
}

impl RootPackage {
    /// Directory name used for an isolated deployment of this package
    ///
    /// `<name>-<version>`, `<name>` without a version, or `flatdeploy` when the
    /// consumer is anonymous.
    pub fn deploy_dir_name(&self) -> String {
        match (&self.name, &self.version) {
            (None, _) => "flatdeploy".to_string(),
            (Some(name), None) => name.clone(),
            (Some(name), Some(version)) => format!("{}-{}", name, version),
        }
    }
}

/// All dependency nodes reachable from a root package, indexed by name
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, DependencyNode>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node previously registered under the same name
    pub fn insert(&mut self, node: DependencyNode) -> Option<DependencyNode> {
        self.nodes.insert(node.name.clone(), node)
    }

    /// Look up a node without treating absence as an error
    pub fn get(&self, name: &str) -> Option<&DependencyNode> {
        self.nodes.get(name)
    }

    /// Resolve a dependency declared by `dependent`
    ///
    /// `dependent` is `None` for root requirements. A missing node means the
    /// resolver's output is inconsistent, which fails the whole run.
    pub fn resolve(&self, name: &str, dependent: Option<&str>) -> Result<&DependencyNode> {
        self.nodes.get(name).ok_or_else(|| {
            let declared_by = match dependent {
                Some(dependent) => format!("dependency of '{}'", dependent),
                None => "root requirement".to_string(),
            };
            Error::resolution(
                format!("'{}' ({}) has no install information", name, declared_by),
                "Make sure every public dependency is also listed under [dependencies]",
            )
        })
    }

    /// Number of nodes in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<DependencyNode> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = DependencyNode>>(iter: T) -> Self {
        let mut graph = Self::new();
        for node in iter {
            graph.insert(node);
        }
        graph
    }
}

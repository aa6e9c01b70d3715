//! Bookkeeping of deployed files and the manifest written from it

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fmt;

use crate::{Error, Result};

/// Manifest file name, written next to the isolated target root
pub const MANIFEST_FILE_NAME: &str = "flatdeploy.txt";

/// Who put a file at a destination path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOwner {
    /// Written by this dependency during the current run
    Dependency(String),
    /// Present on disk before the current run wrote anything there
    PreExisting,
}

impl fmt::Display for FileOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOwner::Dependency(name) => write!(f, "{}", name),
            FileOwner::PreExisting => write!(f, "pre-existing"),
        }
    }
}

/// A destination path written by more than one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConflict {
    /// Path relative to the target root
    pub relative_path: Utf8PathBuf,
    /// Dependency whose file now occupies the path
    pub dependency: String,
    /// Previous occupant of the path
    pub previous: FileOwner,
}

impl fmt::Display for FileConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.previous {
            FileOwner::Dependency(previous) => write!(
                f,
                "{} is installed by both {} and {}",
                self.relative_path, self.dependency, previous
            ),
            FileOwner::PreExisting => write!(
                f,
                "{} exists already, overwritten by {}",
                self.relative_path, self.dependency
            ),
        }
    }
}

/// Destination path -> owning dependency, in first-insertion order
///
/// Re-inserting an existing path records the new owner but keeps the
/// path's original position.
#[derive(Debug, Clone, Default)]
pub struct CopiedFileMap {
    paths: Vec<Utf8PathBuf>,
    owners: HashMap<Utf8PathBuf, String>,
}

impl CopiedFileMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner` as the writer of `path`, returning the previous owner
    pub fn insert(&mut self, path: Utf8PathBuf, owner: impl Into<String>) -> Option<String> {
        let previous = self.owners.insert(path.clone(), owner.into());
        if previous.is_none() {
            self.paths.push(path);
        }
        previous
    }

    /// Current owner of `path`
    pub fn owner(&self, path: &Utf8Path) -> Option<&str> {
        self.owners.get(path).map(String::as_str)
    }

    /// Number of distinct destination paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing has been copied
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths with their current owners, in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &str)> {
        self.paths
            .iter()
            .map(|path| (path.as_path(), self.owners[path].as_str()))
    }

    /// Freeze into a manifest
    pub fn into_manifest(self) -> Manifest {
        Manifest { files: self.paths }
    }
}

/// Ordered list of destination paths produced by a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    files: Vec<Utf8PathBuf>,
}

impl Manifest {
    /// Deployed paths in manifest order
    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    /// One path per line with a trailing newline
    pub fn render(&self) -> String {
        let mut content = self
            .files
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');
        content
    }

    /// Write the rendered manifest to `path`
    pub fn write(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::deploy(
                    format!("Failed to create manifest directory {}: {}", parent, e),
                    "Ensure the output directory is writable",
                )
            })?;
        }
        std::fs::write(path, self.render()).map_err(|e| {
            Error::deploy(
                format!("Failed to write manifest {}: {}", path, e),
                "Ensure the output directory is writable",
            )
        })
    }
}

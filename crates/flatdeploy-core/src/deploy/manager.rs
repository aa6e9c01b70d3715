//! Deployment manager
//!
//! This module provides the main deployment orchestration logic: preparing
//! the target root, walking the dependency graph, writing the manifest and
//! rolling back a failed isolated deployment.

use camino::{Utf8Path, Utf8PathBuf};

use crate::graph::DependencyGraph;
use crate::{Error, Result};

use super::manifest::{CopiedFileMap, FileConflict, MANIFEST_FILE_NAME, Manifest};
use super::merger::merge_one;
use super::policy::DeployPolicy;
use super::walker::{CyclePolicy, walk};

/// Outcome of a successful deployment
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Absolute directory that received the merged files
    pub target_root: Utf8PathBuf,
    /// Location of the written manifest
    pub manifest_path: Utf8PathBuf,
    /// Deployed files in manifest order
    pub manifest: Manifest,
    /// Files written by more than one source, in the order they were overwritten
    pub conflicts: Vec<FileConflict>,
    /// Dependencies in the order they were merged
    pub merge_order: Vec<String>,
}

/// Manager for deployment operations
pub struct DeployManager<'a> {
    graph: &'a DependencyGraph,
    cycle_policy: CyclePolicy,
}

impl<'a> DeployManager<'a> {
    /// Create a new deploy manager over a resolved dependency graph
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self {
            graph,
            cycle_policy: CyclePolicy::default(),
        }
    }

    /// Set how dependency cycles are treated
    pub fn with_cycle_policy(mut self, cycle_policy: CyclePolicy) -> Self {
        self.cycle_policy = cycle_policy;
        self
    }

    /// Get the manifest file path for an output directory
    pub fn manifest_path(output_dir: &Utf8Path) -> Utf8PathBuf {
        output_dir.join(MANIFEST_FILE_NAME)
    }

    /// Deploy everything reachable from `requires` according to `policy`
    ///
    /// The manifest is written to `output_dir` on success. With a policy that
    /// cleans up on failure, a failed run leaves no target root behind.
    pub fn deploy(
        &self,
        requires: &[String],
        policy: &DeployPolicy,
        output_dir: &Utf8Path,
    ) -> Result<DeployReport> {
        tracing::info!("Packages will be deployed to {}", policy.target_root);

        let manifest_path = Self::manifest_path(output_dir);
        let target_root = self.prepare(policy, &manifest_path)?;

        match self.merge_all(requires, &target_root, &manifest_path) {
            Ok(report) => {
                tracing::info!(
                    files = report.manifest.files().len(),
                    conflicts = report.conflicts.len(),
                    "Deployment complete"
                );
                Ok(report)
            }
            Err(e) => {
                if policy.cleanup_on_failure {
                    remove_target_root(&target_root);
                }
                Err(e)
            }
        }
    }

    /// Clear or preserve the target root and drop a stale manifest
    ///
    /// Returns the canonical target root.
    fn prepare(&self, policy: &DeployPolicy, manifest_path: &Utf8Path) -> Result<Utf8PathBuf> {
        let target_root = &policy.target_root;

        if policy.clear_before_run && target_root.symlink_metadata().is_ok() {
            tracing::debug!("Removing previous deployment at {}", target_root);
            std::fs::remove_dir_all(target_root).map_err(|e| {
                Error::deploy(
                    format!("Failed to remove previous deployment {}: {}", target_root, e),
                    "Remove the directory manually or check its permissions",
                )
            })?;
        }

        if manifest_path.symlink_metadata().is_ok() {
            std::fs::remove_file(manifest_path).map_err(|e| {
                Error::deploy(
                    format!("Failed to remove stale manifest {}: {}", manifest_path, e),
                    "Ensure the output directory is writable",
                )
            })?;
        }

        std::fs::create_dir_all(target_root).map_err(|e| {
            Error::deploy(
                format!("Failed to create target root {}: {}", target_root, e),
                "Ensure the output directory is writable",
            )
        })?;
        target_root.canonicalize_utf8().map_err(|e| {
            Error::deploy(
                format!("Failed to canonicalize target root {}: {}", target_root, e),
                "Ensure the output directory is accessible",
            )
        })
    }

    /// Walk the graph, merging each dependency, then write the manifest
    fn merge_all(
        &self,
        requires: &[String],
        target_root: &Utf8Path,
        manifest_path: &Utf8Path,
    ) -> Result<DeployReport> {
        let mut copied = CopiedFileMap::new();
        let mut conflicts = Vec::new();

        let merge_order = walk(requires, self.graph, self.cycle_policy, |node| {
            conflicts.extend(merge_one(node, target_root, &mut copied)?);
            Ok(())
        })?;

        let manifest = copied.into_manifest();
        manifest.write(manifest_path)?;

        Ok(DeployReport {
            target_root: target_root.to_path_buf(),
            manifest_path: manifest_path.to_path_buf(),
            manifest,
            conflicts,
            merge_order,
        })
    }
}

/// Best-effort removal of a partially deployed target root
fn remove_target_root(target_root: &Utf8Path) {
    tracing::warn!("Deployment failed, removing {}", target_root);
    if let Err(e) = std::fs::remove_dir_all(target_root) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::error!(
                path = %target_root,
                error = %e,
                "Failed to remove partial deployment"
            );
        }
    }
}

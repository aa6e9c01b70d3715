//! Flattening a dependency graph's install trees into one target root
//!
//! This module provides:
//! - Walking: visiting every reachable dependency once, dependencies first
//! - Merging: copying one dependency's install root into the target root
//! - Orchestration: target root lifecycle, manifest output and rollback
//!
//! **Note**: Symlinks are recreated with Unix-specific functionality, as
//! install trees of shared libraries rely on them.

mod manager;
mod manifest;
mod merger;
mod policy;
mod walker;

pub use manager::{DeployManager, DeployReport};
pub use manifest::{CopiedFileMap, FileConflict, FileOwner, MANIFEST_FILE_NAME, Manifest};
pub use merger::{RESERVED_FILE_NAMES, is_reserved, merge_one};
pub use policy::{DeployPolicy, DeployProfile};
pub use walker::{CyclePolicy, merge_order, walk};

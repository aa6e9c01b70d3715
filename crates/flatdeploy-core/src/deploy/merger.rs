//! Merging one dependency's install root into the target root

use camino::Utf8Path;
use std::io;
use walkdir::WalkDir;

use crate::graph::DependencyNode;
use crate::{Error, Result};

use super::manifest::{CopiedFileMap, FileConflict, FileOwner};

/// Package-manager bookkeeping files that are never deployed
pub const RESERVED_FILE_NAMES: &[&str] = &["conaninfo.txt", "conanmanifest.txt", "conan_package.tgz"];

/// Whether a file with this base name is skipped during merging
pub fn is_reserved(file_name: &str) -> bool {
    RESERVED_FILE_NAMES.contains(&file_name)
}

/// Copy every file of `node` into `target_root`
///
/// Relative paths are preserved, symlinks are copied as symlinks and every
/// destination is recorded in `copied`. Destinations that already exist are
/// overwritten and reported as conflicts, in the order they were found.
pub fn merge_one(
    node: &DependencyNode,
    target_root: &Utf8Path,
    copied: &mut CopiedFileMap,
) -> Result<Vec<FileConflict>> {
    tracing::info!("Deploying runtime dependency {}", node.name);

    let mut conflicts = Vec::new();
    let walker = WalkDir::new(&node.root)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .and_then(Utf8Path::from_path)
                .map(Utf8Path::to_path_buf)
                .unwrap_or_else(|| node.root.clone());
            Error::copy(&node.name, path, io::Error::from(e))
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let src_path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
            Error::deploy(
                format!("Path is not valid UTF-8: {:?}", entry.path()),
                "Ensure all installed file paths contain only valid UTF-8 characters",
            )
        })?;

        if src_path.file_name().is_some_and(is_reserved) {
            tracing::debug!(path = %src_path, "Skipping package metadata file");
            continue;
        }

        let rel_path = src_path.strip_prefix(&node.root).map_err(|_| {
            Error::deploy(
                format!("Failed to strip install root prefix from {}", src_path),
                "This is likely a bug in flatdeploy",
            )
        })?;

        let dst_path = target_root.join(rel_path);

        if let Some(parent) = dst_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::copy(&node.name, parent, e))?;
        }

        let existing = dst_path.symlink_metadata().ok();
        if existing.is_some() {
            let previous = match copied.owner(&dst_path) {
                Some(owner) => FileOwner::Dependency(owner.to_string()),
                None => FileOwner::PreExisting,
            };
            let conflict = FileConflict {
                relative_path: rel_path.to_path_buf(),
                dependency: node.name.clone(),
                previous,
            };
            tracing::warn!("File conflict: {}", conflict);
            conflicts.push(conflict);
        }

        // A real directory already holds other dependencies' files
        if file_type.is_symlink() && existing.as_ref().is_some_and(|metadata| metadata.is_dir()) {
            tracing::warn!(
                "Keeping directory {} instead of the symlink from {}",
                dst_path,
                node.name
            );
            continue;
        }

        let copy_result = if file_type.is_symlink() {
            copy_symlink(src_path, &dst_path)
        } else {
            copy_file(src_path, &dst_path)
        };
        copy_result.map_err(|e| Error::copy(&node.name, src_path, e))?;

        tracing::debug!(src = %src_path, dst = %dst_path, "Deployed");
        copied.insert(dst_path, node.name.clone());
    }

    Ok(conflicts)
}

/// Recreate the symlink at `src` as `dst`, with the same link text
fn copy_symlink(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    let target = std::fs::read_link(src)?;
    remove_existing_file(dst)?;
    std::os::unix::fs::symlink(target, dst)
}

/// Copy a regular file, keeping permissions and timestamps
fn copy_file(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    // Never write through an earlier symlink or into a read-only file
    remove_existing_file(dst)?;

    std::fs::copy(src, dst)?;

    let metadata = std::fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        filetime::FileTime::from_last_access_time(&metadata),
        filetime::FileTime::from_last_modification_time(&metadata),
    )
}

/// Remove a file or symlink at `path` if present; directories are left alone
fn remove_existing_file(path: &Utf8Path) -> io::Result<()> {
    match path.symlink_metadata() {
        Ok(metadata) if !metadata.is_dir() => std::fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

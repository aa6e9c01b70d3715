//! Deployment profiles and the policy each one resolves to

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::RootPackage;
use crate::{Error, Result};

/// Named deployment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeployProfile {
    /// Per-package target root under the output directory, rebuilt every run
    #[default]
    #[serde(rename = "flatdeploy", alias = "isolated")]
    Isolated,
    /// Long-lived user prefix (`$HOME/.local`), never cleared
    #[serde(rename = "persistent")]
    Persistent,
}

impl fmt::Display for DeployProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployProfile::Isolated => write!(f, "flatdeploy"),
            DeployProfile::Persistent => write!(f, "persistent"),
        }
    }
}

/// Where a run deploys to and how it treats the target root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPolicy {
    /// Directory receiving all merged files
    pub target_root: Utf8PathBuf,
    /// Remove the target root before the run
    pub clear_before_run: bool,
    /// Remove the target root when the run fails
    pub cleanup_on_failure: bool,
}

impl DeployPolicy {
    /// `<output_dir>/<name>[-<version>]`, cleared before the run and on failure
    ///
    /// The directory name must be a single plain path component, since the
    /// target root is deleted recursively.
    pub fn isolated(output_dir: &Utf8Path, package: &RootPackage) -> Result<Self> {
        let dir_name = package.deploy_dir_name();
        let mut components = Utf8Path::new(&dir_name).components();
        let is_plain = matches!(
            (components.next(), components.next()),
            (Some(Utf8Component::Normal(_)), None)
        );
        if !is_plain {
            return Err(Error::config(
                format!("Invalid deployment directory name '{}'", dir_name),
                "Package name and version must not be empty or contain path separators",
            ));
        }

        Ok(Self {
            target_root: output_dir.join(dir_name),
            clear_before_run: true,
            cleanup_on_failure: true,
        })
    }

    /// Deploy into `prefix` without ever deleting it
    pub fn persistent(prefix: impl Into<Utf8PathBuf>) -> Self {
        Self {
            target_root: prefix.into(),
            clear_before_run: false,
            cleanup_on_failure: false,
        }
    }

    /// Deploy into `$HOME/.local` without ever deleting it
    pub fn persistent_in_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::config(
                "Cannot determine the home directory for the persistent profile",
                "Set HOME or configure deploy.persistent_prefix",
            )
        })?;
        let home = Utf8PathBuf::try_from(home).map_err(|e| {
            Error::config(
                format!("Home directory is not valid UTF-8: {:?}", e.as_path()),
                "Configure deploy.persistent_prefix with a UTF-8 path",
            )
        })?;
        Ok(Self::persistent(home.join(".local")))
    }

    /// Resolve a profile to its policy
    pub fn for_profile(
        profile: DeployProfile,
        output_dir: &Utf8Path,
        package: &RootPackage,
        persistent_prefix: Option<&Utf8Path>,
    ) -> Result<Self> {
        match (profile, persistent_prefix) {
            (DeployProfile::Isolated, _) => Self::isolated(output_dir, package),
            (DeployProfile::Persistent, Some(prefix)) => Ok(Self::persistent(prefix)),
            (DeployProfile::Persistent, None) => Self::persistent_in_home(),
        }
    }
}

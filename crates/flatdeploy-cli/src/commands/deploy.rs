//! Deploy command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use flatdeploy_core::config::Config;
use flatdeploy_core::deploy::{DeployManager, DeployPolicy, DeployProfile};
use miette::Result;

/// Deployment profile selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Per-package directory in the output directory, rebuilt every run
    #[value(alias = "isolated")]
    Flatdeploy,
    /// Shared user prefix ($HOME/.local), never cleared
    Persistent,
}

impl From<ProfileArg> for DeployProfile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Flatdeploy => DeployProfile::Isolated,
            ProfileArg::Persistent => DeployProfile::Persistent,
        }
    }
}

/// Arguments for the deploy command
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Deployment profile (overrides deploy.profile)
    #[arg(short, long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Directory for the isolated deployment and the manifest (overrides deploy.output_dir)
    #[arg(short, long)]
    pub output_dir: Option<Utf8PathBuf>,

    /// Print the manifest to stdout after deploying
    #[arg(long)]
    pub print_manifest: bool,
}

/// Run the deploy command
pub fn run(config_path: &Utf8Path, args: DeployArgs) -> Result<()> {
    tracing::info!("Loading dependency graph from {}", config_path);

    let config = Config::load(config_path)?;
    let package = config.root_package();
    let graph = config.graph();

    let profile = args
        .profile
        .map(DeployProfile::from)
        .unwrap_or(config.deploy.profile);
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.deploy.output_dir.clone());

    let policy = DeployPolicy::for_profile(
        profile,
        &output_dir,
        &package,
        config.deploy.persistent_prefix.as_deref(),
    )?;

    if package.requires.is_empty() {
        tracing::warn!("No requirements to deploy");
    }

    tracing::info!(
        "Deploying {} requirements with profile '{}'",
        package.requires.len(),
        profile
    );

    let report = DeployManager::new(&graph)
        .with_cycle_policy(config.deploy.on_cycle)
        .deploy(&package.requires, &policy, &output_dir)?;

    if !report.conflicts.is_empty() {
        tracing::warn!(
            "{} file conflicts, the file of the later dependency was kept",
            report.conflicts.len()
        );
    }

    tracing::info!("Manifest written to {}", report.manifest_path);

    if args.print_manifest {
        print!("{}", report.manifest.render());
    }

    Ok(())
}

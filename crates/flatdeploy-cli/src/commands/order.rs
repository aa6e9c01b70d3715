//! Order command implementation

use camino::Utf8Path;
use flatdeploy_core::config::Config;
use flatdeploy_core::deploy::merge_order;
use miette::Result;

/// Run the order command
pub fn run(config_path: &Utf8Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let package = config.root_package();
    let graph = config.graph();

    let order = merge_order(&package.requires, &graph, config.deploy.on_cycle)?;

    if order.is_empty() {
        tracing::warn!("No requirements to deploy");
        return Ok(());
    }

    println!("Dependencies in merge order:");
    for (index, name) in order.iter().enumerate() {
        if let Some(node) = graph.get(name) {
            println!("  {:>3}. {} ({})", index + 1, name, node.root);
        }
    }

    Ok(())
}

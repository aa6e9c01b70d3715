//! Dependency-first traversal of the dependency graph
//!
//! Every reachable node is visited exactly once. A node's public dependencies
//! are visited (in declaration order) before the node itself, so a dependent
//! is always merged after the packages it depends on and can shadow their
//! files.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::graph::{DependencyGraph, DependencyNode};
use crate::{Error, Result};

/// How the walk reacts to a dependency cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Log the cycle and keep going; the visited set breaks the cycle
    #[default]
    Warn,
    /// Fail the run with [`Error::CircularDependency`]
    Error,
}

/// Per-run traversal state
#[derive(Debug, Default)]
struct WalkState {
    /// Nodes already entered during this run
    visited: HashSet<String>,
    /// Nodes on the current recursion path, outermost first
    path: Vec<String>,
    /// Nodes in the order they were handed to the visitor
    order: Vec<String>,
}

impl WalkState {
    /// Mark `name` visited, returning false if it already was
    fn enter(&mut self, name: &str) -> bool {
        if self.visited.contains(name) {
            return false;
        }
        self.visited.insert(name.to_string());
        true
    }

    /// The cycle closed by a back edge to `name`, if `name` is on the current path
    fn cycle_to(&self, name: &str) -> Option<Vec<String>> {
        let start = self.path.iter().position(|entry| entry == name)?;
        let mut cycle = self.path[start..].to_vec();
        cycle.push(name.to_string());
        Some(cycle)
    }
}

/// Walk the graph from `roots`, calling `visit` once per reachable node
///
/// Returns the names in the order `visit` was called. The first error from
/// `visit` or from resolving a node aborts the walk.
pub fn walk<F>(
    roots: &[String],
    graph: &DependencyGraph,
    cycle_policy: CyclePolicy,
    mut visit: F,
) -> Result<Vec<String>>
where
    F: FnMut(&DependencyNode) -> Result<()>,
{
    let mut state = WalkState::default();

    for root in roots {
        if !state.enter(root) {
            continue;
        }
        let node = graph.resolve(root, None)?;
        visit_node(node, graph, cycle_policy, &mut state, &mut visit)?;
    }

    Ok(state.order)
}

/// The order in which dependencies would be merged, without merging anything
pub fn merge_order(
    roots: &[String],
    graph: &DependencyGraph,
    cycle_policy: CyclePolicy,
) -> Result<Vec<String>> {
    walk(roots, graph, cycle_policy, |_| Ok(()))
}

fn visit_node<F>(
    node: &DependencyNode,
    graph: &DependencyGraph,
    cycle_policy: CyclePolicy,
    state: &mut WalkState,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(&DependencyNode) -> Result<()>,
{
    state.path.push(node.name.clone());

    for dep in &node.public_deps {
        if !state.enter(dep) {
            if let Some(cycle) = state.cycle_to(dep) {
                match cycle_policy {
                    CyclePolicy::Warn => {
                        tracing::warn!(
                            cycle = %cycle.join(" -> "),
                            "Dependency cycle detected, {} will be deployed after {}",
                            dep,
                            node.name
                        );
                    }
                    CyclePolicy::Error => return Err(Error::circular_dependency(cycle)),
                }
            }
            continue;
        }

        let dep_node = graph.resolve(dep, Some(node.name.as_str()))?;
        visit_node(dep_node, graph, cycle_policy, state, visit)?;
    }

    state.path.pop();

    visit(node)?;
    state.order.push(node.name.clone());
    Ok(())
}

//! flatdeploy-core - Core library for flatdeploy
//!
//! This crate flattens the install roots of a package's dependency graph into
//! a single directory, including:
//! - Configuration file parsing and merging
//! - The dependency graph handed over by the package resolver
//! - Dependency-first graph traversal with diamond and cycle handling
//! - File merging with conflict reporting and symlink preservation
//! - Isolated and persistent deployment profiles with manifest output

pub mod config;
pub mod deploy;
pub mod error;
pub mod graph;

pub use error::{Error, Result};

//! Error types for flatdeploy

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for flatdeploy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flatdeploy
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// A declared dependency has no node in the graph
    #[error("Dependency resolution error: {message}")]
    Resolution {
        message: String,
        #[help]
        help: String,
    },

    /// Circular dependency detected
    #[error("Circular dependency detected: {}", .packages.join(" -> "))]
    #[diagnostic(help(
        "Check the public dependency declarations, or set deploy.on_cycle = \"warn\""
    ))]
    CircularDependency {
        /// Packages involved in the cycle, first package repeated at the end
        packages: Vec<String>,
    },

    /// Copying a file of a dependency into the target root failed
    #[error("Failed to deploy {path} of {dependency}: {source}")]
    #[diagnostic(help("Check permissions and free space of the source and target directories"))]
    Copy {
        dependency: String,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deploy error
    #[error("Deploy error: {message}")]
    Deploy {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a dependency resolution error
    pub fn resolution(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a circular dependency error
    pub fn circular_dependency(packages: Vec<String>) -> Self {
        Self::CircularDependency { packages }
    }

    /// Create a copy error for a file of `dependency`
    pub fn copy(
        dependency: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Copy {
            dependency: dependency.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a deploy error
    pub fn deploy(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Deploy {
            message: message.into(),
            help: help.into(),
        }
    }
}

//! Error types for register storage and coordination.

use std::path::PathBuf;

use snafu::Snafu;

/// Errors from the register store and coordinator.
///
/// A CAS mismatch is not represented here: it is a normal, reported outcome
/// of [`crate::Coordinator::compare_and_swap`], not a failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RegisterError {
    /// Register name fails the `^[A-Za-z0-9]{{0,32}}$` pattern.
    #[snafu(display("invalid register name: '{name}'"))]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Filesystem access to a register file failed.
    #[snafu(display("failed to access register file {}: {source}", path.display()))]
    Io {
        /// Path of the register file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A register file holds content that does not parse as JSON.
    #[snafu(display("register '{name}' holds unparseable content: {source}"))]
    Corrupt {
        /// The register whose file is damaged.
        name: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A value could not be serialized for persistence.
    #[snafu(display("failed to serialize value for register '{name}': {source}"))]
    Serialize {
        /// The register being written.
        name: String,
        /// Underlying serialization error.
        source: serde_json::Error,
    },
}

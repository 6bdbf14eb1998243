//! Error types for doctree.

use std::fmt;

use crate::node::NodeType;
use crate::version::VersionId;

/// Result type alias for doctree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the checked tree operations.
///
/// Protocol violations (unbalanced editing brackets, editing a shared node)
/// panic instead; these variants back the `try_*` entry points used by hosts
/// that must not abort.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A version below the oldest retained history entry was requested.
    VersionBelowFloor {
        requested: VersionId,
        floor: VersionId,
    },
    /// A version newer than anything the document has issued.
    FutureVersion {
        requested: VersionId,
        latest: VersionId,
    },
    /// Child index outside the container's children at the queried version.
    ChildOutOfRange { index: usize, count: usize },
    /// The node has no children.
    NotAContainer(NodeType),
    /// A structural invariant does not hold.
    InvariantViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionBelowFloor { requested, floor } => {
                write!(f, "version {requested} is below the retained floor {floor}")
            }
            Self::FutureVersion { requested, latest } => {
                write!(f, "version {requested} is newer than the latest version {latest}")
            }
            Self::ChildOutOfRange { index, count } => {
                write!(f, "child index {index} out of range for {count} children")
            }
            Self::NotAContainer(node_type) => write!(f, "{node_type} node has no children"),
            Self::InvariantViolation(detail) => write!(f, "invariant violated: {detail}"),
        }
    }
}

impl std::error::Error for Error {}

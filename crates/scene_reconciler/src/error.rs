//! Structured, path-annotated diagnostics raised during reconciliation
//!
//! Every error is scoped to the smallest unit possible: one prop, one attach,
//! or one subtree. None of them aborts a reconciliation pass.

use crate::native::PropError;
use std::fmt;
use thiserror::Error;

/// Location of a declarative node, e.g. `root/group[0]/mesh[2]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath(Vec<(String, usize)>);

impl TreePath {
    /// Path of the root container
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the `index`-th child with the given tag
    pub fn child(&self, tag: &str, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push((tag.to_string(), index));
        Self(segments)
    }

    /// Nesting depth (root is 0)
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for (tag, index) in &self.0 {
            write!(f, "/{tag}[{index}]")?;
        }
        Ok(())
    }
}

/// Diagnostics produced by a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Tag not in the catalogue and no explicit constructor given.
    /// The subtree rooted at `path` was not built.
    #[error("{path}: unknown tag `{tag}`")]
    UnknownTag {
        /// Offending tag
        tag: String,
        /// Node location
        path: TreePath,
    },

    /// The native constructor rejected the arguments; the subtree was not built
    #[error("{path}: failed to construct `{tag}`: {reason}")]
    Construction {
        /// Offending tag
        tag: String,
        /// Node location
        path: TreePath,
        /// Constructor message
        reason: String,
    },

    /// A single prop was rejected; sibling props were still applied
    #[error("{path}: `{tag}` rejected prop `{prop}`: {source}")]
    InvalidProp {
        /// Node tag
        tag: String,
        /// Node location
        path: TreePath,
        /// Prop name
        prop: String,
        /// Native error
        source: PropError,
    },

    /// The parent has no such slot; the child was mounted as a plain child
    /// when the parent accepts children, otherwise the subtree was dropped
    #[error("{path}: cannot attach `{tag}` to `{slot}`: {reason}")]
    AttachTargetMissing {
        /// Child tag
        tag: String,
        /// Child location
        path: TreePath,
        /// Requested slot
        slot: String,
        /// Resolver message
        reason: String,
    },

    /// The parent cannot hold ordinary children; the subtree was dropped
    #[error("{path}: parent does not accept child `{tag}`")]
    ChildRejected {
        /// Child tag
        tag: String,
        /// Child location
        path: TreePath,
    },

    /// The native disposal hook failed; the instance was still released
    #[error("{path}: disposing `{tag}` failed: {reason}")]
    Disposal {
        /// Node tag
        tag: String,
        /// Node location
        path: TreePath,
        /// Disposal message
        reason: String,
    },
}

impl ReconcileError {
    /// Location of the offending node
    pub fn path(&self) -> &TreePath {
        match self {
            Self::UnknownTag { path, .. }
            | Self::Construction { path, .. }
            | Self::InvalidProp { path, .. }
            | Self::AttachTargetMissing { path, .. }
            | Self::ChildRejected { path, .. }
            | Self::Disposal { path, .. } => path,
        }
    }

    /// Tag of the offending node
    pub fn tag(&self) -> &str {
        match self {
            Self::UnknownTag { tag, .. }
            | Self::Construction { tag, .. }
            | Self::InvalidProp { tag, .. }
            | Self::AttachTargetMissing { tag, .. }
            | Self::ChildRejected { tag, .. }
            | Self::Disposal { tag, .. } => tag,
        }
    }
}

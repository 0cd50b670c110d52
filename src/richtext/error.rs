use thiserror::Error;

use super::node_tree::NodeId;

/// Result of an editing operation
pub type EditResult<T = ()> = Result<T, EditError>;

/// Errors that abort an editing operation.
///
/// There is no rollback: whatever was mutated before the error stays in place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("offset {offset} is outside 0..={len}")]
    InvalidOffset { offset: usize, len: usize },

    #[error("node {0} is not a text node")]
    NotText(NodeId),

    #[error("node {0} is not inside a row")]
    NoRow(NodeId),
}

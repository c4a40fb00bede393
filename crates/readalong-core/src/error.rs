use crate::document::NodeId;

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Failures raised by tree primitives.
///
/// None of these escape the playback controller; they are turned into the
/// terminal cleanup path there.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),

    #[error("node {0} is not a text leaf")]
    NotText(NodeId),

    #[error("node {0} cannot hold children")]
    NotContainer(NodeId),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("range {start}..{end} is out of bounds for node {node} (len {len})")]
    OutOfRange {
        node: NodeId,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("offset {offset} of node {node} is not on a character boundary")]
    NotCharBoundary { node: NodeId, offset: usize },
}

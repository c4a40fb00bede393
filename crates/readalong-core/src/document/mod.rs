//! Abstraction over the host's live text tree.
//!
//! The core never owns the tree. It borrows it for the duration of one event
//! through the [`Document`] trait, which exposes the handful of DOM-like
//! primitives the linearizer and the reconciler need. [`ArenaDocument`] is the
//! in-memory implementation used by the replay tool and the tests.

mod arena;

pub use arena::{ArenaDocument, BuiltNodes, NodeSpec};

use crate::error::DocumentResult;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Handle to a node in the host tree.
///
/// Handles are only trusted for a single resolve/reconcile cycle; after any
/// mutation the holder must re-check liveness with [`Document::is_attached`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is, as far as narration cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Structural container (paragraph, emphasis, list item, ...).
    Element { tag: String },
    /// The decoration wrapper around the word being spoken.
    Marker,
    /// Leaf holding literal text.
    Text(String),
}

/// Structural change notification emitted by the host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationRecord {
    Added { parent: NodeId, node: NodeId },
    Removed { parent: NodeId, node: NodeId },
}

impl MutationRecord {
    pub fn parent(&self) -> NodeId {
        match self {
            MutationRecord::Added { parent, .. } | MutationRecord::Removed { parent, .. } => {
                *parent
            }
        }
    }
}

/// Live tree the narration engine reads and decorates.
pub trait Document {
    /// Node everything attached hangs from.
    fn document_root(&self) -> NodeId;

    fn kind(&self, node: NodeId) -> Option<&NodeKind>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Create a detached text leaf.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Create a detached, empty decoration marker.
    fn create_marker(&mut self) -> NodeId;

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`. A `child` that is already attached somewhere is
    /// moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DocumentResult<()>;

    /// Detach `node` from its parent. Detaching a detached node is a no-op.
    fn remove(&mut self, node: NodeId) -> DocumentResult<()>;

    fn set_text(&mut self, node: NodeId, text: &str) -> DocumentResult<()>;

    fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Text(_)))
    }

    fn is_marker(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Marker))
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.first_child(node);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.next_sibling(child);
        }
        out
    }

    /// Liveness query: whether `node` is reachable from the document root.
    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.document_root(), node)
    }

    /// Whether `node` is `ancestor` or lies below it.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if self.kind(node).is_none() {
            return false;
        }
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Concatenated text of every leaf under `node`, markers included.
    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let Some(text) = self.text(id) {
                out.push_str(text);
            }
        }
        out
    }

    /// `node` and everything below it, in document order.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        if self.kind(node).is_none() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

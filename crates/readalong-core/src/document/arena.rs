use super::{Document, MutationRecord, NodeId, NodeKind};
use crate::error::{DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag given to the synthetic node every attached node hangs from.
pub const DOCUMENT_TAG: &str = "#document";

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    previous_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            previous_sibling: None,
        }
    }
}

/// In-memory tree with sibling links stored in an arena.
///
/// Ids are never recycled: a removed node stays in the arena, detached, so a
/// stale handle can be asked about liveness without aliasing a newer node.
/// Each highlighted word leaves a few dead nodes behind and mutation records
/// pile up until [`ArenaDocument::take_mutations`] drains them, so this tree
/// suits replays and tests rather than long-lived embedding. Ids are `u32`,
/// which caps a document at `u32::MAX` allocations over its lifetime.
#[derive(Debug, Clone)]
pub struct ArenaDocument {
    nodes: Vec<Node>,
    mutations: Vec<MutationRecord>,
}

impl Default for ArenaDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Element {
                tag: DOCUMENT_TAG.to_string(),
            })],
            mutations: Vec::new(),
        }
    }

    /// Build a document whose root holds the subtree described by `spec`.
    pub fn from_spec(spec: &NodeSpec) -> DocumentResult<(Self, BuiltNodes)> {
        let mut doc = Self::new();
        let root = doc.document_root();
        let built = doc.build(root, spec)?;
        doc.mutations.clear();
        Ok((doc, built))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
        })
    }

    /// Materialize `spec` and append it under `parent`.
    pub fn build(&mut self, parent: NodeId, spec: &NodeSpec) -> DocumentResult<BuiltNodes> {
        let mut labels = HashMap::new();
        let root = self.build_detached(spec, &mut labels)?;
        self.insert_before(parent, root, None)?;
        Ok(BuiltNodes { root, labels })
    }

    /// Host-side removal, e.g. the renderer dropping a block mid-narration.
    pub fn detach(&mut self, node: NodeId) -> DocumentResult<()> {
        self.remove(node)
    }

    /// Host-side re-render: drop every child of `parent` and build `specs`
    /// in their place.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        specs: &[NodeSpec],
    ) -> DocumentResult<HashMap<String, NodeId>> {
        for child in self.children(parent) {
            self.remove(child)?;
        }
        let mut labels = HashMap::new();
        for spec in specs {
            let built = self.build(parent, spec)?;
            labels.extend(built.labels);
        }
        Ok(labels)
    }

    /// Drain the structural-change records accumulated since the last call.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> DocumentResult<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(DocumentError::UnknownNode(id))
    }

    fn build_detached(
        &mut self,
        spec: &NodeSpec,
        labels: &mut HashMap<String, NodeId>,
    ) -> DocumentResult<NodeId> {
        let (id, label) = match spec {
            NodeSpec::Text { text, label } => (self.create_text(text), label),
            NodeSpec::Element {
                tag,
                label,
                children,
            } => {
                let id = self.create_element(tag);
                for child in children {
                    let child_id = self.build_detached(child, labels)?;
                    self.insert_before(id, child_id, None)?;
                }
                (id, label)
            }
        };
        if let Some(label) = label {
            labels.insert(label.clone(), id);
        }
        Ok(id)
    }

    fn unlink(&mut self, node: NodeId) -> DocumentResult<Option<NodeId>> {
        let (parent, prev, next) = {
            let entry = self.node(node).ok_or(DocumentError::UnknownNode(node))?;
            (entry.parent, entry.previous_sibling, entry.next_sibling)
        };
        let Some(parent) = parent else {
            return Ok(None);
        };
        match prev {
            Some(prev) => self.node_mut(prev)?.next_sibling = next,
            None => self.node_mut(parent)?.first_child = next,
        }
        match next {
            Some(next) => self.node_mut(next)?.previous_sibling = prev,
            None => self.node_mut(parent)?.last_child = prev,
        }
        let entry = self.node_mut(node)?;
        entry.parent = None;
        entry.previous_sibling = None;
        entry.next_sibling = None;
        Ok(Some(parent))
    }
}

impl Document for ArenaDocument {
    fn document_root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.node(node).map(|n| &n.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.first_child)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.next_sibling)
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.previous_sibling)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn create_marker(&mut self) -> NodeId {
        self.alloc(NodeKind::Marker)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DocumentResult<()> {
        match self.kind(parent) {
            None => return Err(DocumentError::UnknownNode(parent)),
            Some(NodeKind::Text(_)) => return Err(DocumentError::NotContainer(parent)),
            Some(_) => {}
        }
        if self.kind(child).is_none() {
            return Err(DocumentError::UnknownNode(child));
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DocumentError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            if reference == child {
                return Ok(());
            }
        }
        if self.contains(child, parent) {
            return Err(DocumentError::Cycle { parent, child });
        }

        if let Some(old_parent) = self.unlink(child)? {
            self.mutations.push(MutationRecord::Removed {
                parent: old_parent,
                node: child,
            });
        }

        let prev = match reference {
            Some(reference) => self.previous_sibling(reference),
            None => self.node(parent).and_then(|n| n.last_child),
        };
        {
            let entry = self.node_mut(child)?;
            entry.parent = Some(parent);
            entry.previous_sibling = prev;
            entry.next_sibling = reference;
        }
        match prev {
            Some(prev) => self.node_mut(prev)?.next_sibling = Some(child),
            None => self.node_mut(parent)?.first_child = Some(child),
        }
        match reference {
            Some(reference) => self.node_mut(reference)?.previous_sibling = Some(child),
            None => self.node_mut(parent)?.last_child = Some(child),
        }
        self.mutations.push(MutationRecord::Added {
            parent,
            node: child,
        });
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> DocumentResult<()> {
        if let Some(parent) = self.unlink(node)? {
            self.mutations.push(MutationRecord::Removed { parent, node });
        }
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> DocumentResult<()> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Text(current) => {
                current.clear();
                current.push_str(text);
                Ok(())
            }
            _ => Err(DocumentError::NotText(node)),
        }
    }
}

/// Declarative description of a subtree, used by fixtures and scenario files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
}

impl NodeSpec {
    pub fn text(text: impl Into<String>) -> Self {
        NodeSpec::Text {
            text: text.into(),
            label: None,
        }
    }

    pub fn element(tag: impl Into<String>, children: Vec<NodeSpec>) -> Self {
        NodeSpec::Element {
            tag: tag.into(),
            label: None,
            children,
        }
    }

    pub fn labeled(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            NodeSpec::Text { label, .. } | NodeSpec::Element { label, .. } => {
                *label = Some(name.into());
            }
        }
        self
    }
}

/// Ids created by [`ArenaDocument::build`].
#[derive(Debug, Clone, Default)]
pub struct BuiltNodes {
    pub root: NodeId,
    pub labels: HashMap<String, NodeId>,
}

impl BuiltNodes {
    pub fn get(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }
}

//! Decorating the spoken word without changing the text.
//!
//! Every progress event runs the same cycle: unwrap whatever marker is live,
//! rebuild the segment map from scratch, resolve the offset, split the leaf
//! around the word and wrap it. A word whose leaf was removed by the host
//! since the last event ends the narration instead. Node handles are never
//! trusted across a mutation, which is why the map is rebuilt instead of
//! patched.

use crate::document::{Document, NodeId};
use crate::error::{DocumentError, DocumentResult};
use crate::linearize::LinearizeOptions;
use crate::resolve::resolve;
use crate::session::NarrationSession;
use tracing::{debug, trace};

/// Offset and length reported by a word boundary event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub char_index: usize,
    pub char_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No segment holds the offset (gap, past the end, tree shifted).
    Unresolved,
    /// The text under the session root no longer matches what is being spoken.
    TextDrifted,
    /// Zero-length word and nothing to infer it from.
    EmptyWord,
    /// Offset or length lands inside a code point.
    SplitCodePoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Marked {
        marker: NodeId,
        node_offset: usize,
        length: usize,
    },
    Missed(MissReason),
    /// Session root or the resolved leaf left the document.
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub linearize: LinearizeOptions,
    pub infer_word_length: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            linearize: LinearizeOptions::default(),
            infer_word_length: true,
        }
    }
}

/// Owner of the single live decoration marker.
#[derive(Debug, Default)]
pub struct Highlighter {
    marker: Option<NodeId>,
}

impl Highlighter {
    pub fn active_marker(&self) -> Option<NodeId> {
        self.marker
    }

    /// Drop the marker handle when the host already removed it.
    pub fn forget_if_detached<D: Document>(&mut self, doc: &D) -> bool {
        match self.marker {
            Some(marker) if !doc.is_attached(marker) => {
                debug!(%marker, "Marker removed by host; forgetting it");
                self.marker = None;
                true
            }
            _ => false,
        }
    }

    /// Unwrap the live marker and any stray marker still under `root`.
    ///
    /// Returns how many markers were unwrapped. Without a marker this does
    /// not touch the tree. Detached markers and detached roots are left
    /// alone.
    pub fn clear<D: Document>(&mut self, doc: &mut D, root: NodeId) -> DocumentResult<usize> {
        let mut removed = 0;
        if let Some(marker) = self.marker.take() {
            if doc.is_attached(marker) {
                unwrap_marker(doc, marker)?;
                removed += 1;
            } else {
                debug!(%marker, "Active marker already detached; nothing to unwrap");
            }
        }
        if doc.is_attached(root) {
            for stray in markers_in(doc, root) {
                debug!(marker = %stray, %root, "Unwrapping stray marker");
                unwrap_marker(doc, stray)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn mark<D: Document>(
        &mut self,
        doc: &mut D,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> DocumentResult<NodeId> {
        let marker = split_and_mark(doc, node, start, end)?;
        self.marker = Some(marker);
        Ok(marker)
    }
}

/// Every marker at or below `root`, in document order.
pub fn markers_in<D: Document>(doc: &D, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|id| doc.is_marker(*id))
        .collect()
}

/// Replace `marker` with a plain leaf holding its text and merge that leaf
/// with its neighbouring leaves. Returns the merged leaf, if any text is left.
pub fn unwrap_marker<D: Document>(doc: &mut D, marker: NodeId) -> DocumentResult<Option<NodeId>> {
    let Some(parent) = doc.parent(marker) else {
        return Ok(None);
    };
    let text = doc.text_content(marker);
    let restored = doc.create_text(&text);
    doc.insert_before(parent, restored, Some(marker))?;
    doc.remove(marker)?;
    merge_text_run(doc, restored)
}

/// Collapse the contiguous run of sibling leaves around `node` into its first
/// leaf. An all-empty run is removed.
pub fn merge_text_run<D: Document>(doc: &mut D, node: NodeId) -> DocumentResult<Option<NodeId>> {
    let mut first = node;
    while let Some(prev) = doc.previous_sibling(first) {
        if !doc.is_text(prev) {
            break;
        }
        first = prev;
    }
    let mut run = vec![first];
    let mut cursor = doc.next_sibling(first);
    while let Some(next) = cursor {
        if !doc.is_text(next) {
            break;
        }
        run.push(next);
        cursor = doc.next_sibling(next);
    }

    let merged: String = run.iter().filter_map(|id| doc.text(*id)).collect();
    if merged.is_empty() {
        for id in run {
            doc.remove(id)?;
        }
        return Ok(None);
    }
    if run.len() > 1 {
        doc.set_text(first, &merged)?;
        for id in &run[1..] {
            doc.remove(*id)?;
        }
    }
    Ok(Some(first))
}

/// Split leaf `node` at byte range `start..end`: `before`, a marker holding
/// the word, and `after` take its place, in that order. Empty parts are not
/// inserted.
pub fn split_and_mark<D: Document>(
    doc: &mut D,
    node: NodeId,
    start: usize,
    end: usize,
) -> DocumentResult<NodeId> {
    let text = doc
        .text(node)
        .ok_or(DocumentError::NotText(node))?
        .to_string();
    let parent = doc.parent(node).ok_or(DocumentError::Detached(node))?;
    if start >= end || end > text.len() {
        return Err(DocumentError::OutOfRange {
            node,
            start,
            end,
            len: text.len(),
        });
    }
    for offset in [start, end] {
        if !text.is_char_boundary(offset) {
            return Err(DocumentError::NotCharBoundary { node, offset });
        }
    }

    let (before, word, after) = (&text[..start], &text[start..end], &text[end..]);
    if !before.is_empty() {
        let leaf = doc.create_text(before);
        doc.insert_before(parent, leaf, Some(node))?;
    }
    let marker = doc.create_marker();
    let inner = doc.create_text(word);
    doc.insert_before(marker, inner, None)?;
    doc.insert_before(parent, marker, Some(node))?;
    if !after.is_empty() {
        let leaf = doc.create_text(after);
        doc.insert_before(parent, leaf, Some(node))?;
    }
    doc.remove(node)?;
    Ok(marker)
}

/// Run the full clear/relinearize/resolve/split cycle for one word boundary.
pub fn reconcile<D: Document>(
    doc: &mut D,
    session: &mut NarrationSession,
    boundary: Boundary,
    options: &ReconcileOptions,
) -> DocumentResult<Outcome> {
    let root = session.root;
    if !doc.is_attached(root) {
        return Ok(Outcome::Detached);
    }
    // The leaf the previous map holds for this offset was removed by the host.
    if let Some(stale) = resolve(&session.segments, boundary.char_index) {
        if !doc.is_attached(stale.node) {
            debug!(node = %stale.node, "Narrated leaf left the document");
            return Ok(Outcome::Detached);
        }
    }

    session.highlighter.clear(doc, root)?;
    let fresh = session.relinearize(doc, &options.linearize);
    let unit = options.linearize.unit;

    let Some(resolved) = resolve(&session.segments, boundary.char_index) else {
        trace!(char_index = boundary.char_index, "Boundary outside every segment");
        return Ok(Outcome::Missed(MissReason::Unresolved));
    };
    if !doc.is_attached(resolved.node) {
        return Ok(Outcome::Detached);
    }
    let Some(text) = doc.text(resolved.node).map(str::to_owned) else {
        return Ok(Outcome::Missed(MissReason::Unresolved));
    };
    let Some(start) = unit.byte_index(&text, resolved.node_offset) else {
        return Ok(Outcome::Missed(MissReason::SplitCodePoint));
    };

    let mut length = boundary.char_length;
    if length == 0 && options.infer_word_length {
        length = unit.word_len_at(&text, start);
    }
    let length = length.min(resolved.remaining());
    if length == 0 {
        return Ok(Outcome::Missed(MissReason::EmptyWord));
    }
    let Some(end) = unit.byte_index(&text, resolved.node_offset + length) else {
        return Ok(Outcome::Missed(MissReason::SplitCodePoint));
    };

    if fresh != session.raw_text {
        let spoken = unit.slice(&session.raw_text, boundary.char_index, length);
        let current = unit.slice(&fresh, boundary.char_index, length);
        if spoken.is_none() || spoken != current {
            debug!(
                char_index = boundary.char_index,
                length,
                spoken = spoken.unwrap_or_default(),
                current = current.unwrap_or_default(),
                "Narrated text drifted under the boundary; skipping"
            );
            return Ok(Outcome::Missed(MissReason::TextDrifted));
        }
    }

    let marker = session.highlighter.mark(doc, resolved.node, start, end)?;
    session.relinearize(doc, &options.linearize);
    trace!(
        %marker,
        node = %resolved.node,
        node_offset = resolved.node_offset,
        length,
        "Marked spoken word"
    );
    Ok(Outcome::Marked {
        marker,
        node_offset: resolved.node_offset,
        length,
    })
}

use crate::document::{Document, NodeId};
use crate::linearize::{LinearizeOptions, Linearized, SegmentMap, linearize};
use crate::reconcile::Highlighter;
use crate::speech::UtteranceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    /// `speak` issued, engine has not reported `Start` yet.
    Pending,
    Speaking,
}

/// One playback-plus-highlighting run over a single source node.
#[derive(Debug)]
pub struct NarrationSession {
    pub root: NodeId,
    pub utterance: UtteranceId,
    /// Exactly what was handed to the speech engine.
    pub raw_text: String,
    pub segments: SegmentMap,
    pub highlighter: Highlighter,
    pub lifecycle: SessionLifecycle,
    pub highlights: usize,
    pub misses: usize,
}

impl NarrationSession {
    pub fn new(root: NodeId, utterance: UtteranceId, linearized: Linearized) -> Self {
        Self {
            root,
            utterance,
            raw_text: linearized.text,
            segments: linearized.segments,
            highlighter: Highlighter::default(),
            lifecycle: SessionLifecycle::Pending,
            highlights: 0,
            misses: 0,
        }
    }

    /// Rebuild the segment map from the current tree and return the freshly
    /// flattened text. Never patched incrementally.
    pub fn relinearize<D: Document>(&mut self, doc: &D, options: &LinearizeOptions) -> String {
        let fresh = linearize(doc, self.root, options);
        self.segments = fresh.segments;
        fresh.text
    }
}

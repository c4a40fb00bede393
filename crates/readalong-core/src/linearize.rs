//! Flattening of a text tree into the exact string handed to the speech
//! engine, plus the segment map translating offsets back to leaves.

use crate::document::{Document, NodeId};
use crate::text_units::OffsetUnit;
use serde::{Deserialize, Serialize};

/// What sits between two runs of text in the flattened string.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Separator {
    /// Plain concatenation.
    #[default]
    None,
    /// One ASCII space, present in both the text and the offset space.
    Space,
}

impl Separator {
    fn as_str(self) -> &'static str {
        match self {
            Separator::None => "",
            Separator::Space => " ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinearizeOptions {
    pub separator: Separator,
    pub unit: OffsetUnit,
}

/// Half-open range `[start, end)` of the flattened text occupied by `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Ascending, non-overlapping segments.
pub type SegmentMap = Vec<Segment>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linearized {
    pub text: String,
    pub segments: SegmentMap,
}

impl Linearized {
    /// Nothing to narrate.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum RunItem {
    Leaf(NodeId),
    Marker(NodeId),
}

struct Builder<'a, D: Document> {
    doc: &'a D,
    options: LinearizeOptions,
    out: Linearized,
    offset: usize,
}

/// Flatten the text below `root` in document order.
///
/// Adjacent text leaves (and a decoration marker between them) form one run;
/// a run that is whitespace-only is skipped entirely. Marker content keeps
/// its place in the offset space but never yields a segment, so a decorated
/// tree flattens to the same text as the undecorated one.
///
/// A `root` that is not attached to the document yields an empty result.
pub fn linearize<D: Document>(doc: &D, root: NodeId, options: &LinearizeOptions) -> Linearized {
    if !doc.is_attached(root) {
        return Linearized::default();
    }
    let mut builder = Builder {
        doc,
        options: *options,
        out: Linearized::default(),
        offset: 0,
    };
    if doc.is_text(root) {
        builder.flush(&mut vec![RunItem::Leaf(root)]);
    } else if doc.is_marker(root) {
        builder.flush(&mut vec![RunItem::Marker(root)]);
    } else {
        builder.walk(root);
    }
    builder.out
}

impl<D: Document> Builder<'_, D> {
    fn walk(&mut self, parent: NodeId) {
        let mut run = Vec::new();
        for child in self.doc.children(parent) {
            if self.doc.is_text(child) {
                run.push(RunItem::Leaf(child));
            } else if self.doc.is_marker(child) {
                run.push(RunItem::Marker(child));
            } else {
                self.flush(&mut run);
                self.walk(child);
            }
        }
        self.flush(&mut run);
    }

    fn item_text(&self, item: RunItem) -> String {
        match item {
            RunItem::Leaf(node) => self.doc.text(node).unwrap_or_default().to_string(),
            RunItem::Marker(node) => self.doc.text_content(node),
        }
    }

    fn flush(&mut self, run: &mut Vec<RunItem>) {
        if run.is_empty() {
            return;
        }
        let items = std::mem::take(run);
        let texts: Vec<String> = items.iter().map(|item| self.item_text(*item)).collect();
        if texts.iter().all(|text| text.trim().is_empty()) {
            return;
        }

        if !self.out.text.is_empty() {
            let sep = self.options.separator.as_str();
            self.out.text.push_str(sep);
            self.offset += self.options.unit.len(sep);
        }

        for (item, text) in items.into_iter().zip(texts) {
            let len = self.options.unit.len(&text);
            if let RunItem::Leaf(node) = item {
                if len > 0 {
                    self.out.segments.push(Segment {
                        node,
                        start: self.offset,
                        end: self.offset + len,
                    });
                }
            }
            self.out.text.push_str(&text);
            self.offset += len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ArenaDocument, NodeSpec};

    fn options(separator: Separator) -> LinearizeOptions {
        LinearizeOptions {
            separator,
            unit: OffsetUnit::Char,
        }
    }

    #[test]
    fn concatenates_leaves_without_separator() {
        let spec = NodeSpec::element(
            "p",
            vec![
                NodeSpec::text("Hello ").labeled("a"),
                NodeSpec::text("world!").labeled("b"),
            ],
        )
        .labeled("p");
        let (doc, built) = ArenaDocument::from_spec(&spec).unwrap();
        let out = linearize(&doc, built.get("p").unwrap(), &options(Separator::None));

        assert_eq!(out.text, "Hello world!");
        assert_eq!(
            out.segments,
            vec![
                Segment {
                    node: built.get("a").unwrap(),
                    start: 0,
                    end: 6
                },
                Segment {
                    node: built.get("b").unwrap(),
                    start: 6,
                    end: 12
                },
            ]
        );
    }

    #[test]
    fn skips_whitespace_only_leaves_between_blocks() {
        let spec = NodeSpec::element(
            "div",
            vec![
                NodeSpec::text("\n  "),
                NodeSpec::element("p", vec![NodeSpec::text("One.")]),
                NodeSpec::text("\n  "),
                NodeSpec::element("p", vec![NodeSpec::text("Two.")]),
                NodeSpec::text("\n"),
            ],
        )
        .labeled("div");
        let (doc, built) = ArenaDocument::from_spec(&spec).unwrap();
        let root = built.get("div").unwrap();

        let plain = linearize(&doc, root, &options(Separator::None));
        assert_eq!(plain.text, "One.Two.");
        assert_eq!(plain.segments.len(), 2);

        let spaced = linearize(&doc, root, &options(Separator::Space));
        assert_eq!(spaced.text, "One. Two.");
        assert_eq!(spaced.segments[1].start, 5);
        assert_eq!(spaced.segments[1].end, 9);
    }

    #[test]
    fn nested_elements_follow_document_order() {
        let spec = NodeSpec::element(
            "p",
            vec![
                NodeSpec::text("A "),
                NodeSpec::element(
                    "em",
                    vec![
                        NodeSpec::text("deeply "),
                        NodeSpec::element("b", vec![NodeSpec::text("nested")]),
                    ],
                ),
                NodeSpec::text(" tree"),
            ],
        )
        .labeled("p");
        let (doc, built) = ArenaDocument::from_spec(&spec).unwrap();
        let out = linearize(&doc, built.get("p").unwrap(), &options(Separator::None));
        assert_eq!(out.text, "A deeply nested tree");
        let starts: Vec<usize> = out.segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 2, 9, 15]);
    }

    #[test]
    fn marker_content_keeps_offsets_but_has_no_segment() {
        let mut doc = ArenaDocument::new();
        let root = doc.document_root();
        let p = doc.create_element("p");
        doc.insert_before(root, p, None).unwrap();
        let before = doc.create_text("Hello");
        let space = doc.create_text(" ");
        let marker = doc.create_marker();
        let word = doc.create_text("world");
        doc.insert_before(marker, word, None).unwrap();
        doc.insert_before(p, before, None).unwrap();
        doc.insert_before(p, space, None).unwrap();
        doc.insert_before(p, marker, None).unwrap();

        let out = linearize(&doc, p, &options(Separator::Space));
        assert_eq!(out.text, "Hello world");
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.segments[1].node, space);
        assert!(out.segments.iter().all(|s| s.node != word));
    }

    #[test]
    fn detached_or_blank_roots_are_empty() {
        let spec = NodeSpec::element("p", vec![NodeSpec::text("   "), NodeSpec::text("\t")])
            .labeled("p");
        let (mut doc, built) = ArenaDocument::from_spec(&spec).unwrap();
        let p = built.get("p").unwrap();
        assert!(linearize(&doc, p, &LinearizeOptions::default()).is_empty());
        assert_eq!(linearize(&doc, p, &LinearizeOptions::default()).text, "");

        doc.detach(p).unwrap();
        assert!(linearize(&doc, p, &LinearizeOptions::default()).is_empty());
    }

    #[test]
    fn text_root_is_its_own_segment() {
        let (doc, built) = ArenaDocument::from_spec(&NodeSpec::text("solo").labeled("t")).unwrap();
        let t = built.get("t").unwrap();
        let out = linearize(&doc, t, &LinearizeOptions::default());
        assert_eq!(out.text, "solo");
        assert_eq!(out.segments, vec![Segment { node: t, start: 0, end: 4 }]);
    }
}

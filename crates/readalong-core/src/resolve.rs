use crate::document::NodeId;
use crate::linearize::Segment;

/// A flattened-text offset mapped back onto a live leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub node: NodeId,
    pub node_offset: usize,
    pub segment: Segment,
}

impl Resolved {
    /// Units left in the leaf from `node_offset` on.
    pub fn remaining(&self) -> usize {
        self.segment.len() - self.node_offset
    }
}

/// Find the segment holding `char_index`.
///
/// `None` covers offsets in a gap, at or past the end of the text, and maps
/// gone stale after a mutation; callers skip the event rather than fail.
/// The map is sorted by construction, so this bisects on segment starts.
pub fn resolve(segments: &[Segment], char_index: usize) -> Option<Resolved> {
    let after = segments.partition_point(|segment| segment.start <= char_index);
    let segment = *segments.get(after.checked_sub(1)?)?;
    segment.contains(char_index).then(|| Resolved {
        node: segment.node,
        node_offset: char_index - segment.start,
        segment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> Vec<Segment> {
        vec![
            Segment {
                node: NodeId(1),
                start: 0,
                end: 6,
            },
            Segment {
                node: NodeId(2),
                start: 6,
                end: 12,
            },
            Segment {
                node: NodeId(3),
                start: 13,
                end: 20,
            },
        ]
    }

    #[test]
    fn maps_offset_to_leaf_and_residual() {
        let hit = resolve(&map(), 6).unwrap();
        assert_eq!(hit.node, NodeId(2));
        assert_eq!(hit.node_offset, 0);
        assert_eq!(hit.remaining(), 6);

        let hit = resolve(&map(), 5).unwrap();
        assert_eq!(hit.node, NodeId(1));
        assert_eq!(hit.node_offset, 5);

        assert_eq!(resolve(&map(), 19).unwrap().node, NodeId(3));
    }

    #[test]
    fn gaps_and_out_of_range_are_misses() {
        assert_eq!(resolve(&map(), 12), None);
        assert_eq!(resolve(&map(), 20), None);
        assert_eq!(resolve(&map(), 500), None);
        assert_eq!(resolve(&[], 0), None);
    }
}

//! The marker-tracking text buffer.
//!
//! `TokenBuffer` stores the visible text plus the markers (spans) that
//! anchor tokens into it. All text mutation funnels through one splice
//! primitive that keeps every marker consistent: ranges after the edit
//! shift, ranges whose text is deleted are dropped. Callers never adjust
//! offsets themselves and never cache a range across an edit; they re-query
//! markers after every splice.
//!
//! Markers are non-degenerate, non-overlapping half-open byte ranges
//! `[start, end)` on `char` boundaries. A marker's range always denotes
//! exactly the chip substring of its token. Defensive policy throughout:
//! malformed requests (out-of-range offsets, overlapping attaches) are
//! skipped with a debug log rather than allowed to corrupt the buffer.

use std::ops::Range;

use slotmap::{SlotMap, new_key_type};

use crate::token::TokenId;
use crate::tokenizer::clamp_to_char_boundary;

new_key_type! {
    /// A unique identifier for a marker in the buffer.
    pub struct MarkerId;
}

/// What a marker anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// A live token's chip.
    Token(TokenId),
    /// The synthetic overflow-count indicator ("N more…"). At most one
    /// exists, and only while the buffer is collapsed with hidden tokens.
    More,
}

/// An offset-tracking annotation binding a token (or the more-indicator) to
/// a range of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    range: Range<usize>,
    kind: MarkerKind,
}

impl Marker {
    /// The covered byte range.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// What this marker anchors.
    pub fn kind(&self) -> MarkerKind {
        self.kind
    }
}

/// The result of a splice: which markers the edit destroyed.
#[derive(Debug, Default)]
pub struct SpliceOutcome {
    /// Markers dropped because the edit deleted (part of) their range.
    pub dropped: Vec<(MarkerId, MarkerKind)>,
}

/// Mutable text plus the markers anchored into it.
#[derive(Debug, Default)]
pub struct TokenBuffer {
    text: String,
    markers: SlotMap<MarkerId, Marker>,
}

impl TokenBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The visible text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Remove all text and markers.
    pub fn clear(&mut self) -> SpliceOutcome {
        let dropped = self
            .markers
            .iter()
            .map(|(id, m)| (id, m.kind))
            .collect();
        self.text.clear();
        self.markers.clear();
        SpliceOutcome { dropped }
    }

    /// Replace `removed_len` bytes at `at` with `inserted`.
    ///
    /// This is the single edit primitive. Marker ranges are adjusted:
    ///
    /// - markers entirely before the edit are untouched
    /// - markers entirely after shift by the length delta
    /// - markers any part of whose range is deleted are dropped (a chip
    ///   cannot survive losing glyph text)
    /// - an insertion strictly inside a marker extends it
    ///
    /// Out-of-range or non-boundary offsets are clamped; a request that
    /// cannot be made sane is skipped entirely.
    pub fn splice(&mut self, at: usize, removed_len: usize, inserted: &str) -> SpliceOutcome {
        let at = clamp_to_char_boundary(&self.text, at);
        let end = clamp_to_char_boundary(&self.text, at.saturating_add(removed_len).min(self.text.len()));
        if end < at {
            tracing::debug!(
                target: "tagline::buffer",
                at,
                removed_len,
                "skipping malformed splice"
            );
            return SpliceOutcome::default();
        }
        let removed = end - at;
        if removed == 0 && inserted.is_empty() {
            return SpliceOutcome::default();
        }

        self.text.replace_range(at..end, inserted);

        let delta_ins = inserted.len();
        let mut dropped = Vec::new();
        for (id, marker) in self.markers.iter_mut() {
            if marker.range.end <= at {
                // Entirely before the edit.
            } else if marker.range.start >= end {
                // Entirely after: shift by the length delta.
                marker.range.start = marker.range.start - removed + delta_ins;
                marker.range.end = marker.range.end - removed + delta_ins;
            } else if removed > 0 {
                // Some of the marker's text was deleted.
                dropped.push((id, marker.kind));
            } else {
                // Pure insertion strictly inside the marker: extend.
                marker.range.end += delta_ins;
            }
        }
        for (id, _) in &dropped {
            self.markers.remove(*id);
        }

        tracing::trace!(
            target: "tagline::buffer",
            at,
            removed,
            inserted = delta_ins,
            dropped = dropped.len(),
            "spliced buffer"
        );
        SpliceOutcome { dropped }
    }

    /// Attach a marker over `range`.
    ///
    /// Returns `None` (and leaves the buffer untouched) for degenerate,
    /// out-of-range, non-boundary, or overlapping ranges.
    pub fn attach(&mut self, range: Range<usize>, kind: MarkerKind) -> Option<MarkerId> {
        if range.start >= range.end
            || range.end > self.text.len()
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            tracing::debug!(
                target: "tagline::buffer",
                start = range.start,
                end = range.end,
                len = self.text.len(),
                "rejecting malformed marker range"
            );
            return None;
        }
        let overlaps = self
            .markers
            .values()
            .any(|m| m.range.start < range.end && range.start < m.range.end);
        if overlaps {
            tracing::debug!(
                target: "tagline::buffer",
                start = range.start,
                end = range.end,
                "rejecting overlapping marker range"
            );
            return None;
        }
        Some(self.markers.insert(Marker { range, kind }))
    }

    /// Remove a marker without touching the text.
    pub fn detach(&mut self, id: MarkerId) -> Option<Marker> {
        self.markers.remove(id)
    }

    /// Look up a marker.
    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// The number of live markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// All markers sorted by ascending start offset.
    ///
    /// Ranges cannot overlap, so the sort is total.
    pub fn markers_in_order(&self) -> Vec<(MarkerId, Marker)> {
        let mut out: Vec<(MarkerId, Marker)> = self
            .markers
            .iter()
            .map(|(id, m)| (id, m.clone()))
            .collect();
        out.sort_by_key(|(_, m)| m.range.start);
        out
    }

    /// The marker whose range contains `pos`, if any.
    pub fn marker_at(&self, pos: usize) -> Option<(MarkerId, Marker)> {
        self.markers
            .iter()
            .find(|(_, m)| m.range.contains(&pos))
            .map(|(id, m)| (id, m.clone()))
    }

    /// The marker for a specific token.
    pub fn marker_for_token(&self, token: TokenId) -> Option<(MarkerId, Marker)> {
        self.markers
            .iter()
            .find(|(_, m)| m.kind == MarkerKind::Token(token))
            .map(|(id, m)| (id, m.clone()))
    }

    /// The more-marker, if present.
    pub fn more_marker(&self) -> Option<(MarkerId, Marker)> {
        self.markers
            .iter()
            .find(|(_, m)| m.kind == MarkerKind::More)
            .map(|(id, m)| (id, m.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn token_id(n: usize) -> TokenId {
        // Fabricate distinct keys through a scratch slotmap.
        let mut sm: SlotMap<TokenId, ()> = SlotMap::with_key();
        let mut last = sm.insert(());
        for _ in 1..n {
            last = sm.insert(());
        }
        last
    }

    #[test]
    fn test_insert_shifts_following_markers() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice bob");
        let m = buf.attach(6..9, MarkerKind::Token(token_id(1))).unwrap();

        buf.splice(0, 0, "hi ");
        assert_eq!(buf.text(), "hi alice bob");
        assert_eq!(buf.marker(m).unwrap().range(), 9..12);
    }

    #[test]
    fn test_delete_shifts_following_markers() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "xx alice");
        let m = buf.attach(3..8, MarkerKind::Token(token_id(1))).unwrap();

        buf.splice(0, 3, "");
        assert_eq!(buf.text(), "alice");
        assert_eq!(buf.marker(m).unwrap().range(), 0..5);
    }

    #[test]
    fn test_deleting_covered_range_drops_marker() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice bob");
        let m = buf.attach(0..5, MarkerKind::Token(token_id(1))).unwrap();

        let outcome = buf.splice(0, 6, "");
        assert_eq!(buf.text(), "bob");
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].0, m);
        assert!(buf.marker(m).is_none());
    }

    #[test]
    fn test_partial_deletion_drops_marker() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice bob");
        let m = buf.attach(0..5, MarkerKind::Token(token_id(1))).unwrap();

        // Deleting the tail of the chip text corrupts the glyph substring.
        let outcome = buf.splice(3, 3, "");
        assert_eq!(outcome.dropped.len(), 1);
        assert!(buf.marker(m).is_none());
    }

    #[test]
    fn test_insertion_inside_marker_extends_it() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice");
        let m = buf.attach(0..5, MarkerKind::Token(token_id(1))).unwrap();

        buf.splice(2, 0, "XY");
        assert_eq!(buf.text(), "alXYice");
        assert_eq!(buf.marker(m).unwrap().range(), 0..7);
    }

    #[test]
    fn test_insertion_at_marker_edges_does_not_extend() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice");
        let m = buf.attach(0..5, MarkerKind::Token(token_id(1))).unwrap();

        // At the end: marker is "entirely before" the edit.
        buf.splice(5, 0, "!");
        assert_eq!(buf.marker(m).unwrap().range(), 0..5);

        // At the start: marker shifts.
        buf.splice(0, 0, ">>");
        assert_eq!(buf.marker(m).unwrap().range(), 2..7);
    }

    #[test]
    fn test_attach_rejects_overlap() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice bob");
        buf.attach(0..5, MarkerKind::Token(token_id(1))).unwrap();

        assert!(buf.attach(3..8, MarkerKind::Token(token_id(2))).is_none());
        assert!(buf.attach(0..5, MarkerKind::More).is_none());
        // Adjacent is fine.
        assert!(buf.attach(6..9, MarkerKind::Token(token_id(2))).is_some());
    }

    #[test]
    fn test_attach_rejects_degenerate_and_out_of_range() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "abc");
        assert!(buf.attach(1..1, MarkerKind::More).is_none());
        assert!(buf.attach(2..9, MarkerKind::More).is_none());
    }

    #[test]
    fn test_markers_in_order() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "aa bb cc");
        let c = buf.attach(6..8, MarkerKind::Token(token_id(3))).unwrap();
        let a = buf.attach(0..2, MarkerKind::Token(token_id(1))).unwrap();
        let b = buf.attach(3..5, MarkerKind::Token(token_id(2))).unwrap();

        let order: Vec<MarkerId> = buf.markers_in_order().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_marker_at() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "alice bob");
        let m = buf.attach(0..5, MarkerKind::Token(token_id(1))).unwrap();

        assert_eq!(buf.marker_at(0).map(|(id, _)| id), Some(m));
        assert_eq!(buf.marker_at(4).map(|(id, _)| id), Some(m));
        assert!(buf.marker_at(5).is_none());
    }

    #[test]
    fn test_clear_reports_all_markers() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "aa bb");
        buf.attach(0..2, MarkerKind::Token(token_id(1))).unwrap();
        buf.attach(3..5, MarkerKind::More).unwrap();

        let outcome = buf.clear();
        assert!(buf.is_empty());
        assert_eq!(outcome.dropped.len(), 2);
        assert_eq!(buf.marker_count(), 0);
    }

    #[test]
    fn test_splice_clamps_out_of_range() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "abc");
        // Far past the end: clamped to an append.
        buf.splice(100, 5, "d");
        assert_eq!(buf.text(), "abcd");
    }

    #[test]
    fn test_splice_multibyte_boundary_clamp() {
        let mut buf = TokenBuffer::new();
        buf.splice(0, 0, "héllo");
        // Offset 2 sits inside 'é'; the splice must clamp, not panic.
        buf.splice(2, 0, "X");
        assert!(buf.text().is_char_boundary(0));
        assert_eq!(buf.text().chars().count(), 6);
    }
}

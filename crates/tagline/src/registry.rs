//! Token bookkeeping over the buffer.
//!
//! `TokenRegistry` is the single owner of token state: the buffer (text and
//! markers), the token slotmap, and the hidden-overflow list. Every token is
//! in exactly one place at a time, either anchored by a marker in the buffer
//! or parked in the hidden list, never both. Higher layers (collapse, the
//! widget) go through the registry so that invariant cannot be violated
//! piecemeal.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::buffer::{MarkerKind, TokenBuffer};
use crate::factory::{ChipStyle, TokenFactory};
use crate::item::{TagHandle, TagItem};
use crate::token::{Token, TokenId};
use crate::tokenizer::SEPARATOR;

/// Borrowed collaborators a commit needs.
///
/// Built at the call site from the widget's fields so the registry can be
/// borrowed mutably alongside them.
pub struct CommitCtx<'a> {
    pub factory: &'a dyn TokenFactory,
    pub available_width: f32,
    pub style: &'a ChipStyle,
}

/// Text, markers, tokens, and the hidden-overflow list.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    buffer: TokenBuffer,
    tokens: SlotMap<TokenId, Token>,
    /// Tokens parked out of the buffer while collapsed, in display order.
    hidden: Vec<TokenId>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &TokenBuffer {
        &self.buffer
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id)
    }

    pub(crate) fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(id)
    }

    /// A notification payload for `id`, if the token is still live.
    pub fn handle(&self, id: TokenId) -> Option<TagHandle> {
        self.tokens.get(id).map(|t| TagHandle {
            token: id,
            item: Arc::clone(t.item()),
            label: t.label().to_string(),
        })
    }

    /// Visible tokens in buffer order.
    pub fn tokens_in_buffer_order(&self) -> Vec<TokenId> {
        self.buffer
            .markers_in_order()
            .into_iter()
            .filter_map(|(_, m)| match m.kind() {
                MarkerKind::Token(id) => Some(id),
                MarkerKind::More => None,
            })
            .collect()
    }

    /// All tokens: visible in buffer order, then hidden in overflow order.
    pub fn full_token_list(&self) -> Vec<TokenId> {
        let mut out = self.tokens_in_buffer_order();
        out.extend(self.hidden.iter().copied());
        out
    }

    pub fn visible_count(&self) -> usize {
        self.tokens_in_buffer_order().len()
    }

    pub fn hidden(&self) -> &[TokenId] {
        &self.hidden
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.buffer.is_empty()
    }

    // ------------------------------------------------------------------
    // Commit and removal
    // ------------------------------------------------------------------

    /// Turn `item` into a visible chip at byte offset `at`.
    ///
    /// A separator is inserted before the label when the preceding character
    /// needs one; the marker covers the label only. Returns `None` when the
    /// item produces an empty label or the marker cannot be attached.
    pub fn commit_token(
        &mut self,
        item: Arc<dyn TagItem>,
        at: usize,
        read_only: bool,
        ctx: &CommitCtx<'_>,
    ) -> Option<TokenId> {
        let label = ctx.factory.label_for(&*item);
        if label.is_empty() {
            tracing::debug!(target: "tagline::registry", "refusing to commit empty label");
            return None;
        }
        let at = self.snap_outside_markers(at);
        let label_start = self.insert_chip_text(at, &label);

        let glyph = ctx.factory.glyph_for(&*item, ctx.available_width, ctx.style);
        let id = self.tokens.insert(Token::new(item, label.clone(), read_only, glyph));
        let range = label_start..label_start + label.len();
        if self.buffer.attach(range, MarkerKind::Token(id)).is_none() {
            // Undo the text insertion rather than leave an unanchored chip.
            self.buffer.splice(label_start, label.len(), "");
            self.tokens.remove(id);
            return None;
        }
        tracing::debug!(target: "tagline::registry", label = %label, "committed token");
        Some(id)
    }

    /// Create a token directly in the hidden list, with no buffer presence.
    pub fn commit_hidden(
        &mut self,
        item: Arc<dyn TagItem>,
        read_only: bool,
        ctx: &CommitCtx<'_>,
    ) -> Option<TokenId> {
        let label = ctx.factory.label_for(&*item);
        if label.is_empty() {
            return None;
        }
        let glyph = ctx.factory.glyph_for(&*item, ctx.available_width, ctx.style);
        let id = self.tokens.insert(Token::new(item, label, read_only, glyph));
        self.hidden.push(id);
        Some(id)
    }

    /// Re-anchor an existing (parked) token at byte offset `at`.
    ///
    /// Used when expanding: the token keeps its identity, item, and glyph.
    pub fn reinsert_token(&mut self, id: TokenId, at: usize) -> bool {
        let Some(label) = self.tokens.get(id).map(|t| t.label().to_string()) else {
            return false;
        };
        if self.buffer.marker_for_token(id).is_some() {
            return true;
        }
        self.hidden.retain(|h| *h != id);
        let at = self.snap_outside_markers(at);
        let label_start = self.insert_chip_text(at, &label);
        let range = label_start..label_start + label.len();
        if self.buffer.attach(range, MarkerKind::Token(id)).is_none() {
            self.buffer.splice(label_start, label.len(), "");
            return false;
        }
        true
    }

    /// Pull a visible token out of the buffer and park it in the hidden list
    /// at `hidden_index`. The token entry survives.
    pub fn park_token(&mut self, id: TokenId, hidden_index: usize) -> bool {
        if !self.tokens.contains_key(id) {
            return false;
        }
        let Some((mid, marker)) = self.buffer.marker_for_token(id) else {
            return self.hidden.contains(&id);
        };
        self.buffer.detach(mid);
        let (start, len) = self.chip_removal_span(marker.range());
        self.buffer.splice(start, len, "");
        self.sanitize_adjacent();
        let index = hidden_index.min(self.hidden.len());
        self.hidden.insert(index, id);
        true
    }

    /// Delete a token entirely: its buffer text, marker, and entry. The
    /// neighbors it sat between get their single separator back.
    ///
    /// Idempotent. Returns `false` when the token is already gone.
    pub fn remove_token(&mut self, id: TokenId) -> bool {
        if !self.tokens.contains_key(id) {
            return false;
        }
        if let Some((mid, marker)) = self.buffer.marker_for_token(id) {
            self.buffer.detach(mid);
            let (start, len) = self.chip_removal_span(marker.range());
            self.buffer.splice(start, len, "");
            self.sanitize_adjacent();
        } else {
            self.hidden.retain(|h| *h != id);
        }
        self.tokens.remove(id);
        tracing::debug!(target: "tagline::registry", "removed token");
        true
    }

    /// Run an edit through the buffer and reap the tokens whose markers it
    /// destroyed. Returns handles for the casualties, for notification.
    pub fn splice(&mut self, at: usize, removed_len: usize, inserted: &str) -> Vec<TagHandle> {
        let outcome = self.buffer.splice(at, removed_len, inserted);
        let mut removed = Vec::new();
        for (_, kind) in outcome.dropped {
            if let MarkerKind::Token(id) = kind {
                if let Some(handle) = self.handle(id) {
                    removed.push(handle);
                }
                self.tokens.remove(id);
            }
        }
        removed
    }

    /// Drop everything: text, markers, tokens, hidden list.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.tokens.clear();
        self.hidden.clear();
    }

    // ------------------------------------------------------------------
    // Normalization
    // ------------------------------------------------------------------

    /// Force exactly one separator between each pair of adjacent chips, and
    /// at least one between a chip and flush free text on either side.
    ///
    /// Free-typed runs of text between chips are otherwise left alone; only
    /// gaps that consist purely of separators (or nothing) are collapsed.
    /// Re-queries markers after every correcting splice since offsets move.
    pub fn sanitize_adjacent(&mut self) {
        while self.sanitize_pass() {}
    }

    /// One normalization step: apply the first fix found, or report clean.
    fn sanitize_pass(&mut self) -> bool {
        let markers = self.buffer.markers_in_order();
        for pair in markers.windows(2) {
            let gap = pair[0].1.range().end..pair[1].1.range().start;
            let gap_text = &self.buffer.text()[gap.clone()];
            if gap_text != " " && gap_text.chars().all(|c| c == SEPARATOR) {
                self.buffer.splice(gap.start, gap.len(), " ");
                return true;
            }
        }
        for (_, m) in &markers {
            let range = m.range();
            if range.start > 0 && !self.buffer.text()[..range.start].ends_with(SEPARATOR) {
                self.buffer.splice(range.start, 0, " ");
                return true;
            }
            if range.end < self.buffer.len()
                && !self.buffer.text()[range.end..].starts_with(SEPARATOR)
            {
                self.buffer.splice(range.end, 0, " ");
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // More-indicator
    // ------------------------------------------------------------------

    /// Place (or replace) the overflow indicator at the end of the buffer.
    pub fn set_more_indicator(&mut self, label: &str) {
        self.clear_more_indicator();
        if label.is_empty() {
            return;
        }
        let at = self.buffer.len();
        let start = self.insert_chip_text(at, label);
        self.buffer.attach(start..start + label.len(), MarkerKind::More);
    }

    /// Remove the overflow indicator and its text, if present.
    pub fn clear_more_indicator(&mut self) {
        if let Some((mid, marker)) = self.buffer.more_marker() {
            self.buffer.detach(mid);
            let (start, len) = self.chip_removal_span(marker.range());
            self.buffer.splice(start, len, "");
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Insert `label` at `at`, prepending a separator when the preceding
    /// character needs one. Returns the byte offset where the label landed.
    fn insert_chip_text(&mut self, at: usize, label: &str) -> usize {
        let needs_sep = at > 0 && !self.buffer.text()[..at].ends_with(SEPARATOR);
        if needs_sep {
            let mut text = String::with_capacity(label.len() + 1);
            text.push(SEPARATOR);
            text.push_str(label);
            self.buffer.splice(at, 0, &text);
            at + SEPARATOR.len_utf8()
        } else {
            self.buffer.splice(at, 0, label);
            at
        }
    }

    /// The text span deleting a chip should take with it: the marker range,
    /// one leading separator, and every trailing separator.
    fn chip_removal_span(&self, range: std::ops::Range<usize>) -> (usize, usize) {
        let text = self.buffer.text();
        let mut start = range.start;
        if text[..start].ends_with(SEPARATOR) {
            start -= SEPARATOR.len_utf8();
        }
        let mut end = range.end;
        while text[end..].starts_with(SEPARATOR) {
            end += SEPARATOR.len_utf8();
        }
        (start, end - start)
    }

    /// Nudge an insertion point that falls strictly inside a marker to the
    /// marker's end, so the insertion cannot corrupt an existing chip.
    fn snap_outside_markers(&self, at: usize) -> usize {
        match self.buffer.marker_at(at) {
            Some((_, m)) if at > m.range().start => m.range().end,
            _ => at,
        }
    }
}

//! The tag-input widget state machine.
//!
//! `TagEdit` ties the registry, the collapse controller, the tokenizer, and
//! the factory together and presents the surface a host embeds: text
//! editing, cursor movement, focus, drag-and-drop, width changes, and
//! save/restore. It is single-threaded by design; hosts drive it from one
//! UI thread and must not call back into it from inside a signal slot.
//!
//! Two signals report logical token-set changes: [`TagEdit::token_added`]
//! and [`TagEdit::token_removed`]. Presentation-only churn (collapse,
//! expand, width rebuilds, state restore) runs with both signals blocked,
//! so listeners only ever see real additions and removals.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use tagline_core::{LayoutQueue, Signal};

use crate::buffer::MarkerKind;
use crate::collapse::{CollapseController, MoreLabelFn};
use crate::drag::TokenDrag;
use crate::factory::{Avatar, ChipStyle, TokenFactory};
use crate::item::{TagHandle, TagItem};
use crate::registry::{CommitCtx, TokenRegistry};
use crate::state::{SavedState, SavedToken};
use crate::token::{Token, TokenId};
use crate::tokenizer::{SEPARATOR, Tokenizer, clamp_to_char_boundary};

/// Width assumed for glyph sizing before the host reports a real one.
/// User-driven commits cannot wait for layout the way programmatic adds do.
const FALLBACK_WIDTH: f32 = 320.0;

/// A programmatic add parked until the first width arrives.
struct DeferredAdd {
    item: Arc<dyn TagItem>,
    at_cursor: bool,
}

/// An editable field whose text can contain inline tag chips.
pub struct TagEdit {
    registry: TokenRegistry,
    overflow: CollapseController,
    tokenizer: Box<dyn Tokenizer>,
    factory: Box<dyn TokenFactory>,
    style: ChipStyle,
    cursor: usize,
    focused: bool,
    read_only: bool,
    drag_group: Option<String>,
    accepted_type: Option<TypeId>,
    available_width: Option<f32>,
    deferred: LayoutQueue<DeferredAdd>,
    /// Fires once per token that logically joins the field.
    pub token_added: Signal<TagHandle>,
    /// Fires once per token that logically leaves the field.
    pub token_removed: Signal<TagHandle>,
}

impl fmt::Debug for TagEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagEdit")
            .field("text", &self.registry.buffer().text())
            .field("cursor", &self.cursor)
            .field("focused", &self.focused)
            .field("read_only", &self.read_only)
            .field("overflow", &self.overflow)
            .finish_non_exhaustive()
    }
}

impl TagEdit {
    pub fn new(tokenizer: Box<dyn Tokenizer>, factory: Box<dyn TokenFactory>) -> Self {
        Self {
            registry: TokenRegistry::new(),
            overflow: CollapseController::new(),
            tokenizer,
            factory,
            style: ChipStyle::default(),
            cursor: 0,
            focused: false,
            read_only: false,
            drag_group: None,
            accepted_type: None,
            available_width: None,
            deferred: LayoutQueue::new(),
            token_added: Signal::new(),
            token_removed: Signal::new(),
        }
    }

    pub fn with_style(mut self, style: ChipStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_drag_group(mut self, group: impl Into<String>) -> Self {
        self.drag_group = Some(group.into());
        self
    }

    /// Restrict drops to payloads whose concrete item type is `T`.
    pub fn with_accepted_type<T: TagItem>(mut self) -> Self {
        self.accepted_type = Some(TypeId::of::<T>());
        self
    }

    pub fn with_max_visible(mut self, max_visible: i32) -> Self {
        self.overflow.set_max_visible(max_visible, &mut self.registry);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn text(&self) -> &str {
        self.registry.buffer().text()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_collapsed(&self) -> bool {
        self.overflow.is_collapsed()
    }

    pub fn max_visible(&self) -> i32 {
        self.overflow.max_visible()
    }

    pub fn drag_group(&self) -> Option<&str> {
        self.drag_group.as_deref()
    }

    pub fn available_width(&self) -> Option<f32> {
        self.available_width
    }

    pub fn style(&self) -> &ChipStyle {
        &self.style
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.registry.token(id)
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Every token, visible first then hidden, in stable order.
    pub fn tokens(&self) -> Vec<TagHandle> {
        self.registry
            .full_token_list()
            .into_iter()
            .filter_map(|id| self.registry.handle(id))
            .collect()
    }

    /// The tokens currently anchored in the buffer, in buffer order.
    pub fn visible_tokens(&self) -> Vec<TagHandle> {
        self.registry
            .tokens_in_buffer_order()
            .into_iter()
            .filter_map(|id| self.registry.handle(id))
            .collect()
    }

    pub fn hidden_count(&self) -> usize {
        self.registry.hidden().len()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_drag_group(&mut self, group: Option<String>) {
        self.drag_group = group;
    }

    pub fn set_more_label(&mut self, f: MoreLabelFn) {
        self.overflow.set_more_label(f);
        self.suppressed(|this| {
            this.overflow.refresh_more_indicator(&mut this.registry);
        });
    }

    /// Change the collapse limit. Presentation-only, fires nothing.
    pub fn set_max_visible(&mut self, max_visible: i32) {
        self.suppressed(|this| {
            this.overflow.set_max_visible(max_visible, &mut this.registry);
        });
        self.clamp_cursor();
    }

    // ------------------------------------------------------------------
    // Token operations
    // ------------------------------------------------------------------

    /// Append `item` as a chip.
    ///
    /// Before the first width arrives the add is queued and replayed, in
    /// order, when [`set_available_width`](Self::set_available_width) is
    /// first called. Returns `false` only when the item cannot produce a
    /// chip at all.
    pub fn add_token(&mut self, item: Arc<dyn TagItem>) -> bool {
        if self.available_width.is_none() {
            self.deferred.post(DeferredAdd {
                item,
                at_cursor: false,
            });
            return true;
        }
        self.commit_and_notify(item, None, false)
    }

    /// Insert `item` as a chip at the cursor.
    pub fn add_token_at_cursor(&mut self, item: Arc<dyn TagItem>) -> bool {
        if self.available_width.is_none() {
            self.deferred.post(DeferredAdd {
                item,
                at_cursor: true,
            });
            return true;
        }
        let at = self.cursor.min(self.registry.buffer().len());
        self.commit_and_notify(item, Some(at), false)
    }

    /// Remove a token wherever it lives, visible or hidden.
    ///
    /// Idempotent; returns `false` once the token is gone.
    pub fn remove_token(&mut self, id: TokenId) -> bool {
        let handle = self.registry.handle(id);
        if !self.registry.remove_token(id) {
            return false;
        }
        self.registry.sanitize_adjacent();
        self.overflow.refresh_more_indicator(&mut self.registry);
        self.clamp_cursor();
        if let Some(handle) = handle {
            self.token_removed.emit(handle);
        }
        self.reset_if_empty();
        true
    }

    /// Attach a late-arriving avatar to a chip.
    ///
    /// Image fetches outlive tokens; when the token is already gone this is
    /// a quiet no-op.
    pub fn apply_avatar(&mut self, id: TokenId, avatar: Avatar) -> bool {
        match self.registry.token_mut(id) {
            Some(token) => {
                token.set_avatar(avatar);
                true
            }
            None => {
                tracing::trace!(target: "tagline::edit", "dropping avatar for dead token");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Text editing
    // ------------------------------------------------------------------

    /// Move the cursor, snapping out of chip interiors.
    ///
    /// A position strictly inside a marker (past its start) lands on the
    /// nearer edge of the chip instead.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = self.snapped(pos);
    }

    /// Type `s` at the cursor.
    ///
    /// An insertion landing flush against a chip edge carries the required
    /// separator with it, so typed text never touches a marker range.
    pub fn insert_text(&mut self, s: &str) {
        if self.read_only || s.is_empty() {
            return;
        }
        let at = self.snapped(self.cursor);
        let lead = !s.starts_with(SEPARATOR) && self.marker_ending_at(at).is_some();
        let trail = !s.ends_with(SEPARATOR)
            && self
                .registry
                .buffer()
                .marker_at(at)
                .is_some_and(|(_, m)| m.range().start == at);
        let mut text = String::with_capacity(s.len() + 2);
        if lead {
            text.push(SEPARATOR);
        }
        text.push_str(s);
        if trail {
            text.push(SEPARATOR);
        }
        self.registry.splice(at, 0, &text);
        self.cursor = at + text.len() - if trail { SEPARATOR.len_utf8() } else { 0 };
    }

    /// Backspace.
    ///
    /// Directly behind a chip (or behind the single separator that follows
    /// one), the whole token is deleted rather than its last character.
    /// The separator between free text and a following chip cannot be
    /// deleted; the cursor slides across it instead.
    /// Returns `false` when there was nothing to delete.
    pub fn delete_backward(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        let cursor = self.snapped(self.cursor);
        if cursor == 0 {
            self.cursor = 0;
            return false;
        }
        match self.marker_ending_at(cursor) {
            Some((MarkerKind::Token(id), _)) => {
                self.delete_whole_token(id);
                return true;
            }
            Some((MarkerKind::More, _)) => return false,
            None => {}
        }
        let text = self.registry.buffer().text();
        let prev = prev_char_boundary(text, cursor);
        let gap = &text[prev..cursor];
        if gap.len() == SEPARATOR.len_utf8() && gap.starts_with(SEPARATOR) {
            match self.marker_ending_at(prev) {
                Some((MarkerKind::Token(id), _)) => {
                    self.delete_whole_token(id);
                    return true;
                }
                Some((MarkerKind::More, _)) => return false,
                None => {}
            }
        }
        self.user_splice(prev, cursor - prev);
        self.cursor = prev.min(self.registry.buffer().len());
        true
    }

    /// Forward delete. A chip starting at the cursor is removed whole.
    pub fn delete_forward(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        let cursor = self.snapped(self.cursor);
        let text = self.registry.buffer().text();
        if cursor >= text.len() {
            return false;
        }
        if let Some((_, m)) = self.registry.buffer().marker_at(cursor) {
            if m.range().start == cursor {
                return match m.kind() {
                    MarkerKind::Token(id) => {
                        self.delete_whole_token(id);
                        true
                    }
                    MarkerKind::More => false,
                };
            }
        }
        let next = next_char_boundary(text, cursor);
        self.user_splice(cursor, next - cursor);
        self.cursor = cursor.min(self.registry.buffer().len());
        true
    }

    /// Delete an arbitrary byte range, as a selection deletion would.
    ///
    /// Endpoints are clamped to char boundaries. A chip the range touches,
    /// even partially, loses its marker and is announced through
    /// `token_removed`; any label text left outside the range stays behind
    /// as free text. Returns `false` when the clamped range is empty.
    pub fn delete_range(&mut self, range: std::ops::Range<usize>) -> bool {
        if self.read_only {
            return false;
        }
        let text = self.registry.buffer().text();
        let start = clamp_to_char_boundary(text, range.start.min(text.len()));
        let end = clamp_to_char_boundary(text, range.end.min(text.len()));
        if start >= end {
            return false;
        }
        self.user_splice(start, end - start);
        self.cursor = start.min(self.registry.buffer().len());
        true
    }

    /// Commit the free text around the cursor into a token.
    ///
    /// The composing span is what the tokenizer delimits, clipped so it
    /// never reaches into a neighboring chip. When the factory cannot
    /// materialize an item from it, the text stays put and nothing fires.
    pub fn submit(&mut self) -> Option<TagHandle> {
        if self.read_only {
            return None;
        }
        let text = self.registry.buffer().text().to_string();
        let cursor = self.snapped(self.cursor);
        let mut start = self.tokenizer.find_token_start(&text, cursor);
        let mut end = self.tokenizer.find_token_end(&text, cursor);
        for (_, m) in self.registry.buffer().markers_in_order() {
            let r = m.range();
            if r.end <= cursor && r.end > start {
                start = r.end;
            }
            if r.start >= cursor && r.start < end {
                end = r.start;
            }
        }
        let raw = &text[start..end];
        let composing = raw.trim_matches(SEPARATOR);
        if composing.is_empty() {
            return None;
        }
        let item = self.factory.materialize(composing)?;
        let span_start = start + (raw.len() - raw.trim_start_matches(SEPARATOR).len());
        let span_end = span_start + composing.len();

        self.registry.splice(span_start, span_end - span_start, "");
        let id = self.commit_visible_or_hidden(item, Some(span_start), false)?;

        if let Some((_, m)) = self.registry.buffer().marker_for_token(id) {
            // The tokenizer owns the terminator that follows a finished chip.
            let tail = self.tokenizer.terminate_token("");
            let chip_end = m.range().end;
            let text = self.registry.buffer().text();
            if !tail.is_empty() && !text[chip_end..].starts_with(&tail) {
                self.registry.splice(chip_end, 0, &tail);
            }
            self.cursor = (chip_end + tail.len()).min(self.registry.buffer().len());
        } else {
            self.cursor = span_start.min(self.registry.buffer().len());
        }
        self.registry.sanitize_adjacent();
        self.clamp_cursor();

        let handle = self.registry.handle(id)?;
        self.token_added.emit(handle.clone());
        tracing::debug!(target: "tagline::edit", label = %handle.label, "submitted token");
        Some(handle)
    }

    // ------------------------------------------------------------------
    // Focus, collapse, expand
    // ------------------------------------------------------------------

    /// Focus gain expands; focus loss commits any in-progress text, then
    /// collapses. Re-entering the current state is a no-op.
    pub fn set_focused(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        if focused {
            self.focused = true;
            self.expand();
        } else {
            let _ = self.submit();
            self.collapse();
            self.focused = false;
        }
        tracing::trace!(target: "tagline::edit", focused, "focus changed");
    }

    /// Hide overflow chips behind the more-indicator. Presentation-only,
    /// fires nothing.
    pub fn collapse(&mut self) {
        self.suppressed(|this| {
            this.overflow.collapse(&mut this.registry);
        });
        self.clamp_cursor();
    }

    /// Bring every hidden chip back. Presentation-only, fires nothing.
    pub fn expand(&mut self) {
        self.suppressed(|this| {
            this.overflow.expand(&mut this.registry);
        });
        self.clamp_cursor();
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Report the width chips may occupy.
    ///
    /// Drains adds that were queued before the first layout, in submission
    /// order, then re-renders every visible chip at the new width. The
    /// rebuild destroys and recreates every marker but fires nothing.
    pub fn set_available_width(&mut self, width: f32) {
        let changed = self.available_width != Some(width);
        self.available_width = Some(width);

        for add in self.deferred.take_pending() {
            let at = add
                .at_cursor
                .then(|| self.cursor.min(self.registry.buffer().len()));
            self.commit_and_notify(add.item, at, false);
        }

        if changed {
            self.rebuild_glyphs(width);
        }
    }

    // ------------------------------------------------------------------
    // Drag and drop
    // ------------------------------------------------------------------

    /// Lift a visible chip out of the field as a drag payload.
    ///
    /// The token leaves the field immediately (and `token_removed` fires);
    /// a rejected drop puts it back via [`restore_drag`](Self::restore_drag).
    pub fn begin_token_drag(&mut self, id: TokenId) -> Option<TokenDrag> {
        if self.read_only {
            return None;
        }
        let (_, marker) = self.registry.buffer().marker_for_token(id)?;
        let token = self.registry.token(id)?;
        if token.is_read_only() {
            return None;
        }
        let drag = TokenDrag::new(
            Arc::clone(token.item()),
            token.label().to_string(),
            token.is_read_only(),
            self.drag_group.clone(),
            id,
            marker.range().start,
        );
        let handle = self.registry.handle(id)?;
        self.registry.remove_token(id);
        self.registry.sanitize_adjacent();
        self.overflow.refresh_more_indicator(&mut self.registry);
        self.clamp_cursor();
        self.token_removed.emit(handle);
        Some(drag)
    }

    /// Take a dropped payload, if this field accepts it.
    ///
    /// Acceptance needs matching drag groups on both sides and, when an
    /// accepted item type is declared, a payload of exactly that type.
    /// Rejection is silent.
    pub fn accept_drop(&mut self, drag: &TokenDrag, at: usize) -> bool {
        if self.read_only {
            return false;
        }
        let groups_match = matches!(
            (self.drag_group.as_deref(), drag.group()),
            (Some(mine), Some(theirs)) if mine == theirs
        );
        if !groups_match {
            tracing::debug!(target: "tagline::edit", "rejecting drop from foreign drag group");
            return false;
        }
        if let Some(accepted) = self.accepted_type {
            if accepted != drag.item_type_id() {
                tracing::debug!(target: "tagline::edit", "rejecting drop of unsupported item type");
                return false;
            }
        }
        let at = at.min(self.registry.buffer().len());
        self.commit_and_notify(Arc::clone(drag.item()), Some(at), drag.is_read_only())
    }

    /// Put a payload back after a failed drop, as close to its original
    /// position as the current buffer allows.
    pub fn restore_drag(&mut self, drag: &TokenDrag) -> bool {
        let at = drag.origin_offset().min(self.registry.buffer().len());
        self.commit_and_notify(Arc::clone(drag.item()), Some(at), drag.is_read_only())
    }

    // ------------------------------------------------------------------
    // Save and restore
    // ------------------------------------------------------------------

    /// Snapshot every token (visible and hidden, in order), the uncommitted
    /// tail text, and the presentation flags.
    pub fn save_state(&self) -> SavedState {
        let tokens = self
            .registry
            .full_token_list()
            .into_iter()
            .filter_map(|id| self.registry.token(id))
            .map(|t| SavedToken {
                label: t.label().to_string(),
                read_only: t.is_read_only(),
                recipe: t.item().save(),
            })
            .collect();
        SavedState {
            tokens,
            composing: self.composing_tail().to_string(),
            read_only: self.read_only,
            collapsed: self.overflow.is_collapsed(),
            max_visible: self.overflow.max_visible(),
        }
    }

    /// Rebuild the field from a snapshot.
    ///
    /// Items come back through the factory, recipes first and label
    /// re-materialization as the fallback; entries that survive neither are
    /// dropped. No signals fire.
    pub fn restore_state(&mut self, state: &SavedState) {
        self.suppressed(|this| {
            this.registry.clear();
            this.cursor = 0;
            this.overflow.expand(&mut this.registry);

            for saved in &state.tokens {
                let item = saved
                    .recipe
                    .as_ref()
                    .and_then(|r| this.factory.restore(r))
                    .or_else(|| this.factory.materialize(&saved.label));
                let Some(item) = item else {
                    tracing::debug!(
                        target: "tagline::edit",
                        label = %saved.label,
                        "dropping unrestorable token"
                    );
                    continue;
                };
                let ctx = CommitCtx {
                    factory: &*this.factory,
                    available_width: this.effective_width(),
                    style: &this.style,
                };
                let at = this.registry.buffer().len();
                this.registry.commit_token(item, at, saved.read_only, &ctx);
            }
            this.registry.sanitize_adjacent();

            this.overflow
                .set_max_visible(state.max_visible, &mut this.registry);
            if state.collapsed {
                this.overflow.collapse(&mut this.registry);
            } else {
                this.overflow.expand(&mut this.registry);
            }

            if !state.composing.is_empty() {
                let len = this.registry.buffer().len();
                let text = this.registry.buffer().text();
                if len > 0 && !text.ends_with(SEPARATOR) {
                    this.registry.splice(len, 0, " ");
                }
                let len = this.registry.buffer().len();
                this.registry.splice(len, 0, &state.composing);
            }
            this.cursor = this.registry.buffer().len();
            this.read_only = state.read_only;
        });
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn effective_width(&self) -> f32 {
        self.available_width.unwrap_or(FALLBACK_WIDTH)
    }

    fn clamp_cursor(&mut self) {
        let len = self.registry.buffer().len();
        self.cursor = clamp_to_char_boundary(self.registry.buffer().text(), self.cursor.min(len));
    }

    /// The snap rule: a position strictly inside a marker moves to the
    /// nearer edge.
    fn snapped(&self, pos: usize) -> usize {
        let text = self.registry.buffer().text();
        let pos = clamp_to_char_boundary(text, pos.min(text.len()));
        match self.registry.buffer().marker_at(pos) {
            Some((_, m)) if pos > m.range().start => {
                let r = m.range();
                if pos - r.start <= r.end - pos {
                    r.start
                } else {
                    r.end
                }
            }
            _ => pos,
        }
    }

    fn marker_ending_at(&self, at: usize) -> Option<(MarkerKind, std::ops::Range<usize>)> {
        self.registry
            .buffer()
            .markers_in_order()
            .into_iter()
            .find(|(_, m)| m.range().end == at)
            .map(|(_, m)| (m.kind(), m.range()))
    }

    /// Commit visibly when there is room, straight to hidden when the field
    /// is collapsed and full. Fires `token_added` on success.
    fn commit_and_notify(
        &mut self,
        item: Arc<dyn TagItem>,
        at: Option<usize>,
        read_only: bool,
    ) -> bool {
        match self.commit_visible_or_hidden(item, at, read_only) {
            Some(id) => {
                if let Some(handle) = self.registry.handle(id) {
                    self.token_added.emit(handle);
                }
                true
            }
            None => false,
        }
    }

    fn commit_visible_or_hidden(
        &mut self,
        item: Arc<dyn TagItem>,
        at: Option<usize>,
        read_only: bool,
    ) -> Option<TokenId> {
        let ctx = CommitCtx {
            factory: &*self.factory,
            available_width: self.available_width.unwrap_or(FALLBACK_WIDTH),
            style: &self.style,
        };
        if !self.overflow.has_room_for_token(&self.registry) {
            let id = self.registry.commit_hidden(item, read_only, &ctx)?;
            self.overflow.refresh_more_indicator(&mut self.registry);
            Some(id)
        } else {
            let at = at.unwrap_or_else(|| self.end_insertion_point());
            let id = self.registry.commit_token(item, at, read_only, &ctx)?;
            self.registry.sanitize_adjacent();
            Some(id)
        }
    }

    /// Where "append" lands: before the more-indicator when one is showing.
    fn end_insertion_point(&self) -> usize {
        match self.registry.buffer().more_marker() {
            Some((_, m)) => m.range().start,
            None => self.registry.buffer().len(),
        }
    }

    /// Token deletion driven by an editing gesture: notify, tidy separators,
    /// keep the cursor where the chip used to start.
    fn delete_whole_token(&mut self, id: TokenId) {
        let handle = self.registry.handle(id);
        let start = self
            .registry
            .buffer()
            .marker_for_token(id)
            .map(|(_, m)| m.range().start)
            .unwrap_or(0);
        let had_leading_sep = self.registry.buffer().text()[..start].ends_with(SEPARATOR);
        if !self.registry.remove_token(id) {
            return;
        }
        self.registry.sanitize_adjacent();
        self.overflow.refresh_more_indicator(&mut self.registry);
        self.cursor = if had_leading_sep {
            start - SEPARATOR.len_utf8()
        } else {
            start
        };
        self.clamp_cursor();
        if let Some(handle) = handle {
            self.token_removed.emit(handle);
        }
        self.reset_if_empty();
    }

    /// A raw character-range deletion: reap destroyed tokens and notify.
    ///
    /// An edit that empties the buffer is a full reset and stays silent,
    /// even for tokens the edit itself destroyed.
    fn user_splice(&mut self, at: usize, removed_len: usize) {
        let casualties = self.registry.splice(at, removed_len, "");
        if self.registry.buffer().is_empty() {
            self.reset_if_empty();
            return;
        }
        self.registry.sanitize_adjacent();
        self.overflow.refresh_more_indicator(&mut self.registry);
        for handle in casualties {
            self.token_removed.emit(handle);
        }
        self.reset_if_empty();
    }

    /// An empty buffer is a full reset: any remaining token entries and the
    /// hidden list go quietly, with no per-token notifications.
    fn reset_if_empty(&mut self) {
        if self.registry.buffer().is_empty() && self.registry.token_count() > 0 {
            tracing::debug!(target: "tagline::edit", "buffer emptied, resetting token state");
            self.registry.clear();
            self.cursor = 0;
        }
    }

    /// Free text trailing the last marker, separators trimmed.
    fn composing_tail(&self) -> &str {
        let text = self.registry.buffer().text();
        let tail_start = self
            .registry
            .buffer()
            .markers_in_order()
            .last()
            .map(|(_, m)| m.range().end)
            .unwrap_or(0);
        text[tail_start..].trim_matches(SEPARATOR)
    }

    /// Re-render every visible chip at `width` by tearing its marker down
    /// and recreating it, with both signals blocked throughout.
    fn rebuild_glyphs(&mut self, width: f32) {
        self.suppressed(|this| {
            let visible = this.registry.tokens_in_buffer_order();
            for (i, id) in visible.iter().enumerate() {
                this.registry.park_token(*id, i);
            }
            for id in &visible {
                let glyph = match this.registry.token(*id) {
                    Some(token) => this.factory.glyph_for(&**token.item(), width, &this.style),
                    None => continue,
                };
                if let Some(token) = this.registry.token_mut(*id) {
                    token.set_glyph(glyph);
                }
                this.registry.reinsert_token(*id, this.end_insertion_point());
            }
            this.registry.sanitize_adjacent();
            this.overflow.refresh_more_indicator(&mut this.registry);
        });
        self.clamp_cursor();
        tracing::trace!(target: "tagline::edit", width, "rebuilt chips");
    }

    /// Run `f` with both signals blocked, restoring their previous state.
    fn suppressed(&mut self, f: impl FnOnce(&mut Self)) {
        let added_was = self.token_added.is_blocked();
        let removed_was = self.token_removed.is_blocked();
        self.token_added.set_blocked(true);
        self.token_removed.set_blocked(true);
        f(self);
        self.token_added.set_blocked(added_was);
        self.token_removed.set_blocked(removed_was);
    }
}

fn prev_char_boundary(text: &str, at: usize) -> usize {
    let mut pos = at.saturating_sub(1);
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn next_char_boundary(text: &str, at: usize) -> usize {
    let mut pos = (at + 1).min(text.len());
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

//! Token objects.

use std::sync::Arc;

use slotmap::new_key_type;

use crate::factory::{Avatar, ChipGlyph};
use crate::item::TagItem;

new_key_type! {
    /// A unique identifier for a live token.
    ///
    /// Token identity is reference identity: two tokens wrapping equal data
    /// items are still distinct tokens. IDs become invalid when the token is
    /// destroyed (deleted, replaced during a collapse/expand cycle, or the
    /// buffer is cleared).
    pub struct TokenId;
}

/// One inline structured item embedded in the text buffer.
///
/// A token stores the data item, the cached display label, a read-only
/// flag, and the chip glyph. It never stores buffer offsets; the marker in
/// the [`TokenBuffer`](crate::buffer::TokenBuffer) is the only link between
/// a token and the text.
#[derive(Debug, Clone)]
pub struct Token {
    item: Arc<dyn TagItem>,
    label: String,
    read_only: bool,
    glyph: ChipGlyph,
}

impl Token {
    /// Create a token.
    pub(crate) fn new(item: Arc<dyn TagItem>, label: String, read_only: bool, glyph: ChipGlyph) -> Self {
        Self {
            item,
            label,
            read_only,
            glyph,
        }
    }

    /// The data item this token represents.
    pub fn item(&self) -> &Arc<dyn TagItem> {
        &self.item
    }

    /// The cached display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the token refuses user edits.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The chip glyph.
    pub fn glyph(&self) -> &ChipGlyph {
        &self.glyph
    }

    pub(crate) fn set_glyph(&mut self, glyph: ChipGlyph) {
        self.glyph = glyph;
    }

    pub(crate) fn set_avatar(&mut self, avatar: Avatar) {
        self.glyph.set_avatar(avatar);
    }
}

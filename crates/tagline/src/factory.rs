//! Chip label and glyph construction.
//!
//! The factory is the collaborator that turns an opaque data item into what
//! the user actually sees: a display label and a fixed-size chip glyph sized
//! to the available width. The engine never measures or paints; it asks the
//! factory and stores the result on the token.
//!
//! Avatar images may arrive asynchronously (a contact photo fetch); a fresh
//! glyph starts with [`Avatar::Placeholder`] and the completion re-enters the
//! engine through [`TagEdit::apply_avatar`](crate::tag_edit::TagEdit::apply_avatar),
//! which checks token liveness first.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::item::{Address, TagItem, item_cast};

/// Visual parameters for chip glyph sizing.
///
/// All lengths are in pixels. The engine treats these as opaque inputs to
/// [`TokenFactory::glyph_for`]; layout and painting are the owning widget's
/// concern.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipStyle {
    /// Estimated advance width of one character of chip text.
    pub char_width: f32,
    /// Chip height.
    pub height: f32,
    /// Total horizontal padding inside the chip (both sides plus avatar).
    pub padding: f32,
    /// Maximum chip width as a fraction of the available width.
    pub max_width_fraction: f32,
}

impl Default for ChipStyle {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            height: 24.0,
            padding: 28.0,
            max_width_fraction: 0.8,
        }
    }
}

impl ChipStyle {
    /// Create the default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the estimated character width.
    pub fn with_char_width(mut self, width: f32) -> Self {
        self.char_width = width;
        self
    }

    /// Builder method to set the chip height.
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Builder method to set the internal padding.
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    /// Builder method to set the maximum width fraction.
    pub fn with_max_width_fraction(mut self, fraction: f32) -> Self {
        self.max_width_fraction = fraction;
        self
    }

    /// The widest a chip may be for a given available width.
    pub fn max_chip_width(&self, available_width: f32) -> f32 {
        (available_width * self.max_width_fraction).max(self.padding)
    }
}

/// The avatar slot of a chip glyph.
#[derive(Debug, Clone, PartialEq)]
pub enum Avatar {
    /// No image yet; render the generic placeholder.
    Placeholder,
    /// A monogram initial, used until (or instead of) a photo.
    Initial(char),
    /// Decoded RGBA image bytes supplied by an asynchronous fetch.
    Image(Arc<Vec<u8>>),
}

/// A fixed-size visual element standing in for a token in the text buffer.
///
/// The glyph caches everything painting needs: the (possibly elided)
/// display text, the resolved pixel size, and the avatar slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipGlyph {
    /// The text drawn inside the chip, elided to fit.
    display_text: String,
    /// Resolved chip width in pixels.
    width: f32,
    /// Resolved chip height in pixels.
    height: f32,
    /// The avatar slot.
    avatar: Avatar,
}

impl ChipGlyph {
    /// Lay out a glyph for `label` within `available_width`.
    ///
    /// The label is elided on grapheme boundaries with a trailing ellipsis
    /// when it does not fit the style's maximum chip width.
    pub fn layout(label: &str, available_width: f32, style: &ChipStyle) -> Self {
        let max_width = style.max_chip_width(available_width);
        let max_text_width = (max_width - style.padding).max(style.char_width);
        let max_chars = (max_text_width / style.char_width).floor().max(1.0) as usize;

        let graphemes: Vec<&str> = label.graphemes(true).collect();
        let display_text = if graphemes.len() <= max_chars {
            label.to_string()
        } else {
            let mut elided: String = graphemes[..max_chars.saturating_sub(1)].concat();
            elided.push('…');
            elided
        };

        let width = display_text.graphemes(true).count() as f32 * style.char_width + style.padding;
        Self {
            display_text,
            width: width.min(max_width),
            height: style.height,
            avatar: Avatar::Placeholder,
        }
    }

    /// The elided display text.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Chip width in pixels.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Chip height in pixels.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// The avatar slot.
    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    /// Replace the avatar (asynchronous fetch completion).
    pub fn set_avatar(&mut self, avatar: Avatar) {
        self.avatar = avatar;
    }
}

/// Converts opaque data items into display labels and chip glyphs.
pub trait TokenFactory {
    /// The display label for an item.
    fn label_for(&self, item: &dyn TagItem) -> String;

    /// A chip glyph for an item, sized to the available width.
    fn glyph_for(&self, item: &dyn TagItem, available_width: f32, style: &ChipStyle) -> ChipGlyph;

    /// Materialize a data item from free-typed text.
    ///
    /// `None` aborts the commit: no token is created and the text is left
    /// for further editing. This is the failure mode, not an error.
    fn materialize(&self, text: &str) -> Option<Arc<dyn TagItem>>;

    /// Rebuild an item from a saved recipe ([`TagItem::save`]).
    ///
    /// The default implementation restores nothing; factories that support
    /// widget state persistence override it.
    fn restore(&self, _recipe: &serde_json::Value) -> Option<Arc<dyn TagItem>> {
        None
    }
}

/// Factory for [`Address`] items.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressFactory;

impl AddressFactory {
    /// Create a new address factory.
    pub fn new() -> Self {
        Self
    }
}

impl TokenFactory for AddressFactory {
    fn label_for(&self, item: &dyn TagItem) -> String {
        match item_cast::<Address>(item) {
            Some(addr) if !addr.name().is_empty() => addr.name().to_string(),
            Some(addr) => addr.email().to_string(),
            None => item.key(),
        }
    }

    fn glyph_for(&self, item: &dyn TagItem, available_width: f32, style: &ChipStyle) -> ChipGlyph {
        let label = self.label_for(item);
        let mut glyph = ChipGlyph::layout(&label, available_width, style);
        if let Some(initial) = label.chars().next() {
            glyph.set_avatar(Avatar::Initial(initial.to_ascii_uppercase()));
        }
        glyph
    }

    fn materialize(&self, text: &str) -> Option<Arc<dyn TagItem>> {
        Address::parse(text).map(|addr| Arc::new(addr) as Arc<dyn TagItem>)
    }

    fn restore(&self, recipe: &serde_json::Value) -> Option<Arc<dyn TagItem>> {
        serde_json::from_value::<Address>(recipe.clone())
            .ok()
            .map(|addr| Arc::new(addr) as Arc<dyn TagItem>)
    }
}

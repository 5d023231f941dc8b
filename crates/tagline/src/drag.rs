//! Drag payloads for moving chips between fields.

use std::any::TypeId;
use std::sync::Arc;

use crate::item::TagItem;
use crate::token::TokenId;

/// A chip in flight.
///
/// Created by the source field when a drag starts; the source has already
/// removed the token by then, so a cancelled drag must be restored through
/// [`TagEdit::restore_drag`](crate::tag_edit::TagEdit::restore_drag).
#[derive(Debug, Clone)]
pub struct TokenDrag {
    item: Arc<dyn TagItem>,
    label: String,
    read_only: bool,
    group: Option<String>,
    origin: TokenId,
    origin_offset: usize,
}

impl TokenDrag {
    pub(crate) fn new(
        item: Arc<dyn TagItem>,
        label: String,
        read_only: bool,
        group: Option<String>,
        origin: TokenId,
        origin_offset: usize,
    ) -> Self {
        Self {
            item,
            label,
            read_only,
            group,
            origin,
            origin_offset,
        }
    }

    pub fn item(&self) -> &Arc<dyn TagItem> {
        &self.item
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The drag group of the source field, if it has one.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The id the token had in the source field. Dangling once the drag
    /// completes; useful only for tracing.
    pub fn origin(&self) -> TokenId {
        self.origin
    }

    /// Where the chip sat in the source buffer when the drag started.
    /// Only meaningful for restoring into an unedited source.
    pub fn origin_offset(&self) -> usize {
        self.origin_offset
    }

    /// The concrete type of the payload item, for acceptance checks.
    pub fn item_type_id(&self) -> TypeId {
        self.item.as_any().type_id()
    }
}

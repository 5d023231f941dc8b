//! Data items carried by tokens.
//!
//! The engine is agnostic about what a chip represents: the owning
//! application supplies items behind the [`TagItem`] trait. The engine only
//! needs a stable identity key, a debug representation, and a typed
//! downcast hook; everything display-related goes through the
//! [`TokenFactory`](crate::factory::TokenFactory).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An opaque data item backing a token.
///
/// Items are reference-counted and shared between the engine, signal
/// payloads, and drag payloads. Two tokens wrapping the same item remain
/// distinct tokens; item identity (via [`key`](TagItem::key)) is what
/// survives collapse/expand cycles and drag round-trips.
pub trait TagItem: fmt::Debug + Send + Sync + 'static {
    /// The concrete value, for typed capability checks via [`item_cast`].
    fn as_any(&self) -> &dyn Any;

    /// A stable identity key for the underlying data.
    ///
    /// Token objects may be destroyed and recreated (collapse, resize);
    /// the key is what callers compare to track a data item across those
    /// cycles.
    fn key(&self) -> String;

    /// A serializable recipe for rebuilding this item on state restore.
    ///
    /// Items that return `None` are skipped when widget state is saved.
    fn save(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Typed capability check on a data item.
///
/// Returns `None` when the item is not of the requested concrete type;
/// never panics. This is the supported way to recover a concrete item from
/// an [`Arc<dyn TagItem>`].
///
/// # Example
///
/// ```
/// use tagline::item::{item_cast, Address, TagItem};
///
/// let item = Address::new("Alice", "alice@example.com");
/// let dyn_item: &dyn TagItem = &item;
///
/// let addr = item_cast::<Address>(dyn_item).unwrap();
/// assert_eq!(addr.email(), "alice@example.com");
/// assert!(item_cast::<String>(dyn_item).is_none());
/// ```
pub fn item_cast<T: Any>(item: &dyn TagItem) -> Option<&T> {
    item.as_any().downcast_ref::<T>()
}

/// An email address item, the bundled [`TagItem`] implementation.
///
/// This is what a mail compose screen puts behind recipient chips; it also
/// serves as the reference implementation for custom items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    name: String,
    email: String,
}

impl Address {
    /// Create an address with a display name.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Create an address with no display name.
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            email: email.into(),
        }
    }

    /// The display name, possibly empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Parse free text into an address.
    ///
    /// Accepts `user@host` and `Name <user@host>` forms. Returns `None` for
    /// anything that does not look like an address; the caller treats that
    /// as "leave the text alone".
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_end_matches(',');
        if text.is_empty() {
            return None;
        }

        if let Some(open) = text.find('<') {
            let close = text.rfind('>')?;
            if close <= open {
                return None;
            }
            let email = text[open + 1..close].trim();
            if !is_plausible_email(email) {
                return None;
            }
            let name = text[..open].trim().trim_matches('"');
            return Some(Self::new(name, email));
        }

        if is_plausible_email(text) {
            return Some(Self::from_email(text));
        }
        None
    }
}

fn is_plausible_email(text: &str) -> bool {
    let Some(at) = text.find('@') else {
        return false;
    };
    at > 0 && at + 1 < text.len() && !text[at + 1..].contains('@') && !text.contains(char::is_whitespace)
}

impl TagItem for Address {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key(&self) -> String {
        self.email.clone()
    }

    fn save(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}

/// The externally-visible view of a token, carried by signals and returned
/// from token queries.
///
/// A handle pairs the underlying data item with the token's cached label
/// and its engine-internal identity. Handles stay valid for identity
/// comparison even after the token is destroyed, but
/// [`TagEdit::apply_avatar`](crate::tag_edit::TagEdit::apply_avatar) and
/// similar calls simply no-op once the token is gone.
#[derive(Debug, Clone)]
pub struct TagHandle {
    /// Engine-internal token identity.
    pub token: crate::token::TokenId,
    /// The data item this token represents.
    pub item: Arc<dyn TagItem>,
    /// The cached display label.
    pub label: String,
}

impl TagHandle {
    /// Typed capability check on the carried item.
    pub fn item_as<T: Any>(&self) -> Option<&T> {
        item_cast::<T>(self.item.as_ref())
    }
}

//! The collapse (overflow) state machine.
//!
//! When collapsed, only the first `max_visible` chips stay in the buffer;
//! the rest park in the registry's hidden list and a single more-indicator
//! chip summarizes them. Collapsing and expanding rearrange presentation
//! only, the logical token set never changes.

use std::fmt;

use crate::registry::TokenRegistry;

/// Formats the overflow indicator from the hidden-token count.
pub type MoreLabelFn = Box<dyn Fn(usize) -> String + Send>;

/// Drives collapse and expand over a registry.
///
/// `max_visible` interprets as: negative means collapse is disabled
/// entirely, zero means a collapsed field shows only the more-indicator,
/// positive limits the visible chip count.
pub struct CollapseController {
    collapsed: bool,
    max_visible: i32,
    more_label: MoreLabelFn,
}

impl fmt::Debug for CollapseController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollapseController")
            .field("collapsed", &self.collapsed)
            .field("max_visible", &self.max_visible)
            .finish_non_exhaustive()
    }
}

impl Default for CollapseController {
    fn default() -> Self {
        Self {
            // Fields start life unfocused.
            collapsed: true,
            max_visible: -1,
            more_label: Box::new(|n| format!("{n} more…")),
        }
    }
}

impl CollapseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn max_visible(&self) -> i32 {
        self.max_visible
    }

    /// Whether collapsing does anything at all.
    pub fn is_enabled(&self) -> bool {
        self.max_visible >= 0
    }

    /// Replace the indicator formatter.
    pub fn set_more_label(&mut self, f: MoreLabelFn) {
        self.more_label = f;
    }

    /// Change the visible-chip limit and re-apply the current state.
    pub fn set_max_visible(&mut self, max_visible: i32, registry: &mut TokenRegistry) {
        self.max_visible = max_visible;
        if self.collapsed {
            self.collapse(registry);
        } else {
            self.expand(registry);
        }
    }

    /// Park every chip past the limit and show the more-indicator.
    ///
    /// Idempotent. A no-op while collapse is disabled; the collapsed flag
    /// still flips on any enabled call, even when nothing is over the limit.
    pub fn collapse(&mut self, registry: &mut TokenRegistry) {
        if !self.is_enabled() {
            return;
        }
        self.collapsed = true;
        let visible = registry.tokens_in_buffer_order();
        let limit = self.max_visible as usize;
        if visible.len() > limit {
            // Overflow parks ahead of anything already hidden, preserving
            // overall order.
            for (i, id) in visible[limit..].iter().enumerate() {
                registry.park_token(*id, i);
            }
            tracing::debug!(
                target: "tagline::collapse",
                parked = visible.len() - limit,
                "collapsed overflow"
            );
        }
        self.refresh_more_indicator(registry);
    }

    /// Bring every hidden chip back into the buffer, in order.
    pub fn expand(&mut self, registry: &mut TokenRegistry) {
        self.collapsed = false;
        registry.clear_more_indicator();
        let hidden: Vec<_> = registry.hidden().to_vec();
        for id in hidden {
            registry.reinsert_token(id, registry.buffer().len());
        }
        if registry.hidden().is_empty() {
            tracing::trace!(target: "tagline::collapse", "expanded");
        }
    }

    /// Whether a collapsed field still has room for one more visible chip.
    pub fn has_room_for_token(&self, registry: &TokenRegistry) -> bool {
        if !self.collapsed || !self.is_enabled() {
            return true;
        }
        registry.visible_count() < self.max_visible as usize
    }

    /// Sync the more-indicator with the hidden count.
    ///
    /// The indicator exists exactly while the field is collapsed with hidden
    /// tokens.
    pub fn refresh_more_indicator(&self, registry: &mut TokenRegistry) {
        let hidden = registry.hidden().len();
        if self.collapsed && self.is_enabled() && hidden > 0 {
            registry.set_more_indicator(&(self.more_label)(hidden));
        } else {
            registry.clear_more_indicator();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{AddressFactory, ChipStyle};
    use crate::item::{Address, TagItem};
    use crate::registry::CommitCtx;
    use crate::token::TokenId;
    use std::sync::Arc;

    fn seeded(emails: &[&str]) -> (TokenRegistry, Vec<TokenId>) {
        let fa = AddressFactory::new();
        let st = ChipStyle::default();
        let ctx = CommitCtx {
            factory: &fa,
            available_width: 400.0,
            style: &st,
        };
        let mut reg = TokenRegistry::new();
        let mut ids = Vec::new();
        for email in emails {
            let item: Arc<dyn TagItem> = Arc::new(Address::from_email(*email));
            let at = reg.buffer().len();
            ids.push(reg.commit_token(item, at, false, &ctx).unwrap());
        }
        (reg, ids)
    }

    #[test]
    fn test_collapse_parks_overflow_in_order() {
        let (mut reg, ids) = seeded(&["a@x.io", "b@x.io", "c@x.io"]);
        let mut cc = CollapseController::new();
        cc.set_max_visible(1, &mut reg);
        cc.collapse(&mut reg);

        assert_eq!(reg.tokens_in_buffer_order(), vec![ids[0]]);
        assert_eq!(reg.hidden(), &[ids[1], ids[2]]);
        assert_eq!(reg.buffer().text(), "a@x.io 2 more…");
        assert_eq!(reg.full_token_list(), ids);
    }

    #[test]
    fn test_expand_restores_order() {
        let (mut reg, ids) = seeded(&["a@x.io", "b@x.io", "c@x.io"]);
        let mut cc = CollapseController::new();
        cc.set_max_visible(1, &mut reg);
        cc.collapse(&mut reg);
        cc.expand(&mut reg);

        assert_eq!(reg.tokens_in_buffer_order(), ids);
        assert!(reg.hidden().is_empty());
        assert_eq!(reg.buffer().text(), "a@x.io b@x.io c@x.io");
        assert!(reg.buffer().more_marker().is_none());
    }

    #[test]
    fn test_zero_limit_hides_everything() {
        let (mut reg, ids) = seeded(&["a@x.io", "b@x.io"]);
        let mut cc = CollapseController::new();
        cc.set_max_visible(0, &mut reg);
        cc.collapse(&mut reg);

        assert!(reg.tokens_in_buffer_order().is_empty());
        assert_eq!(reg.hidden(), &[ids[0], ids[1]]);
        assert_eq!(reg.buffer().text(), "2 more…");
        assert!(!cc.has_room_for_token(&reg));
    }

    #[test]
    fn test_negative_limit_disables_collapse() {
        let (mut reg, ids) = seeded(&["a@x.io", "b@x.io"]);
        let mut cc = CollapseController::new();
        assert_eq!(cc.max_visible(), -1);
        cc.collapse(&mut reg);

        assert_eq!(reg.tokens_in_buffer_order(), ids);
        assert!(reg.hidden().is_empty());
        assert!(reg.buffer().more_marker().is_none());
        assert!(cc.has_room_for_token(&reg));
    }

    #[test]
    fn test_collapse_under_limit_keeps_chips_visible() {
        let (mut reg, ids) = seeded(&["a@x.io"]);
        let mut cc = CollapseController::new();
        cc.set_max_visible(3, &mut reg);
        cc.collapse(&mut reg);

        assert!(cc.is_collapsed());
        assert_eq!(reg.tokens_in_buffer_order(), ids);
        assert!(reg.buffer().more_marker().is_none());
        assert!(cc.has_room_for_token(&reg));
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let (mut reg, _) = seeded(&["a@x.io", "b@x.io", "c@x.io"]);
        let mut cc = CollapseController::new();
        cc.set_max_visible(1, &mut reg);
        cc.collapse(&mut reg);
        let text = reg.buffer().text().to_string();
        cc.collapse(&mut reg);
        assert_eq!(reg.buffer().text(), text);
    }

    #[test]
    fn test_custom_more_label() {
        let (mut reg, _) = seeded(&["a@x.io", "b@x.io"]);
        let mut cc = CollapseController::new();
        cc.set_more_label(Box::new(|n| format!("+{n}")));
        cc.set_max_visible(1, &mut reg);
        cc.collapse(&mut reg);
        assert_eq!(reg.buffer().text(), "a@x.io +1");
    }
}

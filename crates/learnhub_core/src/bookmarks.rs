//! crates/learnhub_core/src/bookmarks.rs
//!
//! Optimistic bookmark toggling: the toggle shows immediately, and is either
//! confirmed once the store accepts it or rolled back if the store fails.

use std::collections::BTreeSet;
use uuid::Uuid;

/// A toggle that has been applied locally but not yet confirmed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a pending toggle must be confirmed or rolled back"]
pub struct PendingToggle {
    pub clip_id: Uuid,
    /// Membership before the toggle was applied.
    pub was_bookmarked: bool,
}

impl PendingToggle {
    pub fn now_bookmarked(&self) -> bool {
        !self.was_bookmarked
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkSet {
    clips: BTreeSet<Uuid>,
}

impl BookmarkSet {
    pub fn contains(&self, clip_id: Uuid) -> bool {
        self.clips.contains(&clip_id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.clips.iter().copied()
    }

    /// Flips membership immediately and returns the toggle to settle later.
    pub fn toggle(&mut self, clip_id: Uuid) -> PendingToggle {
        let was_bookmarked = !self.clips.insert(clip_id);
        if was_bookmarked {
            self.clips.remove(&clip_id);
        }
        PendingToggle {
            clip_id,
            was_bookmarked,
        }
    }

    /// The store accepted the change; nothing to undo.
    pub fn confirm(&mut self, pending: PendingToggle) -> bool {
        pending.now_bookmarked()
    }

    /// The store rejected the change; restore the previous membership.
    pub fn rollback(&mut self, pending: PendingToggle) {
        if pending.was_bookmarked {
            self.clips.insert(pending.clip_id);
        } else {
            self.clips.remove(&pending.clip_id);
        }
    }
}

impl FromIterator<Uuid> for BookmarkSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self {
            clips: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_applies_immediately() {
        let clip = Uuid::from_u128(1);
        let mut set = BookmarkSet::default();
        let pending = set.toggle(clip);
        assert!(set.contains(clip));
        assert!(pending.now_bookmarked());
        assert!(set.confirm(pending));
        assert!(set.contains(clip));
    }

    #[test]
    fn rollback_restores_previous_state() {
        let clip = Uuid::from_u128(1);
        let mut set: BookmarkSet = [clip].into_iter().collect();
        let pending = set.toggle(clip);
        assert!(!set.contains(clip));
        set.rollback(pending);
        assert!(set.contains(clip));

        let other = Uuid::from_u128(2);
        let pending = set.toggle(other);
        set.rollback(pending);
        assert!(!set.contains(other));
        assert_eq!(set.len(), 1);
    }
}

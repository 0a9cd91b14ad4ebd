//! Selection registry
//!
//! Selection is a set of record identities, not list positions, so it survives
//! paging, stream growth and re-sorting. It is mutated only by explicit
//! operator actions: a refetch never adds or removes an id, even when the
//! selected record no longer appears in any loaded page.

use crate::page::RecordId;
use indexmap::IndexSet;
use std::collections::HashSet;

/// Selected record identities, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: IndexSet<RecordId>,
}

impl SelectionSet {
    /// Empty selection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of exactly one id; returns whether it is now selected
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// "Select all / none" over the visible rows
    ///
    /// When the selection is exactly the visible id set, the visible ids are
    /// deselected. Otherwise every visible id is added; selections outside the
    /// visible rows are kept.
    pub fn select_all_visible(&mut self, visible: &[RecordId]) {
        let visible_set: HashSet<&RecordId> = visible.iter().collect();
        let exactly_visible = !visible_set.is_empty()
            && self.ids.len() == visible_set.len()
            && self.ids.iter().all(|id| visible_set.contains(id));

        if exactly_visible {
            self.ids.retain(|id| !visible_set.contains(id));
        } else {
            self.ids.extend(visible.iter().cloned());
        }
    }

    /// Deselect everything
    #[inline]
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Whether `id` is selected
    #[inline]
    #[must_use]
    pub fn has(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Selected ids in selection order
    pub fn selected_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.ids.iter()
    }

    /// Selected ids as an owned vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<RecordId> {
        self.ids.iter().cloned().collect()
    }

    /// Number of selected ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Nothing selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

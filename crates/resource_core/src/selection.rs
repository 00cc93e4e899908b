use std::collections::HashSet;

use shared::{domain::EntityId, protocol::Identifiable};

/// Tracks the set of selected entity identifiers.
///
/// The selection is deliberately not pruned when the loaded page changes: a
/// refetch can leave identifiers selected that are no longer on screen.
/// Pruning is an explicit policy decision left to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionManager {
    selected: HashSet<EntityId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the id when present, adds it otherwise. Returns whether the
    /// id is selected afterwards.
    pub fn toggle(&mut self, id: EntityId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// Replaces the selection with the identifiers of the currently loaded
    /// page, not the full remote dataset.
    pub fn select_all<T: Identifiable>(&mut self, items: &[T]) {
        self.selected = items.iter().map(Identifiable::id).collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    pub fn ids(&self) -> &HashSet<EntityId> {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row(EntityId);

    impl Identifiable for Row {
        fn id(&self) -> EntityId {
            self.0
        }
    }

    #[test]
    fn toggle_twice_restores_prior_state() {
        let mut selection = SelectionManager::new();
        assert!(selection.toggle(EntityId(4)));
        assert!(selection.contains(EntityId(4)));
        assert!(!selection.toggle(EntityId(4)));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_matches_current_page_exactly() {
        let mut selection = SelectionManager::new();
        selection.toggle(EntityId(99));

        let page = [Row(EntityId(1)), Row(EntityId(2)), Row(EntityId(3))];
        selection.select_all(&page);

        let expected: HashSet<EntityId> =
            [EntityId(1), EntityId(2), EntityId(3)].into_iter().collect();
        assert_eq!(selection.ids(), &expected);
        assert!(!selection.contains(EntityId(99)));
    }

    #[test]
    fn clear_empties_selection() {
        let mut selection = SelectionManager::new();
        selection.toggle(EntityId(1));
        selection.toggle(EntityId(2));
        selection.clear();
        assert!(selection.is_empty());
    }
}

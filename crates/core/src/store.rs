//! In-memory mirror of the server's items and categories.
//!
//! Collections keep insertion order so the list renders stably without an explicit sort. Every
//! mutating call bumps [`EntityStore::version`]; derived views compare versions to know when
//! they are stale.

use std::collections::HashMap;
use std::hash::Hash;

use crate::model::{Category, CategoryId, Item, ItemId};

pub trait Entity: Clone {
    type Id: Copy + Eq + Hash;

    fn id(&self) -> Self::Id;
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct Collection<T: Entity> {
    entries: Vec<T>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn from_entities(entities: Vec<T>) -> Self {
        let mut collection = Self::default();
        collection.replace_all(entities);
        collection
    }

    /// Swap the whole collection. Later duplicates of an id replace the earlier entry in place.
    pub fn replace_all(&mut self, entities: Vec<T>) {
        let mut positions: HashMap<T::Id, usize> = HashMap::with_capacity(entities.len());
        let mut entries: Vec<T> = Vec::with_capacity(entities.len());
        for entity in entities {
            match positions.get(&entity.id()) {
                Some(&index) => entries[index] = entity,
                None => {
                    positions.insert(entity.id(), entries.len());
                    entries.push(entity);
                }
            }
        }
        self.entries = entries;
    }

    /// Returns `true` when the entity was new.
    pub fn upsert(&mut self, entity: T) -> bool {
        match self.position(entity.id()) {
            Some(index) => {
                self.entries[index] = entity;
                false
            }
            None => {
                self.entries.push(entity);
                true
            }
        }
    }

    /// Returns `true` when something was removed.
    pub fn remove(&mut self, id: T::Id) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.entries.iter().find(|entity| entity.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.entries.iter_mut().find(|entity| entity.id() == id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: T::Id) -> Option<usize> {
        self.entries.iter().position(|entity| entity.id() == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    items: Collection<Item>,
    categories: Collection<Category>,
    version: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &Collection<Item> {
        &self.items
    }

    pub fn categories(&self) -> &Collection<Category> {
        &self.categories
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn replace_items(&mut self, items: Vec<Item>) {
        self.items.replace_all(items);
        self.bump();
    }

    pub fn replace_categories(&mut self, categories: Vec<Category>) {
        self.categories.replace_all(categories);
        self.bump();
    }

    pub fn upsert_item(&mut self, item: Item) -> bool {
        let inserted = self.items.upsert(item);
        self.bump();
        inserted
    }

    pub fn upsert_category(&mut self, category: Category) -> bool {
        let inserted = self.categories.upsert(category);
        self.bump();
        inserted
    }

    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let removed = self.items.remove(id);
        if removed {
            self.bump();
        }
        removed
    }

    pub fn remove_category(&mut self, id: CategoryId) -> bool {
        let removed = self.categories.remove(id);
        if removed {
            self.bump();
        }
        removed
    }

    /// Set the completion flag of a stored item, returning the previous value.
    pub fn set_completed(&mut self, id: ItemId, completed: bool) -> Option<bool> {
        let item = self.items.get_mut(id)?;
        let previous = item.completed;
        item.completed = completed;
        self.bump();
        Some(previous)
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: i64, title: &str) -> Item {
        Item {
            id: ItemId(id),
            title: title.into(),
            description: None,
            completed: false,
            category: None,
            created_at: None,
            last_modified: None,
        }
    }

    fn titles(store: &EntityStore) -> Vec<&str> {
        store.items().iter().map(|item| item.title.as_str()).collect()
    }

    #[test]
    fn upsert_replaces_in_place_and_appends_new() {
        let mut store = EntityStore::new();
        store.replace_items(vec![item(1, "a"), item(2, "b"), item(3, "c")]);

        assert!(!store.upsert_item(item(2, "b2")));
        assert!(store.upsert_item(item(4, "d")));
        assert_eq!(titles(&store), vec!["a", "b2", "c", "d"]);
    }

    #[test]
    fn remove_missing_is_a_noop() {
        let mut store = EntityStore::new();
        store.replace_items(vec![item(1, "a")]);
        let version = store.version();

        assert!(!store.remove_item(ItemId(9)));
        assert_eq!(store.version(), version);
        assert!(store.remove_item(ItemId(1)));
        assert!(store.items().is_empty());
        assert!(store.version() > version);
    }

    #[test]
    fn replace_all_keeps_one_entity_per_id() {
        let mut store = EntityStore::new();
        store.replace_items(vec![item(1, "a"), item(2, "b"), item(1, "a2")]);
        assert_eq!(titles(&store), vec!["a2", "b"]);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut store = EntityStore::new();
        let start = store.version();
        store.replace_items(vec![item(1, "a")]);
        store.upsert_item(item(1, "b"));
        store.set_completed(ItemId(1), true);
        assert_eq!(store.version(), start + 3);
    }

    #[test]
    fn set_completed_reports_previous_value() {
        let mut store = EntityStore::new();
        store.replace_items(vec![item(1, "a")]);
        assert_eq!(store.set_completed(ItemId(1), true), Some(false));
        assert_eq!(store.set_completed(ItemId(1), false), Some(true));
        assert_eq!(store.set_completed(ItemId(2), true), None);
    }
}

//! Derives the visible subset of items from the store and the active filter criteria.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::markup::strip_markup;
use crate::model::{Category, CategoryId, Item, ItemId};
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategorySelector {
    #[default]
    Any,
    Uncategorized,
    Category(CategoryId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub category: CategorySelector,
    pub query: String,
}

impl FilterCriteria {
    pub fn new(category: CategorySelector, query: impl Into<String>) -> Self {
        Self {
            category,
            query: query.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category == CategorySelector::Any && self.query.trim().is_empty()
    }

    pub fn summary(&self, categories: &[Category]) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        match self.category {
            CategorySelector::Any => {}
            CategorySelector::Uncategorized => parts.push("category:none".to_string()),
            CategorySelector::Category(id) => {
                match categories.iter().find(|category| category.id == id) {
                    Some(category) => parts.push(format!("category:{}", category.name)),
                    None => parts.push(format!("category:{id} (missing)")),
                }
            }
        }

        let query = self.query.trim();
        if !query.is_empty() {
            parts.push(format!("search:\"{query}\""));
        }

        Some(parts.join(" | "))
    }
}

/// Items matching both the category and the text predicate, in store order.
pub fn visible_items<'a>(
    items: &'a [Item],
    categories: &[Category],
    criteria: &FilterCriteria,
) -> Vec<&'a Item> {
    let names = category_names(categories);
    let needle = criteria.query.trim().to_lowercase();

    items
        .iter()
        .filter(|item| {
            let resolved = resolve(item, &names);
            matches_category(resolved.map(|(id, _)| id), criteria.category)
                && matches_text(item, resolved.map(|(_, name)| name), &needle)
        })
        .collect()
}

fn category_names(categories: &[Category]) -> HashMap<CategoryId, &str> {
    categories
        .iter()
        .map(|category| (category.id, category.name.as_str()))
        .collect()
}

/// A reference to a category that is not in the collection resolves to nothing.
fn resolve<'c>(
    item: &Item,
    names: &HashMap<CategoryId, &'c str>,
) -> Option<(CategoryId, &'c str)> {
    let id = item.category_id()?;
    names.get(&id).map(|name| (id, *name))
}

fn matches_category(resolved: Option<CategoryId>, selector: CategorySelector) -> bool {
    match selector {
        CategorySelector::Any => true,
        CategorySelector::Uncategorized => resolved.is_none(),
        CategorySelector::Category(wanted) => resolved == Some(wanted),
    }
}

fn matches_text(item: &Item, category_name: Option<&str>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if item.title.to_lowercase().contains(needle) {
        return true;
    }
    let description_hit = item
        .description
        .as_deref()
        .map(|description| strip_markup(description).to_lowercase().contains(needle))
        .unwrap_or(false);
    if description_hit {
        return true;
    }
    category_name
        .map(|name| name.to_lowercase().contains(needle))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub per_category: BTreeMap<CategoryId, usize>,
    pub uncategorized: usize,
}

impl CategoryCounts {
    pub fn for_category(&self, id: CategoryId) -> usize {
        self.per_category.get(&id).copied().unwrap_or(0)
    }
}

/// Item totals per category. Every known category is listed, even with zero items; dangling
/// references count as uncategorized.
pub fn category_counts(items: &[Item], categories: &[Category]) -> CategoryCounts {
    let mut counts = CategoryCounts {
        per_category: categories.iter().map(|category| (category.id, 0)).collect(),
        uncategorized: 0,
    };
    for item in items {
        match item
            .category_id()
            .and_then(|id| counts.per_category.get_mut(&id))
        {
            Some(count) => *count += 1,
            None => counts.uncategorized += 1,
        }
    }
    counts
}

/// Memoised visible subset, recomputed when the store version or the criteria change.
#[derive(Debug, Clone, Default)]
pub struct FilteredView {
    criteria: FilterCriteria,
    cached: Option<(u64, Vec<ItemId>)>,
}

impl FilteredView {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            cached: None,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        if criteria != self.criteria {
            self.criteria = criteria;
            self.cached = None;
        }
    }

    pub fn is_stale(&self, store: &EntityStore) -> bool {
        !matches!(&self.cached, Some((version, _)) if *version == store.version())
    }

    pub fn visible_ids(&mut self, store: &EntityStore) -> &[ItemId] {
        if self.is_stale(store) {
            let ids = visible_items(
                store.items().as_slice(),
                store.categories().as_slice(),
                &self.criteria,
            )
            .into_iter()
            .map(|item| item.id)
            .collect();
            self.cached = Some((store.version(), ids));
        }
        match &self.cached {
            Some((_, ids)) => ids,
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryRef;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn item(id: i64, title: &str, category: Option<i64>) -> Item {
        Item {
            id: ItemId(id),
            title: title.into(),
            description: None,
            completed: false,
            category: category.map(|id| CategoryRef {
                id: CategoryId(id),
            }),
            created_at: None,
            last_modified: None,
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId(id),
            name: name.into(),
            color: None,
            description: None,
            created_at: None,
            last_modified: None,
        }
    }

    fn fixture() -> (Vec<Item>, Vec<Category>) {
        let mut report = item(3, "Quarterly report", Some(1));
        report.description = Some("<p>Include <em>revenue</em> tables</p>".into());
        let items = vec![
            item(1, "Buy milk", None),
            item(2, "Fix bike", Some(2)),
            report,
            item(4, "Call plumber", Some(99)),
        ];
        let categories = vec![category(1, "Work"), category(2, "Errands")];
        (items, categories)
    }

    fn ids(items: Vec<&Item>) -> Vec<i64> {
        items.into_iter().map(|item| item.id.0).collect()
    }

    #[test]
    fn empty_criteria_returns_everything_in_store_order() {
        let (items, categories) = fixture();
        let visible = visible_items(&items, &categories, &FilterCriteria::default());
        assert_eq!(ids(visible), vec![1, 2, 3, 4]);
    }

    #[rstest]
    #[case(CategorySelector::Any, "", vec![1, 2, 3, 4])]
    #[case(CategorySelector::Uncategorized, "", vec![1, 4])]
    #[case(CategorySelector::Category(CategoryId(1)), "", vec![3])]
    #[case(CategorySelector::Category(CategoryId(99)), "", vec![])]
    #[case(CategorySelector::Any, "  MILK ", vec![1])]
    #[case(CategorySelector::Any, "revenue", vec![3])]
    #[case(CategorySelector::Any, "em", vec![])]
    #[case(CategorySelector::Any, "errands", vec![2])]
    #[case(CategorySelector::Category(CategoryId(2)), "bike", vec![2])]
    #[case(CategorySelector::Category(CategoryId(2)), "milk", vec![])]
    fn filters_conjunctively(
        #[case] selector: CategorySelector,
        #[case] query: &str,
        #[case] expected: Vec<i64>,
    ) {
        let (items, categories) = fixture();
        let criteria = FilterCriteria::new(selector, query);
        assert_eq!(ids(visible_items(&items, &categories, &criteria)), expected);
    }

    #[test]
    fn dangling_category_contributes_no_name_match() {
        let items = vec![item(1, "Call plumber", Some(5))];
        let categories = vec![category(6, "Home")];
        let criteria = FilterCriteria::new(CategorySelector::Any, "home");
        assert!(visible_items(&items, &categories, &criteria).is_empty());
    }

    #[test]
    fn uncategorized_query_scenario() {
        let items = vec![item(1, "Buy milk", None)];
        let mut criteria = FilterCriteria::new(CategorySelector::Uncategorized, "milk");
        assert_eq!(ids(visible_items(&items, &[], &criteria)), vec![1]);

        criteria.query = "bread".into();
        assert!(visible_items(&items, &[], &criteria).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let (items, categories) = fixture();
        let criteria = FilterCriteria::new(CategorySelector::Any, "i");
        let first = ids(visible_items(&items, &categories, &criteria));
        let second = ids(visible_items(&items, &categories, &criteria));
        assert_eq!(first, second);
    }

    #[test]
    fn counts_include_empty_categories_and_dangling_as_uncategorized() {
        let (items, mut categories) = fixture();
        categories.push(category(3, "Someday"));
        let counts = category_counts(&items, &categories);
        assert_eq!(counts.for_category(CategoryId(1)), 1);
        assert_eq!(counts.for_category(CategoryId(2)), 1);
        assert_eq!(counts.for_category(CategoryId(3)), 0);
        assert_eq!(counts.uncategorized, 2);
    }

    #[test]
    fn summary_describes_active_criteria() {
        let (_, categories) = fixture();
        assert_eq!(FilterCriteria::default().summary(&categories), None);

        let criteria = FilterCriteria::new(CategorySelector::Category(CategoryId(1)), " tax ");
        assert_eq!(
            criteria.summary(&categories).as_deref(),
            Some("category:Work | search:\"tax\"")
        );
        let stale = FilterCriteria::new(CategorySelector::Category(CategoryId(7)), "");
        assert_eq!(
            stale.summary(&categories).as_deref(),
            Some("category:#7 (missing)")
        );
    }

    #[test]
    fn filtered_view_recomputes_after_store_mutation() {
        let (items, categories) = fixture();
        let mut store = EntityStore::new();
        store.replace_categories(categories);
        store.replace_items(items);

        let mut view = FilteredView::new(FilterCriteria::new(CategorySelector::Uncategorized, ""));
        assert_eq!(view.visible_ids(&store), &[ItemId(1), ItemId(4)]);
        assert!(!view.is_stale(&store));

        store.remove_item(ItemId(1));
        assert!(view.is_stale(&store));
        assert_eq!(view.visible_ids(&store), &[ItemId(4)]);

        view.set_criteria(FilterCriteria::default());
        assert_eq!(view.visible_ids(&store), &[ItemId(2), ItemId(3), ItemId(4)]);
    }
}

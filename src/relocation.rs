// ⚖️ Relocation Engine - Keep the category tree consistent with itself
// The tree is denormalized: each item duplicates its category's display
// name. An edit that changes that field must move the record between
// parent mappings and delete the stale copy; this module is the one place
// that reconciliation lives.

use serde::Serialize;

use crate::catalog::{category_by_name, CatalogTree, CategoryKey, Item, ItemKey};
use crate::store::{CatalogStore, StoreError};

// ============================================================================
// ERROR KINDS
// ============================================================================

/// Everything the locate/relocate surface can report to a caller.
///
/// No retry, no rollback: whatever writes landed before a failure stay
/// landed, and `PartialRelocation` names the resulting split state so a
/// caller can tell it from total failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// No data available to search: the tree is absent or has no categories.
    EmptyTree,

    /// Searched the whole tree and missed.
    NotFound { name: String },

    /// No category carries the requested display name.
    DestinationCategoryNotFound { category: String },

    /// Draft failed validation before any write was attempted.
    Invalid(Vec<crate::catalog::FieldIssue>),

    /// The backing store rejected a read or write.
    Write(StoreError),

    /// A move wrote the destination copy but failed to delete the source:
    /// the record now exists under both keys until corrected.
    PartialRelocation {
        name: String,
        item_key: ItemKey,
        old_category_key: CategoryKey,
        new_category_key: CategoryKey,
        source: StoreError,
    },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::EmptyTree => write!(f, "no categories in the catalog"),
            CatalogError::NotFound { name } => {
                write!(f, "item \"{}\" not found in any category", name)
            }
            CatalogError::DestinationCategoryNotFound { category } => {
                write!(f, "no category named \"{}\"", category)
            }
            CatalogError::Invalid(issues) => {
                write!(f, "invalid item: ")?;
                for (i, issue) in issues.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", issue)?;
                }
                Ok(())
            }
            CatalogError::Write(err) => write!(f, "{}", err),
            CatalogError::PartialRelocation {
                name,
                old_category_key,
                new_category_key,
                source,
                ..
            } => write!(
                f,
                "item \"{}\" now exists in both {} and {}: {}",
                name, old_category_key, new_category_key, source
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        CatalogError::Write(err)
    }
}

// ============================================================================
// LOCATOR
// ============================================================================

/// Where an item lives: which category's mapping holds it, under which key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub category_key: CategoryKey,
    pub item_key: ItemKey,
}

/// Find the category/item pair whose item name matches `name`.
///
/// Full linear scan, categories then items in mapping order, first match
/// wins (names are not unique by enforcement, only by convention). Pure
/// read over an already-fetched snapshot.
pub fn locate(tree: &CatalogTree, name: &str) -> Result<Location, CatalogError> {
    if tree.is_empty() {
        return Err(CatalogError::EmptyTree);
    }

    for (category_key, category) in tree {
        if let Some((item_key, _)) = category.item_by_name(name) {
            return Ok(Location {
                category_key: category_key.clone(),
                item_key: item_key.clone(),
            });
        }
    }

    Err(CatalogError::NotFound {
        name: name.to_string(),
    })
}

// ============================================================================
// RELOCATION OUTCOME
// ============================================================================

/// What a successful `update_item` did to the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RelocationOutcome {
    /// Category unchanged (by display name): record rewritten in place.
    Updated { location: Location },

    /// True move: record written under the destination key, stale copy
    /// deleted. The item key is preserved across the move.
    Moved { from: Location, to: Location },
}

impl RelocationOutcome {
    pub fn is_move(&self) -> bool {
        matches!(self, RelocationOutcome::Moved { .. })
    }

    /// Where the record lives after the operation.
    pub fn location(&self) -> &Location {
        match self {
            RelocationOutcome::Updated { location } => location,
            RelocationOutcome::Moved { to, .. } => to,
        }
    }
}

// ============================================================================
// RELOCATION ENGINE
// ============================================================================

/// The edit/delete/add surface over a catalog store.
///
/// Single-threaded and sequential: each operation fetches a snapshot, then
/// issues its writes one by one. The read-then-write span is not atomic
/// against concurrent sessions; last writer wins.
pub struct RelocationEngine<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> RelocationEngine<S> {
    pub fn new(store: S) -> Self {
        RelocationEngine { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Apply an edit to the item currently named `name`.
    ///
    /// The updated record is written to the old location unconditionally —
    /// that write is how ordinary field edits (price, color, ...) reach
    /// storage. Only then, if the old category's display name differs from
    /// `updated.category`, the record is moved: destination resolved by
    /// display name (first match), written under the same item key, stale
    /// copy deleted. A missing destination therefore fails *after* the
    /// in-place write has landed.
    pub fn update_item(
        &mut self,
        name: &str,
        updated: &Item,
    ) -> Result<RelocationOutcome, CatalogError> {
        let tree = self.store.fetch_tree()?;

        let old = locate(&tree, name)?;
        // locate only returns keys present in the snapshot
        let old_category_name = tree[&old.category_key].name.clone();

        self.store
            .write_item(&old.category_key, &old.item_key, updated)?;

        if old_category_name == updated.category {
            return Ok(RelocationOutcome::Updated { location: old });
        }

        let (new_category_key, _) = category_by_name(&tree, &updated.category).ok_or(
            CatalogError::DestinationCategoryNotFound {
                category: updated.category.clone(),
            },
        )?;
        let new_category_key = new_category_key.clone();

        self.store
            .write_item(&new_category_key, &old.item_key, updated)?;

        self.store
            .delete_item(&old.category_key, &old.item_key)
            .map_err(|source| CatalogError::PartialRelocation {
                name: name.to_string(),
                item_key: old.item_key.clone(),
                old_category_key: old.category_key.clone(),
                new_category_key: new_category_key.clone(),
                source,
            })?;

        Ok(RelocationOutcome::Moved {
            to: Location {
                category_key: new_category_key,
                item_key: old.item_key.clone(),
            },
            from: old,
        })
    }

    /// Deletion variant: locate by name, remove from the containing
    /// category. No destination logic.
    pub fn remove_item(&mut self, name: &str) -> Result<Location, CatalogError> {
        let tree = self.store.fetch_tree()?;
        let location = locate(&tree, name)?;

        self.store
            .delete_item(&location.category_key, &location.item_key)?;

        Ok(location)
    }

    /// Add flow: validate the draft, stamp it the way the add screen does
    /// (denormalized category name, fresh rating, not top-of-week), push it
    /// under a fresh key in the chosen category.
    pub fn add_item(
        &mut self,
        category_key: &CategoryKey,
        draft: Item,
    ) -> Result<ItemKey, CatalogError> {
        let issues = draft.validate();
        if !issues.is_empty() {
            return Err(CatalogError::Invalid(issues));
        }

        let tree = self.store.fetch_tree()?;
        let category = tree.get(category_key).ok_or_else(|| {
            CatalogError::DestinationCategoryNotFound {
                category: category_key.clone(),
            }
        })?;

        let mut record = draft;
        record.category = category.name.clone();
        record.rating = "0.0".to_string();
        record.is_top_of_week = false;

        let item_key = self.store.push_item(category_key, &record)?;
        Ok(item_key)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogTree, Category};
    use crate::store::MemoryStore;

    fn item(name: &str, category: &str, price: f64) -> Item {
        Item {
            name: name.to_string(),
            price,
            color: "White".to_string(),
            origin: "Vietnam".to_string(),
            weight: 250,
            rating: "0.0".to_string(),
            image: "https://example.com/orchid.jpg".to_string(),
            category: category.to_string(),
            is_top_of_week: false,
        }
    }

    /// c1 "Orchids" holding Phal, c2 "Succulents" empty.
    fn phal_tree() -> CatalogTree {
        let mut orchids = Category::new("Orchids");
        orchids
            .items
            .insert("i1".to_string(), item("Phal", "Orchids", 10.0));

        let mut tree = CatalogTree::new();
        tree.insert("c1".to_string(), orchids);
        tree.insert("c2".to_string(), Category::new("Succulents"));
        tree
    }

    #[test]
    fn test_locate_unique_item() {
        let location = locate(&phal_tree(), "Phal").unwrap();
        assert_eq!(location.category_key, "c1");
        assert_eq!(location.item_key, "i1");
    }

    #[test]
    fn test_locate_miss_is_not_found() {
        let err = locate(&phal_tree(), "Dendrobium").unwrap_err();
        assert_eq!(
            err,
            CatalogError::NotFound {
                name: "Dendrobium".to_string()
            }
        );
    }

    #[test]
    fn test_locate_empty_tree_is_distinct_from_miss() {
        let err = locate(&CatalogTree::new(), "Phal").unwrap_err();
        assert_eq!(err, CatalogError::EmptyTree);
    }

    #[test]
    fn test_locate_duplicate_names_first_match_wins() {
        let mut tree = phal_tree();
        tree.get_mut("c2")
            .unwrap()
            .items
            .insert("i9".to_string(), item("Phal", "Succulents", 50.0));

        let location = locate(&tree, "Phal").unwrap();
        assert_eq!(location.category_key, "c1");
    }

    #[test]
    fn test_update_in_place_is_idempotent_on_category() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let outcome = engine
            .update_item("Phal", &item("Phal", "Orchids", 12.0))
            .unwrap();

        assert!(!outcome.is_move());
        let tree = engine.store().tree();
        assert_eq!(tree["c1"].items.len(), 1);
        assert_eq!(tree["c2"].items.len(), 0);
        assert_eq!(tree["c1"].items["i1"].price, 12.0);
    }

    #[test]
    fn test_move_between_categories_preserves_item_key() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let outcome = engine
            .update_item("Phal", &item("Phal", "Succulents", 12.0))
            .unwrap();

        assert!(outcome.is_move());
        assert_eq!(outcome.location().category_key, "c2");
        assert_eq!(outcome.location().item_key, "i1");

        let tree = engine.store().tree();
        assert!(tree["c1"].items.is_empty());
        assert_eq!(tree["c2"].items["i1"].price, 12.0);
        assert_eq!(tree["c2"].items["i1"].category, "Succulents");
    }

    #[test]
    fn test_move_destination_missing_leaves_in_place_write() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let err = engine
            .update_item("Phal", &item("Phal", "Cacti", 12.0))
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DestinationCategoryNotFound {
                category: "Cacti".to_string()
            }
        );

        // The unconditional in-place write has already landed; the
        // denormalized field is stale until the edit is corrected.
        let tree = engine.store().tree();
        assert_eq!(tree["c1"].items["i1"].price, 12.0);
        assert_eq!(tree["c1"].items["i1"].category, "Cacti");
        assert!(tree["c2"].items.is_empty());
    }

    #[test]
    fn test_update_missing_item_is_not_found() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let err = engine
            .update_item("Dendrobium", &item("Dendrobium", "Orchids", 5.0))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn test_first_write_failure_changes_nothing() {
        let store = MemoryStore::with_tree(phal_tree()).fail_after(0);
        let mut engine = RelocationEngine::new(store);

        let err = engine
            .update_item("Phal", &item("Phal", "Succulents", 12.0))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Write(_)));

        let tree = engine.store().tree();
        assert_eq!(tree["c1"].items["i1"].price, 10.0);
        assert!(tree["c2"].items.is_empty());
    }

    #[test]
    fn test_destination_write_failure_keeps_tree_consistent() {
        // In-place write succeeds, destination write fails: the item is
        // still only in the old category, with a stale category field.
        let store = MemoryStore::with_tree(phal_tree()).fail_after(1);
        let mut engine = RelocationEngine::new(store);

        let err = engine
            .update_item("Phal", &item("Phal", "Succulents", 12.0))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Write(_)));

        let tree = engine.store().tree();
        assert_eq!(tree["c1"].items.len(), 1);
        assert!(tree["c2"].items.is_empty());
        assert_eq!(tree["c1"].items["i1"].category, "Succulents");
    }

    #[test]
    fn test_delete_failure_after_destination_write_is_partial() {
        // Both writes land, the stale-copy delete fails: the record now
        // exists under both keys and the error says exactly that.
        let store = MemoryStore::with_tree(phal_tree()).fail_after(2);
        let mut engine = RelocationEngine::new(store);

        let err = engine
            .update_item("Phal", &item("Phal", "Succulents", 12.0))
            .unwrap_err();

        match err {
            CatalogError::PartialRelocation {
                item_key,
                old_category_key,
                new_category_key,
                ..
            } => {
                assert_eq!(item_key, "i1");
                assert_eq!(old_category_key, "c1");
                assert_eq!(new_category_key, "c2");
            }
            other => panic!("expected PartialRelocation, got {:?}", other),
        }

        let tree = engine.store().tree();
        assert!(tree["c1"].items.contains_key("i1"));
        assert!(tree["c2"].items.contains_key("i1"));
    }

    #[test]
    fn test_move_between_same_named_categories_is_in_place() {
        // Two categories share the display name "Orchids": an edit keeping
        // that name is an in-place update, never a move.
        let mut tree = phal_tree();
        tree.insert("c3".to_string(), Category::new("Orchids"));
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(tree));

        let outcome = engine
            .update_item("Phal", &item("Phal", "Orchids", 15.0))
            .unwrap();

        assert!(!outcome.is_move());
        let after = engine.store().tree();
        assert_eq!(after["c1"].items.len(), 1);
        assert!(after["c3"].items.is_empty());
    }

    #[test]
    fn test_remove_item_scenario() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let location = engine.remove_item("Phal").unwrap();
        assert_eq!(location.category_key, "c1");
        assert_eq!(location.item_key, "i1");

        let tree = engine.store().tree();
        assert!(tree["c1"].items.is_empty());
        assert!(tree.contains_key("c2"));
    }

    #[test]
    fn test_remove_missing_item() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));
        let err = engine.remove_item("Dendrobium").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));

        let err = RelocationEngine::new(MemoryStore::new())
            .remove_item("Phal")
            .unwrap_err();
        assert_eq!(err, CatalogError::EmptyTree);
    }

    #[test]
    fn test_add_item_stamps_record() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let mut draft = item("Vanda", "", 30.0);
        draft.rating = "4.9".to_string();
        draft.is_top_of_week = true;

        let key = engine.add_item(&"c2".to_string(), draft).unwrap();

        let tree = engine.store().tree();
        let added = &tree["c2"].items[&key];
        assert_eq!(added.category, "Succulents");
        assert_eq!(added.rating, "0.0");
        assert!(!added.is_top_of_week);
    }

    #[test]
    fn test_add_item_rejects_invalid_draft() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));

        let mut draft = item("", "", 30.0);
        draft.color = "".to_string();

        let err = engine.add_item(&"c2".to_string(), draft).unwrap_err();
        match err {
            CatalogError::Invalid(issues) => assert_eq!(issues.len(), 2),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_add_item_unknown_category_key() {
        let mut engine = RelocationEngine::new(MemoryStore::with_tree(phal_tree()));
        let err = engine
            .add_item(&"c9".to_string(), item("Vanda", "", 30.0))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DestinationCategoryNotFound { .. }
        ));
    }
}

// 🗄️ Store Seam - Catalog backing store
// The core talks to the catalog database through this trait; the rest of
// the crate never sees a concrete backend.

use crate::catalog::{fresh_key, CatalogTree, Category, CategoryKey, Item, ItemKey};

// ============================================================================
// STORE ERROR
// ============================================================================

/// Failure from the backing store (network, I/O, SQL, serialization).
///
/// The core wraps this as `CatalogError::Write`; it never retries.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreError {
    pub operation: String,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: &str, message: impl std::fmt::Display) -> Self {
        StoreError {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store {} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for StoreError {}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Hierarchical key-value document store holding the category tree.
///
/// Three operations carry the whole edit surface: fetch the tree, upsert a
/// full item record at a path, delete the record at a path. `write_item`
/// overwrites wholesale, never a partial patch.
pub trait CatalogStore {
    /// The entire category/item tree. An absent root is an empty tree;
    /// callers decide what "empty" means for them.
    fn fetch_tree(&self) -> Result<CatalogTree, StoreError>;

    /// Upsert a full item record at `categories/{category}/items/{item}`.
    fn write_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
        record: &Item,
    ) -> Result<(), StoreError>;

    /// Remove the item record at the given path. Deleting an absent path
    /// is not an error (the store is last-writer-wins, not versioned).
    fn delete_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
    ) -> Result<(), StoreError>;

    /// Generate a fresh item key under the category and write the record
    /// there (the add flow's push-then-update).
    fn push_item(
        &mut self,
        category_key: &CategoryKey,
        record: &Item,
    ) -> Result<ItemKey, StoreError> {
        let item_key = fresh_key();
        self.write_item(category_key, &item_key, record)?;
        Ok(item_key)
    }

    /// Create or rename a category node, leaving its items untouched.
    fn write_category(
        &mut self,
        category_key: &CategoryKey,
        name: &str,
    ) -> Result<(), StoreError>;
}

// A mutable borrow of a store is a store; lets callers keep one store
// behind a lock and hand the engine a short-lived view of it.
impl<S: CatalogStore> CatalogStore for &mut S {
    fn fetch_tree(&self) -> Result<CatalogTree, StoreError> {
        (**self).fetch_tree()
    }

    fn write_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
        record: &Item,
    ) -> Result<(), StoreError> {
        (**self).write_item(category_key, item_key, record)
    }

    fn delete_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
    ) -> Result<(), StoreError> {
        (**self).delete_item(category_key, item_key)
    }

    fn write_category(
        &mut self,
        category_key: &CategoryKey,
        name: &str,
    ) -> Result<(), StoreError> {
        (**self).write_category(category_key, name)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory store: the reference semantics, used by tests and seeds.
///
/// `fail_after` makes the Nth mutating call fail, so partial-relocation
/// paths can be exercised without a real backend misbehaving.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: CatalogTree,
    writes_seen: usize,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_tree(tree: CatalogTree) -> Self {
        MemoryStore {
            tree,
            writes_seen: 0,
            fail_after: None,
        }
    }

    /// Let `n` mutating calls succeed, then fail every later one.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn tree(&self) -> &CatalogTree {
        &self.tree
    }

    fn check_fault(&mut self, operation: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.fail_after {
            if self.writes_seen >= limit {
                return Err(StoreError::new(operation, "injected fault"));
            }
        }
        self.writes_seen += 1;
        Ok(())
    }
}

impl CatalogStore for MemoryStore {
    fn fetch_tree(&self) -> Result<CatalogTree, StoreError> {
        Ok(self.tree.clone())
    }

    fn write_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
        record: &Item,
    ) -> Result<(), StoreError> {
        self.check_fault("write_item")?;

        let category = self
            .tree
            .entry(category_key.clone())
            .or_insert_with(Category::default);
        category.items.insert(item_key.clone(), record.clone());
        Ok(())
    }

    fn delete_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
    ) -> Result<(), StoreError> {
        self.check_fault("delete_item")?;

        if let Some(category) = self.tree.get_mut(category_key) {
            category.items.remove(item_key);
        }
        Ok(())
    }

    fn write_category(
        &mut self,
        category_key: &CategoryKey,
        name: &str,
    ) -> Result<(), StoreError> {
        self.check_fault("write_category")?;

        let category = self
            .tree
            .entry(category_key.clone())
            .or_insert_with(Category::default);
        category.name = name.to_string();
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(name: &str) -> Item {
        Item {
            name: name.to_string(),
            price: 12.5,
            color: "Purple".to_string(),
            origin: "Thailand".to_string(),
            weight: 300,
            rating: "0.0".to_string(),
            image: "https://example.com/p.jpg".to_string(),
            category: "Orchids".to_string(),
            is_top_of_week: false,
        }
    }

    #[test]
    fn test_write_then_fetch_round_trip() {
        let mut store = MemoryStore::new();
        store
            .write_category(&"c1".to_string(), "Orchids")
            .unwrap();
        store
            .write_item(&"c1".to_string(), &"i1".to_string(), &sample_item("Phal"))
            .unwrap();

        let tree = store.fetch_tree().unwrap();
        assert_eq!(tree["c1"].name, "Orchids");
        assert_eq!(tree["c1"].items["i1"].name, "Phal");
    }

    #[test]
    fn test_write_item_overwrites_wholesale() {
        let mut store = MemoryStore::new();
        store
            .write_item(&"c1".to_string(), &"i1".to_string(), &sample_item("Phal"))
            .unwrap();

        let mut updated = sample_item("Phal");
        updated.price = 99.0;
        store
            .write_item(&"c1".to_string(), &"i1".to_string(), &updated)
            .unwrap();

        let tree = store.fetch_tree().unwrap();
        assert_eq!(tree["c1"].items.len(), 1);
        assert_eq!(tree["c1"].items["i1"].price, 99.0);
    }

    #[test]
    fn test_push_item_generates_distinct_keys() {
        let mut store = MemoryStore::new();
        let k1 = store
            .push_item(&"c1".to_string(), &sample_item("Phal"))
            .unwrap();
        let k2 = store
            .push_item(&"c1".to_string(), &sample_item("Dendrobium"))
            .unwrap();

        assert_ne!(k1, k2);
        assert_eq!(store.tree()["c1"].items.len(), 2);
    }

    #[test]
    fn test_delete_absent_path_is_ok() {
        let mut store = MemoryStore::new();
        store
            .delete_item(&"nope".to_string(), &"nothing".to_string())
            .unwrap();
    }

    #[test]
    fn test_fault_injection_fails_after_n_writes() {
        let mut store = MemoryStore::new().fail_after(1);

        store
            .write_item(&"c1".to_string(), &"i1".to_string(), &sample_item("Phal"))
            .unwrap();

        let err = store
            .write_item(&"c1".to_string(), &"i2".to_string(), &sample_item("Vanda"))
            .unwrap_err();
        assert_eq!(err.operation, "write_item");

        // Failed write must not have landed
        assert_eq!(store.tree()["c1"].items.len(), 1);
    }
}

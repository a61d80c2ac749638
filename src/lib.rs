// Orchid Catalog - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod catalog;
pub mod db;
pub mod favorites;
pub mod relocation;
pub mod store;

// Re-export commonly used types
pub use catalog::{
    category_by_name, category_names, fresh_key, item_count,
    CatalogTree, Category, CategoryKey, FieldIssue, Item, ItemKey,
};
pub use db::{
    insert_event, load_seed_csv, seed_catalog, setup_database,
    Event, SeedRow, SqliteStore,
};
pub use favorites::LocalStore;
pub use relocation::{
    locate, CatalogError, Location, RelocationEngine, RelocationOutcome,
};
pub use store::{CatalogStore, MemoryStore, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 🌸 Catalog Data Model
// Categories and orchid items as the backing store shapes them:
// a flat mapping of category nodes, each owning a mapping of items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque key of a category node in the backing store.
pub type CategoryKey = String;

/// Opaque key of an item inside a category's `items` mapping.
pub type ItemKey = String;

/// The full category/item tree, keyed by opaque category key.
///
/// Insertion order in the backing store is irrelevant; nothing may depend
/// on iteration order beyond "first match wins" during lookups.
pub type CatalogTree = BTreeMap<CategoryKey, Category>;

/// Generate a fresh opaque key (UUID v4 string).
pub fn fresh_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// ITEM
// ============================================================================

/// One orchid listing.
///
/// `name` is the de facto identifier across the application: lookups,
/// favorites and deletion all go through it. Uniqueness is never enforced;
/// with duplicates the first match in tree order wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,

    /// Listed price, non-negative decimal.
    pub price: f64,

    pub color: String,

    /// Country or region of origin (e.g. "Vietnam")
    pub origin: String,

    /// Weight in grams.
    pub weight: u32,

    /// String-encoded decimal rating; new items start at "0.0".
    #[serde(default = "default_rating")]
    pub rating: String,

    /// Image URL.
    pub image: String,

    /// Display name of the containing category, duplicated onto the item
    /// for rendering. The true parent is whichever category's `items`
    /// mapping holds the key; this field can go stale between the two
    /// writes of a move.
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    #[serde(rename = "isTopOfTheWeek")]
    pub is_top_of_week: bool,
}

fn default_rating() -> String {
    "0.0".to_string()
}

/// A single draft-validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Item {
    /// Validate a draft before it is written.
    ///
    /// Mirrors the add screen's "fill all fields" rule plus the numeric
    /// constraints: non-empty name/color/origin/image, finite non-negative
    /// price. Returns one issue per offending field; empty means valid.
    pub fn validate(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();

        let required = [
            ("name", &self.name),
            ("color", &self.color),
            ("origin", &self.origin),
            ("image", &self.image),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                issues.push(FieldIssue {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }

        if !self.price.is_finite() || self.price < 0.0 {
            issues.push(FieldIssue {
                field: "price".to_string(),
                message: format!("must be a non-negative number, got {}", self.price),
            });
        }

        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// CATEGORY
// ============================================================================

/// A category node: display name plus its owned items.
///
/// Display names are not guaranteed unique across the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Category {
    pub name: String,

    #[serde(default)]
    pub items: BTreeMap<ItemKey, Item>,
}

impl Category {
    pub fn new(name: &str) -> Self {
        Category {
            name: name.to_string(),
            items: BTreeMap::new(),
        }
    }

    /// First item in this category whose name matches, in mapping order.
    pub fn item_by_name(&self, name: &str) -> Option<(&ItemKey, &Item)> {
        self.items.iter().find(|(_, item)| item.name == name)
    }
}

/// First category whose display name matches, in tree order.
pub fn category_by_name<'a>(
    tree: &'a CatalogTree,
    name: &str,
) -> Option<(&'a CategoryKey, &'a Category)> {
    tree.iter().find(|(_, category)| category.name == name)
}

/// All category display names, in tree order (the picker's data source).
pub fn category_names(tree: &CatalogTree) -> Vec<String> {
    tree.values().map(|category| category.name.clone()).collect()
}

/// Total item count across every category.
pub fn item_count(tree: &CatalogTree) -> usize {
    tree.values().map(|category| category.items.len()).sum()
}

// ============================================================================
// TESTS
// ============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::{CatalogTree, Category, CategoryKey, Item, ItemKey};
use crate::store::{CatalogStore, StoreError};

/// Durable catalog store on SQLite.
///
/// The tree is laid out the way the remote document store keys it:
/// a `categories` row per node, an `items` row per record (the record
/// itself stored as one JSON column, overwritten wholesale). Every
/// mutation is also appended to an `events` audit table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the catalog database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog database at {:?}", path))?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Latest audit events, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let events = stmt
            .query_map(params![limit as i64], |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn log_event(&self, event_type: &str, entity_id: &str, data: serde_json::Value) {
        let event = Event::new(event_type, "item", entity_id, data, "catalog-store");
        // Audit is best-effort; a full events table must not block edits
        let _ = insert_event(&self.conn, &event);
    }
}

impl CatalogStore for SqliteStore {
    fn fetch_tree(&self) -> Result<CatalogTree, StoreError> {
        let mut tree = CatalogTree::new();

        let mut stmt = self
            .conn
            .prepare("SELECT key, name FROM categories")
            .map_err(|e| StoreError::new("fetch_tree", e))?;
        let categories = stmt
            .query_map([], |row| {
                let key: String = row.get(0)?;
                let name: String = row.get(1)?;
                Ok((key, name))
            })
            .map_err(|e| StoreError::new("fetch_tree", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::new("fetch_tree", e))?;

        for (key, name) in categories {
            tree.insert(key, Category::new(&name));
        }

        let mut stmt = self
            .conn
            .prepare("SELECT category_key, item_key, record FROM items")
            .map_err(|e| StoreError::new("fetch_tree", e))?;
        let items = stmt
            .query_map([], |row| {
                let category_key: String = row.get(0)?;
                let item_key: String = row.get(1)?;
                let record_json: String = row.get(2)?;
                Ok((category_key, item_key, record_json))
            })
            .map_err(|e| StoreError::new("fetch_tree", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::new("fetch_tree", e))?;

        for (category_key, item_key, record_json) in items {
            let record: Item = serde_json::from_str(&record_json)
                .map_err(|e| StoreError::new("fetch_tree", e))?;
            tree.entry(category_key)
                .or_insert_with(Category::default)
                .items
                .insert(item_key, record);
        }

        Ok(tree)
    }

    fn write_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
        record: &Item,
    ) -> Result<(), StoreError> {
        let record_json =
            serde_json::to_string(record).map_err(|e| StoreError::new("write_item", e))?;

        self.conn
            .execute(
                "INSERT INTO items (category_key, item_key, record)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(category_key, item_key) DO UPDATE SET record = excluded.record",
                params![category_key, item_key, record_json],
            )
            .map_err(|e| StoreError::new("write_item", e))?;

        self.log_event(
            "item_written",
            &format!("{}/{}", category_key, item_key),
            serde_json::json!({
                "name": record.name,
                "category": record.category,
                "price": record.price,
            }),
        );

        Ok(())
    }

    fn delete_item(
        &mut self,
        category_key: &CategoryKey,
        item_key: &ItemKey,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "DELETE FROM items WHERE category_key = ?1 AND item_key = ?2",
                params![category_key, item_key],
            )
            .map_err(|e| StoreError::new("delete_item", e))?;

        self.log_event(
            "item_deleted",
            &format!("{}/{}", category_key, item_key),
            serde_json::json!({}),
        );

        Ok(())
    }

    fn write_category(
        &mut self,
        category_key: &CategoryKey,
        name: &str,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO categories (key, name)
                 VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET name = excluded.name",
                params![category_key, name],
            )
            .map_err(|e| StoreError::new("write_category", e))?;

        Ok(())
    }
}

/// Audit trail entry: every catalog mutation is an event.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS items (
            category_key TEXT NOT NULL,
            item_key TEXT NOT NULL,
            record TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (category_key, item_key)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_key)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

// ============================================================================
// CSV SEEDING
// ============================================================================

/// One row of a catalog seed file.
#[derive(Debug, Deserialize)]
pub struct SeedRow {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Price")]
    pub price: f64,

    #[serde(rename = "Color")]
    pub color: String,

    #[serde(rename = "Origin")]
    pub origin: String,

    #[serde(rename = "Weight")]
    pub weight: u32,

    #[serde(rename = "Rating")]
    pub rating: String,

    #[serde(rename = "Image")]
    pub image: String,

    #[serde(rename = "Category")]
    pub category: String,
}

pub fn load_seed_csv(csv_path: &Path) -> Result<Vec<SeedRow>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open seed CSV")?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: SeedRow = result.context("Failed to deserialize seed row")?;
        rows.push(row);
    }

    Ok(rows)
}

/// Load seed rows into a store, creating categories on demand.
///
/// Categories are matched by display name against what the store already
/// holds; rows whose category exists reuse it. Returns (categories created,
/// items written).
pub fn seed_catalog<S: CatalogStore>(store: &mut S, rows: &[SeedRow]) -> Result<(usize, usize)> {
    let tree = store.fetch_tree()?;

    let mut keys_by_name: std::collections::BTreeMap<String, CategoryKey> = tree
        .iter()
        .map(|(key, category)| (category.name.clone(), key.clone()))
        .collect();

    let mut categories_created = 0;
    let mut items_written = 0;

    for row in rows {
        let category_key = match keys_by_name.get(&row.category) {
            Some(key) => key.clone(),
            None => {
                let key = crate::catalog::fresh_key();
                store.write_category(&key, &row.category)?;
                keys_by_name.insert(row.category.clone(), key.clone());
                categories_created += 1;
                key
            }
        };

        let record = Item {
            name: row.name.clone(),
            price: row.price,
            color: row.color.clone(),
            origin: row.origin.clone(),
            weight: row.weight,
            rating: row.rating.clone(),
            image: row.image.clone(),
            category: row.category.clone(),
            is_top_of_week: false,
        };

        store.push_item(&category_key, &record)?;
        items_written += 1;
    }

    Ok((categories_created, items_written))
}

// ============================================================================
// TESTS
// ============================================================================

// 💚 Device-Local Store - favorites list + session username
// The on-device companion to the remote catalog: a small JSON file,
// loaded once at open, flushed on every mutation. It never talks to the
// category tree; removing a catalog item does not touch favorites.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::Item;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalData {
    /// Full item records, keyed by item name when searched.
    #[serde(default)]
    favorites: Vec<Item>,

    /// Username of the signed-in session, if any.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

/// Local key-value store backing the favorites screen and login session.
///
/// Lifecycle: loaded at construction, flushed to disk on each mutation.
/// Readers see the in-memory copy; there is no cross-process coordination.
pub struct LocalStore {
    path: PathBuf,
    data: LocalData,
}

impl LocalStore {
    /// Open the store at `path`, creating an empty one if the file is
    /// missing. Unreadable content starts fresh rather than failing —
    /// this is a device-local cache, and the app tolerates losing it.
    pub fn open(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => LocalData::default(),
        };

        Ok(LocalStore {
            path: path.to_path_buf(),
            data,
        })
    }

    fn flush(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write local store at {:?}", self.path))?;
        Ok(())
    }

    // ========================================================================
    // FAVORITES
    // ========================================================================

    pub fn favorites(&self) -> &[Item] {
        &self.data.favorites
    }

    /// Whether any favorite carries this item name.
    pub fn is_favorite(&self, name: &str) -> bool {
        self.data.favorites.iter().any(|item| item.name == name)
    }

    /// Add the record to favorites. No-op if an entry with the same name
    /// is already present; returns whether anything changed.
    pub fn add_favorite(&mut self, item: &Item) -> Result<bool> {
        if self.is_favorite(&item.name) {
            return Ok(false);
        }

        self.data.favorites.push(item.clone());
        self.flush()?;
        Ok(true)
    }

    /// Remove every favorite with this name (names are the de facto key;
    /// duplicates all go). Returns whether anything changed.
    pub fn remove_favorite(&mut self, name: &str) -> Result<bool> {
        let before = self.data.favorites.len();
        self.data.favorites.retain(|item| item.name != name);

        if self.data.favorites.len() == before {
            return Ok(false);
        }

        self.flush()?;
        Ok(true)
    }

    /// The detail screen's favorite button: add if absent, remove if
    /// present. Returns whether the item is a favorite afterwards.
    pub fn toggle_favorite(&mut self, item: &Item) -> Result<bool> {
        if self.is_favorite(&item.name) {
            self.remove_favorite(&item.name)?;
            Ok(false)
        } else {
            self.add_favorite(item)?;
            Ok(true)
        }
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    pub fn session_user(&self) -> Option<&str> {
        self.data.user.as_deref()
    }

    pub fn set_session_user(&mut self, username: &str) -> Result<()> {
        self.data.user = Some(username.to_string());
        self.flush()
    }

    pub fn clear_session_user(&mut self) -> Result<()> {
        self.data.user = None;
        self.flush()
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
            price: 10.0,
            color: "White".to_string(),
            origin: "Vietnam".to_string(),
            weight: 250,
            rating: "4.5".to_string(),
            image: "https://example.com/orchid.jpg".to_string(),
            category: "Orchids".to_string(),
            is_top_of_week: false,
        }
    }

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir().join(format!("favorites-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let path = temp_store_path();
        let store = LocalStore::open(&path).unwrap();

        assert!(store.favorites().is_empty());
        assert!(store.session_user().is_none());
    }

    #[test]
    fn test_add_remove_favorite() {
        let path = temp_store_path();
        let mut store = LocalStore::open(&path).unwrap();

        assert!(store.add_favorite(&sample_item("Phal")).unwrap());
        assert!(store.is_favorite("Phal"));

        // Adding again changes nothing
        assert!(!store.add_favorite(&sample_item("Phal")).unwrap());
        assert_eq!(store.favorites().len(), 1);

        assert!(store.remove_favorite("Phal").unwrap());
        assert!(!store.is_favorite("Phal"));
        assert!(!store.remove_favorite("Phal").unwrap());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_toggle_favorite() {
        let path = temp_store_path();
        let mut store = LocalStore::open(&path).unwrap();

        assert!(store.toggle_favorite(&sample_item("Phal")).unwrap());
        assert!(!store.toggle_favorite(&sample_item("Phal")).unwrap());
        assert!(store.favorites().is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_mutations_persist_across_reopen() {
        let path = temp_store_path();

        {
            let mut store = LocalStore::open(&path).unwrap();
            store.add_favorite(&sample_item("Phal")).unwrap();
            store.set_session_user("boo").unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert!(store.is_favorite("Phal"));
        assert_eq!(store.session_user(), Some("boo"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_clear_session_user() {
        let path = temp_store_path();
        let mut store = LocalStore::open(&path).unwrap();

        store.set_session_user("boo").unwrap();
        store.clear_session_user().unwrap();
        assert!(store.session_user().is_none());

        let reopened = LocalStore::open(&path).unwrap();
        assert!(reopened.session_user().is_none());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = temp_store_path();
        std::fs::write(&path, "not json at all {").unwrap();

        let store = LocalStore::open(&path).unwrap();
        assert!(store.favorites().is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_remove_favorite_drops_duplicate_names() {
        let path = temp_store_path();
        let mut store = LocalStore::open(&path).unwrap();

        store.add_favorite(&sample_item("Phal")).unwrap();
        // A same-named record sneaks in through a stale snapshot
        store.data.favorites.push(sample_item("Phal"));

        assert!(store.remove_favorite("Phal").unwrap());
        assert!(store.favorites().is_empty());

        std::fs::remove_file(&path).ok();
    }
}

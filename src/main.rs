use anyhow::{bail, Result};
use std::env;
use std::path::{Path, PathBuf};

// Use library instead of local modules
use orchid_catalog::{item_count, load_seed_csv, seed_catalog, CatalogStore, SqliteStore};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => {
            let csv_path = match args.get(2) {
                Some(p) => PathBuf::from(p),
                None => bail!("usage: orchid-catalog seed <csv> [db]"),
            };
            run_seed(&csv_path, &db_path(args.get(3)))?;
        }
        Some("list") | None => {
            run_list(&db_path(args.get(2)))?;
        }
        Some(other) => {
            eprintln!("Unknown mode: {}", other);
            eprintln!("Usage: orchid-catalog [seed <csv> [db] | list [db]]");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Default database path, overridable per invocation.
fn db_path(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| env::var("ORCHIDS_DB").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("orchids.db"))
}

fn run_seed(csv_path: &Path, db_path: &Path) -> Result<()> {
    println!("🌸 Orchid Catalog - Seed Import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading seed CSV...");
    let rows = load_seed_csv(csv_path)?;
    println!("✓ Loaded {} rows from {:?}", rows.len(), csv_path);

    // 2. Open database
    println!("\n🔧 Opening catalog database...");
    let mut store = SqliteStore::open(db_path)?;
    println!("✓ Database ready at {:?} (WAL mode)", db_path);

    // 3. Write catalog
    println!("\n💾 Writing catalog...");
    let (categories_created, items_written) = seed_catalog(&mut store, &rows)?;
    println!("✓ Created {} categories", categories_created);
    println!("✓ Wrote {} items", items_written);

    // 4. Verify
    let tree = store.fetch_tree()?;
    println!(
        "\n✅ Catalog now holds {} categories, {} items",
        tree.len(),
        item_count(&tree)
    );

    Ok(())
}

fn run_list(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        eprintln!("❌ Catalog database not found at {:?}", db_path);
        eprintln!("   Run: orchid-catalog seed <csv>");
        eprintln!("   to create one first.");
        std::process::exit(1);
    }

    let store = SqliteStore::open(db_path)?;
    let tree = store.fetch_tree()?;

    if tree.is_empty() {
        println!("(catalog is empty)");
        return Ok(());
    }

    for category in tree.values() {
        println!("📁 {} ({} items)", category.name, category.items.len());
        for item in category.items.values() {
            println!(
                "   🌸 {} — ${:.2}, {}, {}, {}g, rating {}",
                item.name, item.price, item.color, item.origin, item.weight, item.rating
            );
        }
    }

    Ok(())
}

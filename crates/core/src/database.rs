use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{named_params, Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;

use crate::config::AppConfig;
use crate::model::{Category, CategoryDraft, CategoryId, CategoryRef, Item, ItemDraft, ItemId};

const ITEM_COLUMNS: &str =
    "id, title, description, completed, category_id, created_at, last_modified";
const CATEGORY_COLUMNS: &str = "id, name, color, description, created_at, last_modified";

/// Storage failures callers are expected to tell apart from plain I/O errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("a category named '{0}' already exists")]
    DuplicateCategory(String),
    #[error("category {0} does not exist")]
    MissingCategory(CategoryId),
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path()).with_context(|| {
            format!("Failed to open database at {}", config.db_path().display())
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to configure SQLite connection")?;

        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    pub fn list_items(&self, owner: &str) -> Result<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE owner = ? ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map([owner], map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn list_items_by_category(&self, owner: &str, category: CategoryId) -> Result<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE owner = ? AND category_id = ? ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(rusqlite::params![owner, category.0], map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn fetch_item(&self, owner: &str, id: ItemId) -> Result<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE owner = ? AND id = ? LIMIT 1");
        let item = self
            .conn
            .query_row(&sql, rusqlite::params![owner, id.0], map_item)
            .optional()?;
        Ok(item)
    }

    pub fn insert_item(&self, owner: &str, draft: &ItemDraft) -> Result<Item> {
        let category = self.owned_category(owner, draft.category)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO items (owner, title, description, completed, category_id, created_at, last_modified)
             VALUES (:owner, :title, :description, :completed, :category_id, :now, :now)",
            named_params! {
                ":owner": owner,
                ":title": &draft.title,
                ":description": draft.description.as_deref(),
                ":completed": draft.completed,
                ":category_id": category,
                ":now": now,
            },
        )?;
        let id = ItemId(self.conn.last_insert_rowid());
        self.fetch_item(owner, id)?
            .with_context(|| format!("Inserted item {id} could not be read back"))
    }

    /// Overwrite every mutable field; identity and creation time are kept. `None` when no such
    /// item exists for `owner`.
    pub fn update_item(&self, owner: &str, id: ItemId, item: &Item) -> Result<Option<Item>> {
        let category = self.owned_category(owner, item.category)?;
        let updated = self.conn.execute(
            "UPDATE items SET
                title = :title,
                description = :description,
                completed = :completed,
                category_id = :category_id,
                last_modified = :now
             WHERE owner = :owner AND id = :id",
            named_params! {
                ":title": &item.title,
                ":description": item.description.as_deref(),
                ":completed": item.completed,
                ":category_id": category,
                ":now": Utc::now().to_rfc3339(),
                ":owner": owner,
                ":id": id.0,
            },
        )?;
        if updated == 0 {
            return Ok(None);
        }
        self.fetch_item(owner, id)
    }

    pub fn delete_item(&self, owner: &str, id: ItemId) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM items WHERE owner = :owner AND id = :id",
            named_params! { ":owner": owner, ":id": id.0 },
        )?;
        Ok(affected > 0)
    }

    pub fn list_categories(&self, owner: &str) -> Result<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE owner = ? ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let categories = stmt
            .query_map([owner], map_category)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn fetch_category(&self, owner: &str, id: CategoryId) -> Result<Option<Category>> {
        let sql =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE owner = ? AND id = ? LIMIT 1");
        let category = self
            .conn
            .query_row(&sql, rusqlite::params![owner, id.0], map_category)
            .optional()?;
        Ok(category)
    }

    pub fn insert_category(&self, owner: &str, draft: &CategoryDraft) -> Result<Category> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO categories (owner, name, color, description, created_at, last_modified)
                 VALUES (:owner, :name, :color, :description, :now, :now)",
                named_params! {
                    ":owner": owner,
                    ":name": &draft.name,
                    ":color": draft.color.as_deref(),
                    ":description": draft.description.as_deref(),
                    ":now": now,
                },
            )
            .map_err(|err| unique_name_violation(err, &draft.name))?;
        let id = CategoryId(self.conn.last_insert_rowid());
        self.fetch_category(owner, id)?
            .with_context(|| format!("Inserted category {id} could not be read back"))
    }

    pub fn update_category(
        &self,
        owner: &str,
        id: CategoryId,
        category: &Category,
    ) -> Result<Option<Category>> {
        let updated = self
            .conn
            .execute(
                "UPDATE categories SET
                    name = :name,
                    color = :color,
                    description = :description,
                    last_modified = :now
                 WHERE owner = :owner AND id = :id",
                named_params! {
                    ":name": &category.name,
                    ":color": category.color.as_deref(),
                    ":description": category.description.as_deref(),
                    ":now": Utc::now().to_rfc3339(),
                    ":owner": owner,
                    ":id": id.0,
                },
            )
            .map_err(|err| unique_name_violation(err, &category.name))?;
        if updated == 0 {
            return Ok(None);
        }
        self.fetch_category(owner, id)
    }

    /// Items that referenced the category become uncategorized.
    pub fn delete_category(&self, owner: &str, id: CategoryId) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM categories WHERE owner = :owner AND id = :id",
            named_params! { ":owner": owner, ":id": id.0 },
        )?;
        Ok(affected > 0)
    }

    fn owned_category(&self, owner: &str, category: Option<CategoryRef>) -> Result<Option<i64>> {
        let Some(CategoryRef { id }) = category else {
            return Ok(None);
        };
        if self.fetch_category(owner, id)?.is_none() {
            return Err(StorageError::MissingCategory(id).into());
        }
        Ok(Some(id.0))
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                color TEXT,
                description TEXT,
                created_at TEXT NOT NULL,
                last_modified TEXT NOT NULL,
                UNIQUE (owner, name)
             );
             CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                last_modified TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner);
             CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_id);
            ",
        )?;
        Ok(())
    }
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: ItemId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get(3)?,
        category: row
            .get::<_, Option<i64>>(4)?
            .map(|id| CategoryRef::from(CategoryId(id))),
        created_at: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: CategoryId(row.get(0)?),
        name: row.get(1)?,
        color: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        last_modified: row.get(5)?,
    })
}

fn unique_name_violation(err: rusqlite::Error, name: &str) -> anyhow::Error {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => {
            StorageError::DuplicateCategory(name.to_string()).into()
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (config, dir)
    }

    #[test]
    fn insert_and_fetch_item_roundtrip() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");

        let created = db
            .insert_item("alice", &ItemDraft::new("Buy milk").with_description("2 liters"))
            .expect("insert item");

        assert_eq!(created.title, "Buy milk");
        assert_eq!(created.description.as_deref(), Some("2 liters"));
        assert!(!created.completed);
        assert!(created.created_at.is_some());
        assert_eq!(created.created_at, created.last_modified);
        assert_eq!(db.fetch_item("alice", created.id).unwrap(), Some(created));
    }

    #[test]
    fn migrations_create_only_entity_tables() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");

        let mut stmt = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(tables, vec!["categories", "items"]);
    }

    #[test]
    fn rows_are_scoped_by_owner() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");

        let mine = db.insert_item("alice", &ItemDraft::new("Mine")).unwrap();
        db.insert_item("bob", &ItemDraft::new("Theirs")).unwrap();

        let titles: Vec<_> = db
            .list_items("alice")
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, vec!["Mine"]);
        assert_eq!(db.fetch_item("bob", mine.id).unwrap(), None);
        assert!(!db.delete_item("bob", mine.id).unwrap());
        assert_eq!(db.update_item("bob", mine.id, &mine).unwrap(), None);
    }

    #[test]
    fn update_item_keeps_creation_time() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let created = db.insert_item("alice", &ItemDraft::new("Report")).unwrap();

        let mut edited = created.clone();
        edited.title = "Quarterly report".into();
        edited.completed = true;
        let stored = db
            .update_item("alice", created.id, &edited)
            .unwrap()
            .expect("item exists");

        assert_eq!(stored.title, "Quarterly report");
        assert!(stored.completed);
        assert_eq!(stored.created_at, created.created_at);
    }

    #[test]
    fn duplicate_category_names_conflict_per_owner() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        db.insert_category("alice", &CategoryDraft::new("Work")).unwrap();

        let err = db
            .insert_category("alice", &CategoryDraft::new("Work"))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::DuplicateCategory("Work".into()))
        );
        assert!(db.insert_category("bob", &CategoryDraft::new("Work")).is_ok());
    }

    #[test]
    fn deleting_category_clears_item_references() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let work = db.insert_category("alice", &CategoryDraft::new("Work")).unwrap();
        let report = db
            .insert_item("alice", &ItemDraft::new("Report").with_category(work.id))
            .unwrap();
        assert_eq!(
            db.list_items_by_category("alice", work.id).unwrap().len(),
            1
        );

        assert!(db.delete_category("alice", work.id).unwrap());

        let report = db.fetch_item("alice", report.id).unwrap().expect("item kept");
        assert_eq!(report.category, None);
        assert!(db.list_categories("alice").unwrap().is_empty());
    }

    #[test]
    fn items_cannot_reference_foreign_categories() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let theirs = db.insert_category("bob", &CategoryDraft::new("Garage")).unwrap();

        let err = db
            .insert_item("alice", &ItemDraft::new("Fix bike").with_category(theirs.id))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::MissingCategory(theirs.id))
        );
    }
}

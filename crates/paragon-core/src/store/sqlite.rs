//! SQLite-backed store.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::{PantryError, StoreError};
use crate::models::pantry::{PantryItem, PantryStatus};
use crate::models::product::{Category, CategoryId, NewProduct, Product, ProductAlias, ProductId};

use super::{ProductStore, StoreResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized_name TEXT NOT NULL UNIQUE,
    category_id INTEGER REFERENCES categories(id),
    unit TEXT,
    typical_shelf_life_days INTEGER,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS product_aliases (
    raw_name TEXT PRIMARY KEY,
    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS pantry_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(id),
    quantity TEXT NOT NULL,
    unit TEXT,
    purchase_date TEXT NOT NULL,
    expiration_date TEXT,
    status TEXT NOT NULL DEFAULT 'in_stock'
);

CREATE INDEX IF NOT EXISTS idx_aliases_product_id ON product_aliases(product_id);
CREATE INDEX IF NOT EXISTS idx_pantry_status ON pantry_items(status);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Product store on a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened product database");
        Self::init(conn)
    }

    /// Fresh in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("database lock poisoned".to_string()))
    }

    fn load_product(conn: &Connection, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(conn
            .query_row(
                "SELECT id, normalized_name, category_id, unit, typical_shelf_life_days
                 FROM products WHERE id = ?1",
                params![id],
                product_from_row,
            )
            .optional()?)
    }
}

impl ProductStore for SqliteStore {
    fn find_alias(&self, raw_name: &str) -> StoreResult<Option<ProductAlias>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT raw_name, product_id FROM product_aliases WHERE raw_name = ?1",
                params![raw_name],
                |row| {
                    Ok(ProductAlias {
                        raw_name: row.get(0)?,
                        product_id: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let conn = self.conn()?;
        Self::load_product(&conn, id)
    }

    fn products(&self) -> StoreResult<Vec<Product>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, normalized_name, category_id, unit, typical_shelf_life_days
             FROM products ORDER BY id",
        )?;
        let rows = stmt.query_map([], product_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_product(&self, product: &NewProduct) -> StoreResult<Product> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO products (normalized_name, unit, typical_shelf_life_days) VALUES (?1, ?2, ?3)",
            params![product.normalized_name, product.unit, product.typical_shelf_life_days],
        )
        .map_err(|e| write_error(e, "product", &product.normalized_name, None))?;

        Ok(Product {
            id: conn.last_insert_rowid(),
            normalized_name: product.normalized_name.clone(),
            category_id: None,
            unit: product.unit.clone(),
            typical_shelf_life_days: product.typical_shelf_life_days,
        })
    }

    fn insert_alias(&self, raw_name: &str, product_id: ProductId) -> StoreResult<ProductAlias> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO product_aliases (raw_name, product_id) VALUES (?1, ?2)",
            params![raw_name, product_id],
        )
        .map_err(|e| write_error(e, "alias", raw_name, Some(("product", product_id))))?;

        Ok(ProductAlias {
            raw_name: raw_name.to_string(),
            product_id,
        })
    }

    fn category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name FROM categories WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn find_or_create_category(&self, name: &str) -> StoreResult<Category> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
            params![name],
        )?;
        Ok(conn.query_row(
            "SELECT id, name FROM categories WHERE name = ?1",
            params![name],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?)
    }

    fn set_product_category(&self, product_id: ProductId, category_id: CategoryId) -> StoreResult<Product> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE products SET category_id = ?1 WHERE id = ?2",
                params![category_id, product_id],
            )
            .map_err(|e| write_error(e, "product", &product_id.to_string(), Some(("category", category_id))))?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "product",
                id: product_id,
            });
        }

        Self::load_product(&conn, product_id)?.ok_or(StoreError::NotFound {
            entity: "product",
            id: product_id,
        })
    }

    fn insert_pantry_item(&self, item: &PantryItem) -> StoreResult<PantryItem> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pantry_items (product_id, quantity, unit, purchase_date, expiration_date, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.product_id,
                item.quantity.to_string(),
                item.unit,
                item.purchase_date.format(DATE_FORMAT).to_string(),
                item.expiration_date.map(|d| d.format(DATE_FORMAT).to_string()),
                item.status.as_str(),
            ],
        )
        .map_err(|e| write_error(e, "pantry item", &item.product_id.to_string(), Some(("product", item.product_id))))?;

        Ok(PantryItem {
            id: Some(conn.last_insert_rowid()),
            ..item.clone()
        })
    }

    fn pantry_item(&self, id: i64) -> StoreResult<Option<PantryItem>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, product_id, quantity, unit, purchase_date, expiration_date, status
                 FROM pantry_items WHERE id = ?1",
                params![id],
                pantry_from_row,
            )
            .optional()?)
    }

    fn update_pantry_item(&self, item: &PantryItem) -> StoreResult<()> {
        let id = item.id.ok_or(StoreError::NotFound { entity: "pantry item", id: 0 })?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE pantry_items SET quantity = ?1, status = ?2 WHERE id = ?3",
            params![item.quantity.to_string(), item.status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound { entity: "pantry item", id });
        }
        Ok(())
    }

    fn pantry_items(&self) -> StoreResult<Vec<PantryItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, product_id, quantity, unit, purchase_date, expiration_date, status
             FROM pantry_items ORDER BY id",
        )?;
        let rows = stmt.query_map([], pantry_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Map a failed write: UNIQUE/PRIMARY KEY violations become `Conflict`,
/// foreign-key violations `NotFound` on the referenced row.
fn write_error(
    err: rusqlite::Error,
    entity: &'static str,
    key: &str,
    reference: Option<(&'static str, i64)>,
) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return StoreError::Conflict {
                        entity,
                        key: key.to_string(),
                    };
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    if let Some((entity, id)) = reference {
                        return StoreError::NotFound { entity, id };
                    }
                }
                _ => {}
            }
        }
    }
    StoreError::from(err)
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        normalized_name: row.get(1)?,
        category_id: row.get(2)?,
        unit: row.get(3)?,
        typical_shelf_life_days: row.get(4)?,
    })
}

fn pantry_from_row(row: &Row<'_>) -> rusqlite::Result<PantryItem> {
    let quantity: String = row.get(2)?;
    let purchase_date: String = row.get(4)?;
    let expiration_date: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;

    Ok(PantryItem {
        id: Some(row.get(0)?),
        product_id: row.get(1)?,
        quantity: Decimal::from_str(&quantity).map_err(|e| conversion_error(2, e))?,
        unit: row.get(3)?,
        purchase_date: NaiveDate::parse_from_str(&purchase_date, DATE_FORMAT)
            .map_err(|e| conversion_error(4, e))?,
        expiration_date: expiration_date
            .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
            .transpose()
            .map_err(|e| conversion_error(5, e))?,
        status: PantryStatus::from_str(&status)
            .ok_or_else(|| conversion_error(6, PantryError::UnknownStatus(status.clone())))?,
    })
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn test_product_uniqueness() {
        conformance::product_uniqueness(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_alias_uniqueness() {
        conformance::alias_uniqueness(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_categories() {
        conformance::categories(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_pantry_round_trip() {
        conformance::pantry_round_trip(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let product = store.insert_product(&NewProduct::named("Kefir")).unwrap();
        let item = PantryItem {
            id: None,
            product_id: product.id,
            quantity: Decimal::ONE,
            unit: None,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            expiration_date: None,
            status: PantryStatus::Consumed,
        };
        let id = store.insert_pantry_item(&item).unwrap().id.unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE pantry_items SET status = 'zjedzone' WHERE id = ?1", params![id])
            .unwrap();

        let err = store.pantry_item(id).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("zjedzone"));
        assert!(store.pantry_items().is_err());
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paragon.db");
        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_product(&NewProduct::named("Masło")).unwrap().id
        };
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.product(id).unwrap().unwrap().normalized_name, "Masło");
    }
}

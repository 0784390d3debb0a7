//! Persistence seam for products, aliases, categories and pantry entries.
//!
//! Uniqueness of product names, alias names and category names is enforced
//! by the store; a losing concurrent writer gets [`StoreError::Conflict`].

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::models::pantry::PantryItem;
use crate::models::product::{Category, CategoryId, NewProduct, Product, ProductAlias, ProductId};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage for canonical products and pantry entries.
pub trait ProductStore: Send + Sync {
    /// Alias with exactly this raw name.
    fn find_alias(&self, raw_name: &str) -> StoreResult<Option<ProductAlias>>;

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// All products, ordered by id.
    fn products(&self) -> StoreResult<Vec<Product>>;

    /// Insert a product; `Conflict` when the name is taken.
    fn insert_product(&self, product: &NewProduct) -> StoreResult<Product>;

    /// Bind a raw name to a product; `Conflict` when the alias exists.
    fn insert_alias(&self, raw_name: &str, product_id: ProductId) -> StoreResult<ProductAlias>;

    fn category(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    fn find_or_create_category(&self, name: &str) -> StoreResult<Category>;

    fn set_product_category(&self, product_id: ProductId, category_id: CategoryId) -> StoreResult<Product>;

    /// Persist a new pantry entry and return it with its id.
    fn insert_pantry_item(&self, item: &PantryItem) -> StoreResult<PantryItem>;

    fn pantry_item(&self, id: i64) -> StoreResult<Option<PantryItem>>;

    /// Write back quantity and status of a stored entry.
    fn update_pantry_item(&self, item: &PantryItem) -> StoreResult<()>;

    /// All pantry entries, ordered by id.
    fn pantry_items(&self) -> StoreResult<Vec<PantryItem>>;
}

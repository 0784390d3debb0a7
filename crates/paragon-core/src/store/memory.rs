//! In-process store with the same uniqueness rules as the database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::pantry::PantryItem;
use crate::models::product::{Category, CategoryId, NewProduct, Product, ProductAlias, ProductId};

use super::{ProductStore, StoreResult};

#[derive(Debug, Default)]
struct State {
    products: Vec<Product>,
    aliases: HashMap<String, ProductId>,
    categories: Vec<Category>,
    pantry: Vec<PantryItem>,
}

impl State {
    fn product_mut(&mut self, id: ProductId) -> StoreResult<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound { entity: "product", id })
    }
}

/// Mutex-guarded maps; ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl ProductStore for MemoryStore {
    fn find_alias(&self, raw_name: &str) -> StoreResult<Option<ProductAlias>> {
        let state = self.state()?;
        Ok(state.aliases.get(raw_name).map(|&product_id| ProductAlias {
            raw_name: raw_name.to_string(),
            product_id,
        }))
    }

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let state = self.state()?;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.state()?.products.clone())
    }

    fn insert_product(&self, product: &NewProduct) -> StoreResult<Product> {
        let mut state = self.state()?;
        if state
            .products
            .iter()
            .any(|p| p.normalized_name == product.normalized_name)
        {
            return Err(StoreError::Conflict {
                entity: "product",
                key: product.normalized_name.clone(),
            });
        }

        let created = Product {
            id: state.products.len() as ProductId + 1,
            normalized_name: product.normalized_name.clone(),
            category_id: None,
            unit: product.unit.clone(),
            typical_shelf_life_days: product.typical_shelf_life_days,
        };
        state.products.push(created.clone());
        Ok(created)
    }

    fn insert_alias(&self, raw_name: &str, product_id: ProductId) -> StoreResult<ProductAlias> {
        let mut state = self.state()?;
        if state.aliases.contains_key(raw_name) {
            return Err(StoreError::Conflict {
                entity: "alias",
                key: raw_name.to_string(),
            });
        }
        state.product_mut(product_id)?;

        state.aliases.insert(raw_name.to_string(), product_id);
        Ok(ProductAlias {
            raw_name: raw_name.to_string(),
            product_id,
        })
    }

    fn category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let state = self.state()?;
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    fn find_or_create_category(&self, name: &str) -> StoreResult<Category> {
        let mut state = self.state()?;
        if let Some(existing) = state.categories.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }

        let created = Category {
            id: state.categories.len() as CategoryId + 1,
            name: name.to_string(),
        };
        state.categories.push(created.clone());
        Ok(created)
    }

    fn set_product_category(&self, product_id: ProductId, category_id: CategoryId) -> StoreResult<Product> {
        let mut state = self.state()?;
        if !state.categories.iter().any(|c| c.id == category_id) {
            return Err(StoreError::NotFound {
                entity: "category",
                id: category_id,
            });
        }

        let product = state.product_mut(product_id)?;
        product.category_id = Some(category_id);
        Ok(product.clone())
    }

    fn insert_pantry_item(&self, item: &PantryItem) -> StoreResult<PantryItem> {
        let mut state = self.state()?;
        state.product_mut(item.product_id)?;

        let stored = PantryItem {
            id: Some(state.pantry.len() as i64 + 1),
            ..item.clone()
        };
        state.pantry.push(stored.clone());
        Ok(stored)
    }

    fn pantry_item(&self, id: i64) -> StoreResult<Option<PantryItem>> {
        let state = self.state()?;
        Ok(state.pantry.iter().find(|p| p.id == Some(id)).cloned())
    }

    fn update_pantry_item(&self, item: &PantryItem) -> StoreResult<()> {
        let id = item.id.ok_or(StoreError::NotFound { entity: "pantry item", id: 0 })?;
        let mut state = self.state()?;
        let stored = state
            .pantry
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or(StoreError::NotFound { entity: "pantry item", id })?;
        stored.quantity = item.quantity;
        stored.status = item.status;
        Ok(())
    }

    fn pantry_items(&self) -> StoreResult<Vec<PantryItem>> {
        Ok(self.state()?.pantry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn test_product_uniqueness() {
        conformance::product_uniqueness(&MemoryStore::new());
    }

    #[test]
    fn test_alias_uniqueness() {
        conformance::alias_uniqueness(&MemoryStore::new());
    }

    #[test]
    fn test_categories() {
        conformance::categories(&MemoryStore::new());
    }

    #[test]
    fn test_pantry_round_trip() {
        conformance::pantry_round_trip(&MemoryStore::new());
    }

    #[test]
    fn test_concurrent_creation_has_one_winner() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.insert_product(&NewProduct::named("Masło")).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.products().unwrap().len(), 1);
    }
}

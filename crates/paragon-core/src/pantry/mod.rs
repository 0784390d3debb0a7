//! Pantry entries for resolved purchases.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::models::config::PantryConfig;
use crate::models::pantry::{PantryItem, PantryStatus};
use crate::models::product::{Category, CategoryKind, Product};
use crate::models::receipt::ParsedItem;

/// Where a shelf-life estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfLifeSource {
    Product,
    Category,
    Default,
}

/// Creates pantry entries with an expiration estimate.
#[derive(Debug, Clone)]
pub struct PantryLifecycle {
    default_shelf_life_days: i64,
}

impl PantryLifecycle {
    pub fn new() -> Self {
        Self::from_config(&PantryConfig::default())
    }

    pub fn from_config(config: &PantryConfig) -> Self {
        Self {
            default_shelf_life_days: config.default_shelf_life_days,
        }
    }

    /// Shelf life in days: the product's own value, else the category table,
    /// else the configured default.
    pub fn shelf_life_days(&self, product: &Product, category: Option<&Category>) -> (i64, ShelfLifeSource) {
        if let Some(days) = product.typical_shelf_life_days {
            return (days, ShelfLifeSource::Product);
        }

        let from_category = category
            .and_then(|c| CategoryKind::from_name(&c.name))
            .and_then(|kind| kind.shelf_life_days());
        match from_category {
            Some(days) => (days, ShelfLifeSource::Category),
            None => (self.default_shelf_life_days, ShelfLifeSource::Default),
        }
    }

    /// A fresh `InStock` entry for one purchased item.
    pub fn create_entry(
        &self,
        product: &Product,
        category: Option<&Category>,
        item: &ParsedItem,
        purchase_date: NaiveDate,
    ) -> PantryItem {
        let (days, source) = self.shelf_life_days(product, category);
        let expiration_date = purchase_date.checked_add_days(Days::new(days.max(0) as u64));

        debug!(
            product = %product.normalized_name,
            days,
            source = ?source,
            expires = ?expiration_date,
            "Estimated shelf life"
        );

        PantryItem {
            id: None,
            product_id: product.id,
            quantity: item.quantity,
            unit: item.unit.clone().or_else(|| product.unit.clone()),
            purchase_date,
            expiration_date,
            status: PantryStatus::InStock,
        }
    }
}

impl Default for PantryLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

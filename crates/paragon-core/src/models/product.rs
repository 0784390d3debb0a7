//! Canonical product identity: products, aliases and categories.

use serde::{Deserialize, Serialize};

pub type ProductId = i64;
pub type CategoryId = i64;

/// A canonical product that many receipt spellings resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Canonical name, unique across products.
    pub normalized_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Explicit shelf life; overrides the category default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_shelf_life_days: Option<i64>,
}

/// Fields needed to create a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProduct {
    pub normalized_name: String,
    pub unit: Option<String>,
    pub typical_shelf_life_days: Option<i64>,
}

impl NewProduct {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            normalized_name: name.into(),
            ..Self::default()
        }
    }
}

/// A raw, as-printed name bound to exactly one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAlias {
    pub raw_name: String,
    pub product_id: ProductId,
}

/// A product category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// The fixed category enumeration offered to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Dairy,
    Bakery,
    FruitsVegetables,
    MeatFish,
    Frozen,
    Canned,
    DryGoods,
    Beverages,
    Sweets,
    Household,
    Other,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 11] = [
        CategoryKind::Dairy,
        CategoryKind::Bakery,
        CategoryKind::FruitsVegetables,
        CategoryKind::MeatFish,
        CategoryKind::Frozen,
        CategoryKind::Canned,
        CategoryKind::DryGoods,
        CategoryKind::Beverages,
        CategoryKind::Sweets,
        CategoryKind::Household,
        CategoryKind::Other,
    ];

    /// Name stored in the category table.
    pub fn name(&self) -> &'static str {
        match self {
            CategoryKind::Dairy => "Dairy",
            CategoryKind::Bakery => "Bakery",
            CategoryKind::FruitsVegetables => "Fruits & Vegetables",
            CategoryKind::MeatFish => "Meat & Fish",
            CategoryKind::Frozen => "Frozen",
            CategoryKind::Canned => "Canned & Preserved",
            CategoryKind::DryGoods => "Dry Goods",
            CategoryKind::Beverages => "Beverages",
            CategoryKind::Sweets => "Sweets & Snacks",
            CategoryKind::Household => "Household",
            CategoryKind::Other => "Other",
        }
    }

    /// Case-insensitive lookup by stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Typical days before an item of this category spoils.
    pub fn shelf_life_days(&self) -> Option<i64> {
        match self {
            CategoryKind::Dairy => Some(7),
            CategoryKind::Bakery => Some(2),
            CategoryKind::FruitsVegetables => Some(5),
            CategoryKind::MeatFish => Some(3),
            CategoryKind::Frozen => Some(90),
            CategoryKind::Canned => Some(365),
            CategoryKind::DryGoods => Some(180),
            CategoryKind::Beverages => Some(30),
            CategoryKind::Sweets => Some(90),
            CategoryKind::Household => Some(365),
            CategoryKind::Other => None,
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

//! Receipt data models shared by both extractors and the reconciliation engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::strategy::StoreKind;

/// Shop name used when neither extractor produced one.
pub const UNKNOWN_SHOP: &str = "unknown shop";

/// OCR output for a single receipt, as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReceipt {
    /// Raw OCR text.
    pub text: String,

    /// Where the text came from (usually a file name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<String>,
}

impl RawReceipt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_hint: None,
        }
    }

    pub fn with_source_hint(mut self, hint: impl Into<String>) -> Self {
        self.source_hint = Some(hint.into());
        self
    }

    /// Whether there is anything worth extracting.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A single purchased line as seen by one extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedItem {
    /// Name exactly as printed (after quantity/unit stripping).
    pub raw_name: String,

    /// Quantity; fractional for weighted goods.
    pub quantity: Decimal,

    /// Unit of measure (szt, kg, l, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Price per unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    /// Line total as printed.
    pub total_price: Decimal,

    /// Discount applied to this line.
    #[serde(default)]
    pub discount: Decimal,

    /// What was actually paid for the line.
    pub price_after_discount: Decimal,
}

impl ParsedItem {
    /// Create an item with quantity 1 and no discount.
    pub fn new(raw_name: impl Into<String>, total_price: Decimal) -> Self {
        Self {
            raw_name: raw_name.into(),
            quantity: Decimal::ONE,
            unit: None,
            unit_price: Some(total_price),
            total_price,
            discount: Decimal::ZERO,
            price_after_discount: total_price,
        }
    }

    pub fn with_quantity(mut self, quantity: Decimal, unit: Option<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit;
        self
    }

    pub fn with_unit_price(mut self, unit_price: Option<Decimal>) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// `quantity × unit_price`, when the unit price is known and the product fits.
    pub fn expected_total(&self) -> Option<Decimal> {
        self.unit_price
            .and_then(|price| self.quantity.checked_mul(price))
    }

    /// Whether the line carries a negative amount.
    pub fn is_negative(&self) -> bool {
        self.total_price.is_sign_negative() && !self.total_price.is_zero()
            || self
                .unit_price
                .is_some_and(|p| p.is_sign_negative() && !p.is_zero())
    }
}

/// Output of one extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    /// Seller NIP, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    #[serde(default)]
    pub items: Vec<ParsedItem>,

    /// Set when the extractor could not produce anything usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParsedReceipt {
    /// An empty receipt carrying only an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Sum of item totals, `None` if it overflows.
    pub fn items_total(&self) -> Option<Decimal> {
        checked_sum(self.items.iter().map(|i| i.total_price))
    }
}

/// Which extractor's item list was trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemsSource {
    Regex,
    Generative,
}

impl std::fmt::Display for ItemsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemsSource::Regex => write!(f, "regex"),
            ItemsSource::Generative => write!(f, "generative"),
        }
    }
}

/// The single merged receipt produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledReceipt {
    pub shop_name: String,
    pub purchase_date: NaiveDate,
    pub total_amount: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    pub items: Vec<ParsedItem>,
    pub items_source: ItemsSource,

    /// Retailer whose strategy post-processed the items.
    pub store: StoreKind,

    /// Diagnostics gathered along the way (advisory only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReconciledReceipt {
    /// Sum of what was paid per line, `None` if it overflows.
    pub fn items_paid(&self) -> Option<Decimal> {
        checked_sum(self.items.iter().map(|i| i.price_after_discount))
    }
}

/// Add up amounts without panicking on overflow.
pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
}

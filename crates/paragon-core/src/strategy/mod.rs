//! Store-specific receipt strategies.
//!
//! Each retailer gets a [`ReceiptStrategy`] supplying the generative prompt and
//! the item clean-up rules for its receipt layout. The selector picks one per
//! receipt from the raw OCR text.

mod auchan;
mod biedronka;
mod generic;
mod lidl;
mod rules;

pub use auchan::AuchanStrategy;
pub use biedronka::BiedronkaStrategy;
pub use generic::GenericStrategy;
pub use lidl::LidlStrategy;
pub use rules::{absorb_discount_lines, drop_garbage_lines, PostProcessRules};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::receipt::{ParsedItem, ParsedReceipt};

/// Instructions shared by every retailer prompt.
pub const BASE_PROMPT: &str = r#"You extract structured data from the OCR text of a Polish shop receipt (paragon fiskalny).
Return ONLY a JSON object, no markdown fences, no commentary, matching exactly:
{
  "shop_name": "string or null",
  "date": "YYYY-MM-DD or null",
  "total_amount": number or null,
  "items": [
    {"name": "string", "quantity": number, "price": number, "total_price": number}
  ]
}
Rules:
- "price" is the unit price, "total_price" is the line total as printed.
- Use a dot as the decimal separator in numbers.
- Weighted goods keep their fractional quantity (e.g. 0.365).
- Skip tax summaries (PTU/VAT), payment lines, change and footer text.
- Use null for values you cannot read."#;

/// Retailers with dedicated handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Lidl,
    Biedronka,
    Auchan,
    #[default]
    Generic,
}

lazy_static! {
    /// Ordered retailer detection table; first match wins.
    static ref STORE_PATTERNS: Vec<(StoreKind, Vec<Regex>)> = vec![
        (StoreKind::Lidl, vec![Regex::new(r"(?i)\blidl\b").unwrap()]),
        (
            StoreKind::Biedronka,
            vec![
                Regex::new(r"(?i)biedronka").unwrap(),
                Regex::new(r"(?i)jeronimo\s+martins").unwrap(),
            ],
        ),
        (StoreKind::Auchan, vec![Regex::new(r"(?i)auchan").unwrap()]),
    ];
}

impl StoreKind {
    /// Classify raw receipt text to a retailer.
    pub fn detect(text: &str) -> Self {
        STORE_PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(kind, _)| *kind)
            .unwrap_or(StoreKind::Generic)
    }

    /// Human-readable retailer name, `None` for unrecognised shops.
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            StoreKind::Lidl => Some("Lidl"),
            StoreKind::Biedronka => Some("Biedronka"),
            StoreKind::Auchan => Some("Auchan"),
            StoreKind::Generic => None,
        }
    }

    /// The strategy handling this retailer.
    pub fn strategy(&self) -> Box<dyn ReceiptStrategy> {
        match self {
            StoreKind::Lidl => Box::new(LidlStrategy),
            StoreKind::Biedronka => Box::new(BiedronkaStrategy),
            StoreKind::Auchan => Box::new(AuchanStrategy),
            StoreKind::Generic => Box::new(GenericStrategy),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name().unwrap_or("generic"))
    }
}

/// Retailer-specific extraction behaviour.
pub trait ReceiptStrategy: Send + Sync {
    /// Retailer this strategy handles.
    fn store(&self) -> StoreKind;

    /// Instructions for the generative extractor.
    fn system_prompt(&self) -> String;

    /// Item clean-up rules for this retailer's layout.
    fn rules(&self) -> PostProcessRules {
        PostProcessRules::passthrough()
    }

    /// Clean up an item list (garbage removal, discount absorption).
    fn post_process_items(&self, items: Vec<ParsedItem>) -> Vec<ParsedItem> {
        self.rules().apply(items)
    }

    /// Clean up the items of a whole receipt.
    fn post_process(&self, mut receipt: ParsedReceipt) -> ParsedReceipt {
        receipt.items = self.post_process_items(std::mem::take(&mut receipt.items));
        receipt
    }
}

/// Pick the strategy for a receipt from its raw text.
pub fn select_strategy(text: &str) -> Box<dyn ReceiptStrategy> {
    let kind = StoreKind::detect(text);
    debug!(store = %kind, "Selected receipt strategy");
    kind.strategy()
}

fn retailer_prompt(notes: &str) -> String {
    format!("{BASE_PROMPT}\n\n{notes}")
}

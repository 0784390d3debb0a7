//! Deterministic, pattern-based receipt parser.

use std::time::Instant;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::config::ExtractionConfig;
use crate::models::receipt::{ParsedItem, ParsedReceipt};
use crate::strategy::StoreKind;

use super::rules::{
    is_admin_line, parse_item_line, DateExtractor, FieldExtractor, NipExtractor, TotalExtractor,
    DATE_DMY, DATE_YMD,
};
use super::ReceiptParser;

/// Number of leading lines searched for the shop name.
const HEADER_LINES: usize = 5;

/// Regex receipt parser.
#[derive(Debug, Clone)]
pub struct RegexReceiptParser {
    /// Whether to validate NIP checksums.
    validate_nip: bool,
    /// Sanity ceiling for a single line total.
    max_item_price: Decimal,
    /// Items above `total × ratio` are dropped once the total is known.
    max_total_ratio: Decimal,
}

impl RegexReceiptParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create a parser from extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            validate_nip: config.validate_nip,
            max_item_price: config.max_item_price,
            max_total_ratio: config.max_total_ratio,
        }
    }

    /// Set NIP validation.
    pub fn with_nip_validation(mut self, validate: bool) -> Self {
        self.validate_nip = validate;
        self
    }

    /// Set the per-item price ceiling.
    pub fn with_max_item_price(mut self, max: Decimal) -> Self {
        self.max_item_price = max;
        self
    }

    fn extract_shop_name(&self, text: &str) -> Option<String> {
        if let Some(name) = StoreKind::detect(text).display_name() {
            return Some(name.to_string());
        }

        // Fiscal printers put the seller first; take the first line that reads as a name
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(HEADER_LINES)
            .find(|l| {
                l.chars().filter(|c| c.is_alphabetic()).count() >= 2
                    && !is_admin_line(l)
                    && !DATE_YMD.is_match(l)
                    && !DATE_DMY.is_match(l)
                    && parse_item_line(l).is_none()
            })
            .map(str::to_string)
    }

    fn extract_items(&self, text: &str, total: Option<Decimal>) -> Vec<ParsedItem> {
        let ceiling = total
            .filter(|t| *t > Decimal::ZERO)
            .and_then(|t| t.checked_mul(self.max_total_ratio));

        text.lines()
            .filter_map(parse_item_line)
            .filter(|item| {
                if item.total_price > self.max_item_price {
                    debug!(item = %item.raw_name, price = %item.total_price, "Dropping item above price ceiling");
                    return false;
                }
                if let Some(ceiling) = ceiling {
                    if item.total_price > ceiling {
                        debug!(item = %item.raw_name, price = %item.total_price, "Dropping item above receipt total");
                        return false;
                    }
                }
                true
            })
            .collect()
    }
}

impl Default for RegexReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptParser for RegexReceiptParser {
    fn parse(&self, text: &str) -> ParsedReceipt {
        let start = Instant::now();

        if text.trim().is_empty() {
            debug!("Empty receipt text, nothing to parse");
            return ParsedReceipt::default();
        }

        let purchase_date = DateExtractor.extract(text);
        let total_amount = TotalExtractor.extract(text);
        let tax_id = NipExtractor::new()
            .with_validation(self.validate_nip)
            .extract(text);
        let shop_name = self.extract_shop_name(text);
        let items = self.extract_items(text, total_amount);

        debug!(
            items = items.len(),
            total = ?total_amount,
            date = ?purchase_date,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Regex extraction finished"
        );

        ParsedReceipt {
            shop_name,
            purchase_date,
            total_amount,
            tax_id,
            items,
            error: None,
        }
    }
}

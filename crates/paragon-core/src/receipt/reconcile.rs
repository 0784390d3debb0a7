//! Field-level merge of the regex and generative extraction results.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::config::ReconciliationConfig;
use crate::models::receipt::{ItemsSource, ParsedReceipt, ReconciledReceipt, UNKNOWN_SHOP};
use crate::strategy::ReceiptStrategy;

/// Merges two extractor outputs into one receipt.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Regex items are trusted when their sum is strictly within this of the total.
    checksum_tolerance: Decimal,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::from_config(&ReconciliationConfig::default())
    }

    pub fn from_config(config: &ReconciliationConfig) -> Self {
        Self {
            checksum_tolerance: config.checksum_tolerance,
        }
    }

    pub fn with_checksum_tolerance(mut self, tolerance: Decimal) -> Self {
        self.checksum_tolerance = tolerance;
        self
    }

    /// Merge field by field: shop, date, total, then items via the checksum
    /// gate, then the strategy's item clean-up. `today` doubles as the
    /// "no date found" sentinel. Never fails.
    pub fn reconcile(
        &self,
        regex: &ParsedReceipt,
        generative: &ParsedReceipt,
        strategy: &dyn ReceiptStrategy,
        today: NaiveDate,
    ) -> ReconciledReceipt {
        let shop_name = non_blank(&generative.shop_name)
            .or_else(|| non_blank(&regex.shop_name))
            .unwrap_or(UNKNOWN_SHOP)
            .to_string();

        let purchase_date = regex
            .purchase_date
            .filter(|d| *d != today)
            .or(generative.purchase_date)
            .unwrap_or(today);

        let total_amount = regex
            .total_amount
            .filter(|t| *t > Decimal::ZERO)
            .or(generative.total_amount)
            .unwrap_or(Decimal::ZERO);

        let regex_sum = regex.items_total();
        let regex_fits = !regex.items.is_empty()
            && regex_sum
                .and_then(|sum| sum.checked_sub(total_amount))
                .is_some_and(|gap| gap.abs() < self.checksum_tolerance);

        let (items_source, items) = if regex_fits {
            (ItemsSource::Regex, regex.items.clone())
        } else {
            (ItemsSource::Generative, generative.items.clone())
        };

        info!(
            source = %items_source,
            regex_sum = ?regex_sum,
            total = %total_amount,
            regex_items = regex.items.len(),
            generative_items = generative.items.len(),
            "Items source selected"
        );

        let before = items.len();
        let items = strategy.post_process_items(items);
        if items.len() != before {
            debug!(before, after = items.len(), store = %strategy.store(), "Strategy post-processing changed items");
        }

        let mut warnings = Vec::new();
        if let Some(error) = &generative.error {
            warnings.push(format!("generative extraction unavailable: {error}"));
        }
        if let Some(error) = &regex.error {
            warnings.push(format!("regex extraction failed: {error}"));
        }
        if items_source == ItemsSource::Generative && generative.items.is_empty() {
            warnings.push("no line items recognised".to_string());
        }

        ReconciledReceipt {
            shop_name,
            purchase_date,
            total_amount,
            tax_id: regex.tax_id.clone(),
            items,
            items_source,
            store: strategy.store(),
            warnings,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

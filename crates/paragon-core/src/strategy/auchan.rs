//! Auchan receipts.

use super::rules::{PostProcessRules, COMMON_DISCOUNT_KEYWORDS};
use super::{retailer_prompt, ReceiptStrategy, StoreKind};

const AUCHAN_JUNK_PREFIXES: &[&str] = &["AUCHAN POLSKA", "HIPERMARKET", "KARTA AUCHAN"];

const AUCHAN_NOTES: &str = r#"This receipt is from Auchan.
- Product names are often truncated and upper-case; keep them as printed.
- Loyalty discounts appear as separate negative lines below the product.
  Report them as their own items with a negative total_price.
- Ignore loyalty card summaries and points balances."#;

/// Auchan layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuchanStrategy;

impl ReceiptStrategy for AuchanStrategy {
    fn store(&self) -> StoreKind {
        StoreKind::Auchan
    }

    fn system_prompt(&self) -> String {
        retailer_prompt(AUCHAN_NOTES)
    }

    fn rules(&self) -> PostProcessRules {
        PostProcessRules {
            discount_keywords: COMMON_DISCOUNT_KEYWORDS,
            junk_prefixes: AUCHAN_JUNK_PREFIXES,
            garbage_run_len: Some(16),
        }
    }
}

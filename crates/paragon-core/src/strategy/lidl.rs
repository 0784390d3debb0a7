//! Lidl receipts.

use super::rules::PostProcessRules;
use super::{retailer_prompt, ReceiptStrategy, StoreKind};

const LIDL_DISCOUNT_KEYWORDS: &[&str] = &[
    "rabat",
    "upust",
    "obniżka",
    "obnizka",
    "promocja",
    "lidl plus",
    "kupon",
    "discount",
    "rebate",
];

const LIDL_JUNK_PREFIXES: &[&str] = &["NR KASY", "NR PARAGONU", "OPODATK."];

const LIDL_NOTES: &str = r#"This receipt is from Lidl.
- Lidl prints discounts ("Rabat", "Lidl Plus", "Kupon") as separate negative lines
  directly under the discounted product. Report them as their own items with a
  negative total_price; do not merge them yourself.
- Weighted products show "0,365 kg x 5,99" on the line above the total.
- The final amount is labelled "SUMA PLN"."#;

/// Lidl layout: discount lines follow the product they apply to.
#[derive(Debug, Clone, Copy, Default)]
pub struct LidlStrategy;

impl ReceiptStrategy for LidlStrategy {
    fn store(&self) -> StoreKind {
        StoreKind::Lidl
    }

    fn system_prompt(&self) -> String {
        retailer_prompt(LIDL_NOTES)
    }

    fn rules(&self) -> PostProcessRules {
        PostProcessRules {
            discount_keywords: LIDL_DISCOUNT_KEYWORDS,
            junk_prefixes: LIDL_JUNK_PREFIXES,
            garbage_run_len: Some(14),
        }
    }
}

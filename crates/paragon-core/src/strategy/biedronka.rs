//! Biedronka (Jeronimo Martins) receipts.

use super::rules::{PostProcessRules, COMMON_DISCOUNT_KEYWORDS};
use super::{retailer_prompt, ReceiptStrategy, StoreKind};

const BIEDRONKA_JUNK_PREFIXES: &[&str] = &["JERONIMO MARTINS", "BIEDRONKA NR", "SKLEP NR"];

const BIEDRONKA_NOTES: &str = r#"This receipt is from Biedronka (Jeronimo Martins Polska S.A.).
- Promotions appear as "Rabat" or "Obniżka" lines with a negative amount right
  after the product. Report them as separate items with a negative total_price.
- Quantities are printed as "2 x 3,49" before the line total.
- The shop header lines (Jeronimo Martins, shop number, address) are not items."#;

/// Biedronka layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiedronkaStrategy;

impl ReceiptStrategy for BiedronkaStrategy {
    fn store(&self) -> StoreKind {
        StoreKind::Biedronka
    }

    fn system_prompt(&self) -> String {
        retailer_prompt(BIEDRONKA_NOTES)
    }

    fn rules(&self) -> PostProcessRules {
        PostProcessRules {
            discount_keywords: COMMON_DISCOUNT_KEYWORDS,
            junk_prefixes: BIEDRONKA_JUNK_PREFIXES,
            garbage_run_len: Some(14),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::ParsedItem;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_header_lines_dropped() {
        let items = vec![
            ParsedItem::new("Biedronka nr 3127", d("1.00")),
            ParsedItem::new("Jogurt grecki", d("2.99")),
            ParsedItem::new("Obniżka", d("-0.50")),
        ];
        let out = BiedronkaStrategy.post_process_items(items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw_name, "Jogurt grecki");
        assert_eq!(out[0].price_after_discount, d("2.49"));
    }
}

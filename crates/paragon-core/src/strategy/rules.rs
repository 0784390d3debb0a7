//! Item clean-up rules shared by the retailer strategies.

use tracing::debug;

use crate::models::receipt::ParsedItem;

/// Generic words printed on discount lines.
pub const COMMON_DISCOUNT_KEYWORDS: &[&str] = &[
    "rabat",
    "upust",
    "obniżka",
    "obnizka",
    "promocja",
    "discount",
    "rebate",
];

/// Clean-up configuration for one retailer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessRules {
    /// Lowercase substrings marking a discount line.
    pub discount_keywords: &'static [&'static str],
    /// Uppercase prefixes of lines that are never products.
    pub junk_prefixes: &'static [&'static str],
    /// Letter+digit runs at least this long mark OCR garbage.
    pub garbage_run_len: Option<usize>,
}

impl PostProcessRules {
    /// Rules that leave items untouched.
    pub const fn passthrough() -> Self {
        Self {
            discount_keywords: &[],
            junk_prefixes: &[],
            garbage_run_len: None,
        }
    }

    /// Drop garbage first, then fold discounts into the remaining items.
    pub fn apply(&self, items: Vec<ParsedItem>) -> Vec<ParsedItem> {
        let items = drop_garbage_lines(items, self);
        if self.discount_keywords.is_empty() {
            return items;
        }
        absorb_discount_lines(items, self.discount_keywords)
    }
}

/// Whether an item is a discount line: a negative price, or a name carrying a
/// discount keyword.
pub fn is_discount_line(item: &ParsedItem, keywords: &[&str]) -> bool {
    if item.is_negative() {
        return true;
    }
    let name = item.raw_name.to_lowercase();
    keywords.iter().any(|k| name.contains(k))
}

/// Fold discount lines into the preceding product's `discount`.
///
/// Orphan discounts (no preceding product) are dropped. A second pass over
/// the output is a no-op.
pub fn absorb_discount_lines(items: Vec<ParsedItem>, keywords: &[&str]) -> Vec<ParsedItem> {
    let mut out: Vec<ParsedItem> = Vec::with_capacity(items.len());

    for item in items {
        if !is_discount_line(&item, keywords) {
            out.push(item);
            continue;
        }

        let amount = item.total_price.abs();
        match out.last_mut() {
            Some(prev) => match prev
                .discount
                .checked_add(amount)
                .and_then(|discount| Some((discount, prev.total_price.checked_sub(discount)?)))
            {
                Some((discount, paid)) => {
                    prev.discount = discount;
                    prev.price_after_discount = paid;
                    debug!(
                        item = %prev.raw_name,
                        discount = %amount,
                        "Absorbed discount line '{}'",
                        item.raw_name
                    );
                }
                None => {
                    debug!(item = %prev.raw_name, "Dropping discount line '{}' out of range", item.raw_name);
                }
            },
            None => {
                debug!(line = %item.raw_name, "Dropping discount line with no preceding item");
            }
        }
    }

    out
}

/// Remove OCR garbage: junk-prefixed lines and long letter+digit runs.
pub fn drop_garbage_lines(items: Vec<ParsedItem>, rules: &PostProcessRules) -> Vec<ParsedItem> {
    items
        .into_iter()
        .filter(|item| {
            let junk = is_junk(&item.raw_name, rules);
            if junk {
                debug!(line = %item.raw_name, "Dropping garbage line");
            }
            !junk
        })
        .collect()
}

fn is_junk(name: &str, rules: &PostProcessRules) -> bool {
    let upper = name.trim().to_uppercase();
    if rules.junk_prefixes.iter().any(|p| upper.starts_with(p)) {
        return true;
    }

    match rules.garbage_run_len {
        Some(min_len) => name.split_whitespace().any(|run| is_garbage_run(run, min_len)),
        None => false,
    }
}

/// A run of alphanumerics mixing letters and digits, long enough to be noise.
fn is_garbage_run(run: &str, min_len: usize) -> bool {
    let len = run.chars().count();
    len >= min_len
        && run.chars().all(|c| c.is_alphanumeric())
        && run.chars().any(|c| c.is_ascii_digit())
        && run.chars().any(|c| c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const RULES: PostProcessRules = PostProcessRules {
        discount_keywords: COMMON_DISCOUNT_KEYWORDS,
        junk_prefixes: &["NR KASY"],
        garbage_run_len: Some(14),
    };

    #[test]
    fn test_discount_absorbed_into_previous_item() {
        let items = vec![
            ParsedItem::new("Piwo Lech 0,5L", d("18.99")),
            ParsedItem::new("Rabat", d("-4.00")),
        ];
        let out = RULES.apply(items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw_name, "Piwo Lech 0,5L");
        assert_eq!(out[0].total_price, d("18.99"));
        assert_eq!(out[0].discount, d("4.00"));
        assert_eq!(out[0].price_after_discount, d("14.99"));
    }

    #[test]
    fn test_positive_keyword_line_is_discount() {
        let items = vec![
            ParsedItem::new("Ser Gouda", d("7.49")),
            ParsedItem::new("OBNIŻKA", d("1.50")),
        ];
        let out = absorb_discount_lines(items, COMMON_DISCOUNT_KEYWORDS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].discount, d("1.50"));
        assert_eq!(out[0].price_after_discount, d("5.99"));
    }

    #[test]
    fn test_consecutive_discounts_accumulate() {
        let items = vec![
            ParsedItem::new("Kawa", d("29.99")),
            ParsedItem::new("Rabat", d("-5.00")),
            ParsedItem::new("Upust", d("-2.00")),
        ];
        let out = absorb_discount_lines(items, COMMON_DISCOUNT_KEYWORDS);
        assert_eq!(out[0].discount, d("7.00"));
        assert_eq!(out[0].price_after_discount, d("22.99"));
    }

    #[test]
    fn test_orphan_discount_dropped() {
        let items = vec![
            ParsedItem::new("Rabat", d("-1.00")),
            ParsedItem::new("Chleb", d("4.99")),
        ];
        let out = absorb_discount_lines(items, COMMON_DISCOUNT_KEYWORDS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].discount, Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_discount_dropped() {
        let items = vec![
            ParsedItem::new("Chleb", d("4.99")),
            ParsedItem::new("Rabat", -Decimal::MAX),
            ParsedItem::new("Rabat", d("-1.00")),
        ];
        let out = absorb_discount_lines(items, COMMON_DISCOUNT_KEYWORDS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].discount, Decimal::MAX);
    }

    #[test]
    fn test_post_processing_is_idempotent() {
        let items = vec![
            ParsedItem::new("Piwo", d("18.99")),
            ParsedItem::new("Rabat", d("-4.00")),
            ParsedItem::new("A7XK29QZ0PLM3R8", d("0.01")),
            ParsedItem::new("Chleb", d("4.99")),
        ];
        let once = RULES.apply(items);
        let twice = RULES.apply(once.clone());
        assert_eq!(once, twice);
        let discount: Decimal = twice.iter().map(|i| i.discount).sum();
        assert_eq!(discount, d("4.00"));
    }

    #[test]
    fn test_garbage_lines_dropped() {
        let items = vec![
            ParsedItem::new("A7XK29QZ0PLM3R8", d("0.01")),
            ParsedItem::new("NR KASY 3", d("1.00")),
            ParsedItem::new("Wielkopolskiego twarożek", d("3.99")),
        ];
        let out = drop_garbage_lines(items, &RULES);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw_name, "Wielkopolskiego twarożek");
    }

    #[test]
    fn test_passthrough_keeps_everything() {
        let items = vec![ParsedItem::new("Rabat", d("-4.00"))];
        assert_eq!(PostProcessRules::passthrough().apply(items.clone()), items);
    }
}

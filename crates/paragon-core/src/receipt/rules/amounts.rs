//! Amounts and the receipt total.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{TOTAL_LABELED, TOTAL_PLN};
use super::{FieldExtractor, Found};

/// Receipt total extractor. The fiscal printer's own `SUMA PLN` line ranks
/// ahead of looser `RAZEM` / `DO ZAPŁATY` labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalExtractor;

impl FieldExtractor for TotalExtractor {
    type Value = Decimal;

    fn candidates(&self, text: &str) -> Vec<Found<Decimal>> {
        TOTAL_PLN
            .captures_iter(text)
            .chain(TOTAL_LABELED.captures_iter(text))
            .filter_map(|caps| {
                let amount = parse_amount(&caps[1])?;
                Some(Found::at(amount, text, caps.get(0)?))
            })
            .collect()
    }
}

/// Parse a Polish-formatted amount (e.g., "1 234,56", "3,49" or "-4.00").
///
/// A lone comma is always the decimal separator.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let negative = s.starts_with('-') || s.starts_with('\u{2212}');

    // Remove spaces, currency and anything else that isn't part of the number
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever separator comes last is the decimal one
        let comma_pos = cleaned.rfind(',');
        let dot_pos = cleaned.rfind('.');
        match (comma_pos, dot_pos) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => cleaned.replace(',', ""),
            _ => cleaned,
        }
    } else {
        cleaned
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1 234,56"), Some(d("1234.56")));
        assert_eq!(parse_amount("3,49"), Some(d("3.49")));
        assert_eq!(parse_amount("1234.56"), Some(d("1234.56")));
        assert_eq!(parse_amount("1.234,56"), Some(d("1234.56")));
        assert_eq!(parse_amount("-4,00"), Some(d("-4.00")));
        assert_eq!(parse_amount("0,365"), Some(d("0.365")));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_extract_total_prefers_pln_label() {
        let text = "RAZEM 3,00\nSUMA PLN 21,76\nKarta 21,76";
        let found = TotalExtractor.candidates(text);
        assert_eq!(found[0].value, d("21.76"));
        assert_eq!(found[0].line, 1);
        assert_eq!(found[1].value, d("3.00"));
    }

    #[test]
    fn test_extract_total_labeled_fallback() {
        let text = "SUMA PTU 2,35\nDo zapłaty: 18,50";
        assert_eq!(TotalExtractor.extract(text), Some(d("18.50")));
        assert_eq!(TotalExtractor.extract("nothing to see"), None);
    }
}

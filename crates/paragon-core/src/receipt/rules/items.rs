//! Line item extraction for Polish fiscal receipts.

use rust_decimal::Decimal;

use crate::models::receipt::ParsedItem;
use super::amounts::parse_amount;
use super::patterns::{is_admin_line, ITEM_LINE, QTY_TIMES_PRICE, QTY_UNIT};

/// Largest quantity read from a line; bigger numbers are OCR noise.
const MAX_QUANTITY: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Parse one receipt line of the form `name [qty unit [x price]] price [tax]`.
///
/// Returns `None` for lines without a trailing price, administrative lines
/// and lines whose name is not made of words.
pub fn parse_item_line(line: &str) -> Option<ParsedItem> {
    let line = line.trim();
    if line.is_empty() || is_admin_line(line) {
        return None;
    }

    let caps = ITEM_LINE.captures(line)?;
    let total = parse_amount(&caps["price"])?;
    let candidate = caps["name"].trim();

    let (name, quantity, unit, unit_price) = split_quantity(candidate);
    let name = name.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '-');

    if name.chars().filter(|c| c.is_alphabetic()).count() < 2 {
        return None;
    }

    let unit_price = unit_price.or_else(|| {
        total
            .checked_div(quantity)
            .map(|price| price.round_dp(4).normalize())
    });

    Some(
        ParsedItem::new(name.to_string(), total)
            .with_quantity(quantity, unit)
            .with_unit_price(unit_price),
    )
}

/// Strip a trailing quantity/unit (and optional unit price) from a candidate name.
fn split_quantity(candidate: &str) -> (&str, Decimal, Option<String>, Option<Decimal>) {
    if let Some(caps) = QTY_TIMES_PRICE.captures(candidate) {
        let quantity = parse_amount(&caps["qty"]).filter(plausible_quantity);
        let unit_price = parse_amount(&caps["price"])
            .filter(|p| quantity.is_some_and(|q| q.checked_mul(*p).is_some()));
        if let (Some(quantity), Some(unit_price)) = (quantity, unit_price) {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(candidate.len());
            let unit = caps.name("unit").map(|u| normalize_unit(u.as_str()));
            return (&candidate[..start], quantity, unit, Some(unit_price));
        }
    }

    if let Some(caps) = QTY_UNIT.captures(candidate) {
        if let Some(quantity) = parse_amount(&caps["qty"]).filter(plausible_quantity) {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(candidate.len());
            let unit = Some(normalize_unit(&caps["unit"]));
            return (&candidate[..start], quantity, unit, None);
        }
    }

    (candidate, Decimal::ONE, None, None)
}

fn plausible_quantity(quantity: &Decimal) -> bool {
    *quantity > Decimal::ZERO && *quantity <= MAX_QUANTITY
}

fn normalize_unit(unit: &str) -> String {
    match unit.to_lowercase().trim_end_matches('.') {
        "opak" => "op".to_string(),
        other => other.to_string(),
    }
}

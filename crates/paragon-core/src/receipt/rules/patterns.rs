//! Common regex patterns for Polish receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // NIP (Polish tax ID), any 3-3-2-2 / 3-2-2-3 grouping
    pub static ref NIP_PATTERN: Regex = Regex::new(
        r"(?i)(?:NIP|N\.I\.P\.?)[\s:]*(?:PL)?\s*(\d(?:[- ]?\d){9})\b"
    ).unwrap();

    // Dates
    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[.\-](\d{1,2})[.\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_POLISH_LONG: Regex = Regex::new(
        r"(?i)(\d{1,2})\s+(stycznia|lutego|marca|kwietnia|maja|czerwca|lipca|sierpnia|września|października|listopada|grudnia)\s+(\d{4})"
    ).unwrap();

    // Receipt totals. "SUMA PLN" is the fiscal printer's own label and wins.
    pub static ref TOTAL_PLN: Regex = Regex::new(
        r"(?i)(?:suma|razem|do\s+zap[łl]aty)\s*:?\s*PLN[\s:]*(\d{1,3}(?:[\s\u{00a0}]?\d{3})*[,.]\d{2})"
    ).unwrap();

    pub static ref TOTAL_LABELED: Regex = Regex::new(
        r"(?i)(?:suma|razem|do\s+zap[łl]aty)[\s:]*(\d{1,3}(?:[\s\u{00a0}]?\d{3})*[,.]\d{2})"
    ).unwrap();

    // Line item: candidate name, trailing price, optional PTU letter
    pub static ref ITEM_LINE: Regex = Regex::new(
        r"^(?P<name>.+?)\s+(?P<price>-?\d+[,.]\d{2})(?:\s*(?P<tax>[A-G])\*?)?\s*$"
    ).unwrap();

    // Trailing "2 szt x 3,49" / "0,365 kg * 12,99" / "2 x 3,49"
    pub static ref QTY_TIMES_PRICE: Regex = Regex::new(
        r"(?i)\s+(?P<qty>\d+(?:[.,]\d+)?)\s*(?:(?P<unit>szt|kg|l|op|opak)\.?\s*)?[x×*]\s*(?P<price>\d+[.,]\d{2})\s*$"
    ).unwrap();

    // Trailing "2 szt" / "0,5 kg"
    pub static ref QTY_UNIT: Regex = Regex::new(
        r"(?i)\s+(?P<qty>\d+(?:[.,]\d+)?)\s*(?P<unit>szt|kg|op|opak)\.?\s*$"
    ).unwrap();
}

/// Lines containing any of these are receipt furniture, never products.
pub const ADMIN_KEYWORDS: &[&str] = &[
    "PTU",
    "VAT",
    "SUMA",
    "RAZEM",
    "DO ZAPŁATY",
    "DO ZAPLATY",
    "NIP",
    "PARAGON",
    "FISKALN",
    "SPRZEDAŻ OPODATKOWANA",
    "SPRZEDAZ OPODATKOWANA",
    "KARTA",
    "GOTÓWKA",
    "GOTOWKA",
    "RESZTA",
    "WPŁATA",
    "WPLATA",
    "PŁATNOŚĆ",
    "PLATNOSC",
    "TERMINAL",
    "KASJER",
    "KASA",
    "NR SYS",
    "NR TRANS",
    "ROZLICZENIE",
];

/// Whether a line is administrative (tax, footer, payment).
pub fn is_admin_line(line: &str) -> bool {
    let upper = line.to_uppercase();
    ADMIN_KEYWORDS.iter().any(|k| upper.contains(k))
}

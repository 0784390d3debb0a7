//! Pattern rules for receipt fields.

pub mod amounts;
pub mod dates;
pub mod items;
pub mod nip;
pub mod patterns;

pub use amounts::{parse_amount, TotalExtractor};
pub use dates::{parse_date_str, DateExtractor};
pub use items::parse_item_line;
pub use nip::{validate_nip, NipExtractor};
pub use patterns::*;

use regex::Match;

/// A receipt field read by pattern.
pub trait FieldExtractor {
    type Value;

    /// Every match in the text, best first.
    fn candidates(&self, text: &str) -> Vec<Found<Self::Value>>;

    /// The best match.
    fn extract(&self, text: &str) -> Option<Self::Value> {
        self.candidates(text).into_iter().next().map(|found| found.value)
    }
}

/// A value and where on the receipt it was printed.
#[derive(Debug, Clone, PartialEq)]
pub struct Found<T> {
    pub value: T,
    /// Zero-based line number.
    pub line: usize,
    /// The matched text.
    pub matched: String,
}

impl<T> Found<T> {
    fn at(value: T, text: &str, m: Match<'_>) -> Self {
        Self {
            value,
            line: text[..m.start()].matches('\n').count(),
            matched: m.as_str().to_string(),
        }
    }
}

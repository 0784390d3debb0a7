//! Purchase dates.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_POLISH_LONG, DATE_YMD};
use super::{FieldExtractor, Found};

const POLISH_MONTHS: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

/// Receipt date extractor. Fiscal printers emit ISO dates, so those rank
/// first, then day-first numeric dates, then spelled-out months.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateExtractor;

impl FieldExtractor for DateExtractor {
    type Value = NaiveDate;

    fn candidates(&self, text: &str) -> Vec<Found<NaiveDate>> {
        let iso = DATE_YMD.captures_iter(text).filter_map(|c| {
            let date = NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)?;
            Some(Found::at(date, text, c.get(0)?))
        });

        let day_first = DATE_DMY.captures_iter(text).filter_map(|c| {
            let year = expand_year(c[3].parse().ok()?);
            let date = NaiveDate::from_ymd_opt(year, c[2].parse().ok()?, c[1].parse().ok()?)?;
            Some(Found::at(date, text, c.get(0)?))
        });

        let spelled = DATE_POLISH_LONG.captures_iter(text).filter_map(|c| {
            let date = NaiveDate::from_ymd_opt(c[3].parse().ok()?, polish_month(&c[2])?, c[1].parse().ok()?)?;
            Some(Found::at(date, text, c.get(0)?))
        });

        let mut found: Vec<Found<NaiveDate>> = Vec::new();
        for candidate in iso.chain(day_first).chain(spelled) {
            if !found.iter().any(|f| f.value == candidate.value) {
                found.push(candidate);
            }
        }
        found
    }
}

/// Parse a free-form date (as returned by the generative model).
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateExtractor.extract(s))
}

/// Two-digit years: 00-50 are 20xx, 51-99 are 19xx.
fn expand_year(year: i32) -> i32 {
    match year {
        0..=50 => 2000 + year,
        51..=99 => 1900 + year,
        _ => year,
    }
}

fn polish_month(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    POLISH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}

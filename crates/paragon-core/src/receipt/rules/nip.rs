//! Seller NIP (Polish tax id).

use super::patterns::NIP_PATTERN;
use super::{FieldExtractor, Found};

const NIP_WEIGHTS: [u32; 9] = [6, 5, 7, 2, 3, 4, 5, 6, 7];

/// Labelled NIP extractor. Receipts always print `NIP` before the seller's
/// number, so bare ten-digit runs are ignored.
pub struct NipExtractor {
    validate: bool,
}

impl NipExtractor {
    pub fn new() -> Self {
        Self { validate: true }
    }

    /// Drop numbers failing the checksum. Without validation they are still
    /// ranked after valid ones.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl Default for NipExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for NipExtractor {
    type Value = String;

    fn candidates(&self, text: &str) -> Vec<Found<String>> {
        let mut found: Vec<Found<String>> = Vec::new();

        for caps in NIP_PATTERN.captures_iter(text) {
            let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
            if found.iter().any(|f| f.value == digits) {
                continue;
            }
            if self.validate && !validate_nip(&digits) {
                continue;
            }
            found.push(Found::at(digits, text, caps.get(0).unwrap()));
        }

        found.sort_by_key(|f| !validate_nip(&f.value));
        found
    }
}

/// Check the NIP checksum: weighted sum of the first nine digits mod 11
/// equals the tenth.
pub fn validate_nip(nip: &str) -> bool {
    let digits: Vec<u32> = nip.chars().filter_map(|c| c.to_digit(10)).collect();
    let [body @ .., check] = digits.as_slice() else {
        return false;
    };
    if body.len() != NIP_WEIGHTS.len() {
        return false;
    }

    // A remainder of 10 never equals a digit, so such numbers fail here too
    let sum: u32 = body.iter().zip(NIP_WEIGHTS).map(|(d, w)| d * w).sum();
    sum % 11 == *check
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_nip() {
        assert!(validate_nip("5261040828"));
        assert!(validate_nip("781-18-97-358"));
        assert!(!validate_nip("1234567890"));
        assert!(!validate_nip("526104082"));
        assert!(!validate_nip(""));
    }

    #[test]
    fn test_labelled_nip_with_line() {
        let text = "Jeronimo Martins Polska S.A.\nNIP 779-10-11-327\n2024-03-15";
        let found = NipExtractor::new().with_validation(false).candidates(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "7791011327");
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn test_unlabelled_digits_ignored() {
        assert_eq!(NipExtractor::new().with_validation(false).extract("Nr kasy 5261040828"), None);
    }

    #[test]
    fn test_validation_filters_bad_checksum() {
        let text = "NIP: 123-456-78-90";
        assert_eq!(NipExtractor::new().extract(text), None);
        assert_eq!(
            NipExtractor::new().with_validation(false).extract(text).as_deref(),
            Some("1234567890")
        );
    }

    #[test]
    fn test_valid_number_ranked_first() {
        let text = "NIP 123-456-78-90\nSklep\nNIP 526-104-08-28";
        let extractor = NipExtractor::new().with_validation(false);
        assert_eq!(extractor.extract(text).as_deref(), Some("5261040828"));
        assert_eq!(extractor.candidates(text).len(), 2);
    }
}

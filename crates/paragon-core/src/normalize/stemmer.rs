//! Light suffix-stripping stemmer for Polish product names.
//!
//! Only inflectional endings are removed, so "jogurty naturalne" and
//! "jogurt naturalny" meet at "jogurt natural".

/// Endings tried longest first.
const SUFFIXES: &[&str] = &[
    "owie", "ami", "ach", "ego", "emu", "ymi", "ich", "ych", "ów", "om", "ie", "em", "ej", "ą",
    "ę", "a", "e", "i", "o", "u", "y",
];

/// Tokens this short are left alone.
const MIN_STEMMABLE_CHARS: usize = 5;

/// Characters that must survive stripping.
const MIN_STEM_CHARS: usize = 3;

/// Stem one lowercase token.
pub fn stem_token(token: &str) -> String {
    let len = token.chars().count();
    if len < MIN_STEMMABLE_CHARS {
        return token.to_string();
    }

    for suffix in SUFFIXES {
        if let Some(stem) = token.strip_suffix(suffix) {
            if stem.chars().count() >= MIN_STEM_CHARS {
                return stem.to_string();
            }
        }
    }

    token.to_string()
}

/// Lowercase, split on anything that is not a letter or digit, stem every token.
pub fn stem_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(stem_token)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflections_meet() {
        assert_eq!(stem_name("Jogurty naturalne"), stem_name("Jogurt naturalny"));
        assert_eq!(stem_name("Pomidorami"), stem_name("pomidory"));
        assert_eq!(stem_name("Bułki pszenne"), stem_name("Bułka pszenna"));
    }

    #[test]
    fn test_short_tokens_untouched() {
        assert_eq!(stem_token("ser"), "ser");
        assert_eq!(stem_token("masło"), "masł");
        assert_eq!(stem_token("kawa"), "kawa");
    }

    #[test]
    fn test_punctuation_and_digits() {
        assert_eq!(stem_name("Mleko UHT 3,2% 1L"), "mlek uht 3 2 1l");
        assert_eq!(stem_name("  "), "");
    }
}

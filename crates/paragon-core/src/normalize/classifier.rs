//! Category inference for new products.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::models::product::CategoryKind;
use crate::receipt::{GenerationRequest, GenerativeModel};

struct Keywords {
    kind: CategoryKind,
    /// A token starting with one of these matches.
    prefixes: &'static [&'static str],
    /// Short stems that would catch unrelated words; these match whole tokens only.
    words: &'static [&'static str],
}

/// Keyword table, checked in order.
const KEYWORDS: &[Keywords] = &[
    Keywords {
        kind: CategoryKind::Household,
        prefixes: &["papier", "ręcznik", "serwet", "płyn", "proszek", "mydło", "szampon", "worki", "gąbk", "domestos"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::Frozen,
        prefixes: &["mrożon", "lody", "frozen"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::Canned,
        prefixes: &["konserw", "puszk", "koncentrat", "pasztet"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::Sweets,
        prefixes: &["czekolad", "baton", "ciastk", "cukierk", "chips", "wafel", "wafl", "żelk", "paluszk"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::Beverages,
        prefixes: &["woda", "wody", "napój", "napoj", "piwo", "cola", "lemoniad"],
        // "sok" and "wino" also start "Sokołów" and "winogrona"
        words: &["sok", "soki", "soku", "wino", "wina"],
    },
    Keywords {
        kind: CategoryKind::Dairy,
        prefixes: &["mleko", "mleka", "jogurt", "ser", "kefir", "maślank", "śmietan", "masło", "twaróg", "twarog", "twarożek", "mozzarell", "gouda", "jaj"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::Bakery,
        prefixes: &["chleb", "bułk", "bulk", "bagietk", "rogal", "drożdżówk", "pieczyw", "kajzerk"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::MeatFish,
        prefixes: &["kurczak", "filet", "szynk", "kiełbas", "kielbas", "wołow", "wieprz", "mięs", "mies", "parówk", "łosoś", "losos", "dorsz", "boczek"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::FruitsVegetables,
        prefixes: &["banan", "jabłk", "jablk", "pomidor", "ogór", "ogor", "ziemniak", "cebul", "marchew", "sałat", "salat", "papryk", "cytryn", "pomarańcz", "truskaw", "winogron"],
        words: &[],
    },
    Keywords {
        kind: CategoryKind::DryGoods,
        prefixes: &["makaron", "ryż", "ryz", "mąka", "maka", "kasza", "cukier", "sól", "płatki", "platki", "kawa", "herbat", "olej"],
        words: &[],
    },
];

impl Keywords {
    fn matches(&self, token: &str) -> bool {
        self.words.contains(&token) || self.prefixes.iter().any(|p| token.starts_with(p))
    }
}

/// Keyword-only classification.
pub fn classify_by_keywords(name: &str) -> Option<CategoryKind> {
    let lower = name.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    KEYWORDS
        .iter()
        .find(|keywords| tokens.iter().any(|t| keywords.matches(t)))
        .map(|keywords| keywords.kind)
}

/// Strip quoting and punctuation from a model label; map it to the fixed
/// enumeration when it names one.
pub fn clean_label(label: &str) -> Option<String> {
    let first_line = label.lines().map(str::trim).find(|l| !l.is_empty())?;
    let cleaned = first_line
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .trim();

    if cleaned.is_empty() {
        return None;
    }

    Some(
        CategoryKind::from_name(cleaned)
            .map(|kind| kind.name().to_string())
            .unwrap_or_else(|| cleaned.to_string()),
    )
}

fn classification_prompt() -> String {
    let names: Vec<&str> = CategoryKind::ALL.iter().map(|k| k.name()).collect();
    format!(
        "Classify the grocery product into exactly one of these categories: {}.\n\
         Reply with the category name only, nothing else.",
        names.join(", ")
    )
}

/// Keyword table first, then the generative model when one is configured.
#[derive(Clone)]
pub struct CategoryClassifier {
    model: Option<Arc<dyn GenerativeModel>>,
    timeout: Duration,
}

impl CategoryClassifier {
    /// Keyword-only classifier.
    pub fn new() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Fall back to the model when no keyword matches.
    pub fn with_model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Category name for a product, or `None` when nothing is known.
    pub async fn classify(&self, name: &str) -> Option<String> {
        if let Some(kind) = classify_by_keywords(name) {
            debug!(product = name, category = kind.name(), "Classified by keyword");
            return Some(kind.name().to_string());
        }

        let model = self.model.as_ref()?;
        let request = GenerationRequest {
            system_prompt: classification_prompt(),
            user_text: name.to_string(),
        };

        match tokio::time::timeout(self.timeout, model.complete(&request)).await {
            Ok(Ok(reply)) => {
                let label = clean_label(&reply);
                debug!(product = name, category = ?label, "Classified by model");
                label
            }
            Ok(Err(e)) => {
                warn!(product = name, error = %e, "Category classification failed");
                None
            }
            Err(_) => {
                warn!(product = name, "Category classification timed out");
                None
            }
        }
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use async_trait::async_trait;

    struct Labeler(&'static str);

    #[async_trait]
    impl GenerativeModel for Labeler {
        async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            assert!(request.system_prompt.contains("Sweets & Snacks"));
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_keyword_table() {
        assert_eq!(classify_by_keywords("Mleko UHT 3,2% Łaciate 1L"), Some(CategoryKind::Dairy));
        assert_eq!(classify_by_keywords("Chleb razowy"), Some(CategoryKind::Bakery));
        assert_eq!(classify_by_keywords("Pizza mrożona"), Some(CategoryKind::Frozen));
        assert_eq!(classify_by_keywords("Czekolada mleczna"), Some(CategoryKind::Sweets));
        assert_eq!(classify_by_keywords("Sok pomarańczowy"), Some(CategoryKind::Beverages));
        assert_eq!(classify_by_keywords("Serwetki białe"), Some(CategoryKind::Household));
        assert_eq!(classify_by_keywords("Ser Gouda plastry"), Some(CategoryKind::Dairy));
        assert_eq!(classify_by_keywords("Zapalniczka"), None);
    }

    #[test]
    fn test_short_beverage_stems_match_whole_words() {
        let cases = [
            ("Winogrona białe", Some(CategoryKind::FruitsVegetables)),
            ("Parówki Sokołów", Some(CategoryKind::MeatFish)),
            ("Sokołów", None),
            ("Wino czerwone półwytrawne", Some(CategoryKind::Beverages)),
            ("Soki Tymbark 1L", Some(CategoryKind::Beverages)),
            ("Sok jabłkowy", Some(CategoryKind::Beverages)),
        ];
        for (name, expected) in cases {
            assert_eq!(classify_by_keywords(name), expected, "{name}");
        }
    }

    #[test]
    fn test_clean_label() {
        assert_eq!(clean_label("\"dairy\".").as_deref(), Some("Dairy"));
        assert_eq!(clean_label("  **Fruits & Vegetables**\n").as_deref(), Some("Fruits & Vegetables"));
        assert_eq!(clean_label("'Spices'").as_deref(), Some("Spices"));
        assert_eq!(clean_label(" ... "), None);
    }

    #[tokio::test]
    async fn test_keyword_hit_skips_model() {
        let classifier = CategoryClassifier::new().with_model(Arc::new(Labeler("Household")));
        assert_eq!(classifier.classify("Jogurt grecki").await.as_deref(), Some("Dairy"));
    }

    #[tokio::test]
    async fn test_model_fallback() {
        let classifier = CategoryClassifier::new().with_model(Arc::new(Labeler("`Sweets & Snacks`")));
        assert_eq!(classifier.classify("Zapalniczka").await.as_deref(), Some("Sweets & Snacks"));
    }

    #[tokio::test]
    async fn test_no_model_no_category() {
        assert_eq!(CategoryClassifier::new().classify("Zapalniczka").await, None);
    }
}

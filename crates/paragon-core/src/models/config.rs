//! Configuration structures for the ingestion pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ParagonError;

/// Main configuration for the paragon pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagonConfig {
    /// Regex extraction configuration.
    pub extraction: ExtractionConfig,

    /// Reconciliation configuration.
    pub reconciliation: ReconciliationConfig,

    /// Arithmetic verification configuration.
    pub verification: VerificationConfig,

    /// Product normalization configuration.
    pub normalization: NormalizationConfig,

    /// Pantry configuration.
    pub pantry: PantryConfig,

    /// Generative model service configuration.
    pub generative: GenerativeConfig,

    /// Storage configuration.
    pub store: StoreConfig,
}

/// Regex extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Enable NIP checksum validation.
    pub validate_nip: bool,

    /// Items priced above this are treated as OCR garbage.
    pub max_item_price: Decimal,

    /// Items priced above `total × ratio` are treated as OCR garbage.
    pub max_total_ratio: Decimal,

    /// Default currency if not detected.
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            validate_nip: false,
            max_item_price: Decimal::new(1000, 0),
            max_total_ratio: Decimal::new(15, 1),
            default_currency: "PLN".to_string(),
        }
    }
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Maximum gap between the regex item sum and the total for regex items to be trusted.
    pub checksum_tolerance: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            checksum_tolerance: Decimal::new(5, 0),
        }
    }
}

/// Consistency verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Absolute tolerance for `quantity × unit price` against the line total.
    pub tolerance: Decimal,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(2, 2),
        }
    }
}

/// Product resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Minimum fuzzy score (0-100) to bind a raw name to an existing product.
    pub fuzzy_threshold: u8,

    /// Resolution attempts before giving up on a contended name.
    pub max_resolve_attempts: u32,

    /// Ask the generative service when the keyword table has no answer.
    pub use_model_classifier: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 88,
            max_resolve_attempts: 3,
            use_model_classifier: true,
        }
    }
}

/// Pantry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PantryConfig {
    /// Shelf life used when neither product nor category knows better.
    pub default_shelf_life_days: i64,
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            default_shelf_life_days: 3,
        }
    }
}

/// Generative model service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
    /// Call the service at all.
    pub enabled: bool,

    /// OpenAI-compatible base URL (without `/chat/completions`).
    pub base_url: String,

    /// Model name.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Truncate receipt text to this many characters before sending.
    pub max_input_chars: usize,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key_env: "PARAGON_LLM_API_KEY".to_string(),
            timeout_secs: 30,
            max_input_chars: 12_000,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("paragon.db"),
        }
    }
}

impl ParagonConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ParagonError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParagonConfig::default();
        assert_eq!(config.reconciliation.checksum_tolerance, Decimal::new(5, 0));
        assert_eq!(config.verification.tolerance, Decimal::new(2, 2));
        assert_eq!(config.normalization.fuzzy_threshold, 88);
        assert_eq!(config.pantry.default_shelf_life_days, 3);
    }

    #[test]
    fn test_from_file_round_trip_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ParagonConfig::default();
        config.normalization.fuzzy_threshold = 91;
        config.save(&path).unwrap();
        assert_eq!(ParagonConfig::from_file(&path).unwrap().normalization.fuzzy_threshold, 91);

        std::fs::write(&path, "{ not json").unwrap();
        let err = ParagonConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ParagonError::Config(_)));
        assert!(err.to_string().contains("config.json"));

        let missing = ParagonConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, ParagonError::Io(_)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ParagonConfig =
            serde_json::from_str(r#"{"normalization": {"fuzzy_threshold": 90}}"#).unwrap();
        assert_eq!(config.normalization.fuzzy_threshold, 90);
        assert_eq!(config.normalization.max_resolve_attempts, 3);
        assert_eq!(config.generative.timeout_secs, 30);
    }
}

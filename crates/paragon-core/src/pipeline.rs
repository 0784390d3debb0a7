//! End-to-end receipt ingestion.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::models::config::ParagonConfig;
use crate::models::pantry::PantryItem;
use crate::models::receipt::{ParsedItem, ParsedReceipt, RawReceipt, ReconciledReceipt};
use crate::normalize::{CategoryClassifier, ProductResolver, Resolution};
use crate::pantry::PantryLifecycle;
use crate::receipt::{
    ConsistencyVerifier, GenerativeExtractor, GenerativeModel, ReceiptParser, Reconciler,
    RegexReceiptParser, VerificationAdjustment,
};
use crate::store::ProductStore;
use crate::strategy::select_strategy;

/// One reconciled line and what it became.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedItem {
    pub item: ParsedItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pantry: Option<PantryItem>,
}

/// Everything one ingestion produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub receipt: ReconciledReceipt,
    pub adjustments: Vec<VerificationAdjustment>,
    pub entries: Vec<IngestedItem>,
    pub processing_time_ms: u64,
}

impl IngestionOutcome {
    /// Number of items that were bound to a product.
    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.resolution.is_some()).count()
    }

    /// Number of products created by this ingestion.
    pub fn new_product_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.resolution.as_ref().is_some_and(|r| r.is_new))
            .count()
    }
}

/// Regex + generative extraction, reconciliation, verification, product
/// resolution and pantry creation, in that order.
#[derive(Clone)]
pub struct ReceiptPipeline {
    regex: RegexReceiptParser,
    generative: Option<GenerativeExtractor>,
    reconciler: Reconciler,
    verifier: ConsistencyVerifier,
    resolver: ProductResolver,
    pantry: PantryLifecycle,
    store: Arc<dyn ProductStore>,
}

impl ReceiptPipeline {
    /// Regex-only pipeline over `store`.
    pub fn new(config: &ParagonConfig, store: Arc<dyn ProductStore>) -> Self {
        Self {
            regex: RegexReceiptParser::from_config(&config.extraction),
            generative: None,
            reconciler: Reconciler::from_config(&config.reconciliation),
            verifier: ConsistencyVerifier::from_config(&config.verification),
            resolver: ProductResolver::from_config(store.clone(), &config.normalization),
            pantry: PantryLifecycle::from_config(&config.pantry),
            store,
        }
    }

    /// Attach a generative model for extraction and, when enabled, category
    /// classification.
    pub fn with_model(mut self, config: &ParagonConfig, model: Arc<dyn GenerativeModel>) -> Self {
        if !config.generative.enabled {
            return self;
        }

        self.generative = Some(GenerativeExtractor::from_config(model.clone(), &config.generative));
        if config.normalization.use_model_classifier {
            let classifier = CategoryClassifier::new()
                .with_model(model)
                .with_timeout(std::time::Duration::from_secs(config.generative.timeout_secs));
            self.resolver = self.resolver.with_classifier(classifier);
        }
        self
    }

    /// Ingest one receipt. Never fails: extractor, resolver and store
    /// problems become warnings on the receipt.
    pub async fn ingest(&self, raw: &RawReceipt, today: NaiveDate) -> IngestionOutcome {
        let start = Instant::now();
        let strategy = select_strategy(&raw.text);

        let regex = self.regex.parse(&raw.text);
        let generative = match &self.generative {
            Some(extractor) => extractor.extract(&raw.text, strategy.as_ref()).await,
            None => ParsedReceipt::failed(GenerationError::Disabled.to_string()),
        };

        let mut receipt = self
            .reconciler
            .reconcile(&regex, &generative, strategy.as_ref(), today);
        let adjustments = self.verifier.verify_receipt(&mut receipt);

        let mut entries = Vec::with_capacity(receipt.items.len());
        let mut warnings = Vec::new();

        for item in &receipt.items {
            if item.is_negative() {
                warnings.push(format!("skipped non-product line '{}'", item.raw_name));
                entries.push(IngestedItem {
                    item: item.clone(),
                    resolution: None,
                    pantry: None,
                });
                continue;
            }

            let resolution = match self.resolver.resolve(&item.raw_name).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!(item = %item.raw_name, error = %e, "Could not resolve product");
                    warnings.push(format!("could not resolve '{}': {e}", item.raw_name));
                    entries.push(IngestedItem {
                        item: item.clone(),
                        resolution: None,
                        pantry: None,
                    });
                    continue;
                }
            };

            let entry = self.pantry.create_entry(
                &resolution.product,
                resolution.category.as_ref(),
                item,
                receipt.purchase_date,
            );
            let entry = match self.store.insert_pantry_item(&entry) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(item = %item.raw_name, error = %e, "Could not store pantry entry");
                    warnings.push(format!("pantry entry for '{}' not stored: {e}", item.raw_name));
                    entry
                }
            };

            entries.push(IngestedItem {
                item: item.clone(),
                resolution: Some(resolution),
                pantry: Some(entry),
            });
        }
        receipt.warnings.extend(warnings);

        let outcome = IngestionOutcome {
            receipt,
            adjustments,
            entries,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            source = raw.source_hint.as_deref().unwrap_or("-"),
            store = %outcome.receipt.store,
            items = outcome.entries.len(),
            resolved = outcome.resolved_count(),
            new_products = outcome.new_product_count(),
            warnings = outcome.receipt.warnings.len(),
            elapsed_ms = outcome.processing_time_ms,
            "Receipt ingested"
        );

        outcome
    }
}

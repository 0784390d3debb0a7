//! Product identity resolution.
//!
//! A raw receipt name is resolved to a canonical [`Product`] by, in order:
//! exact alias, stemmed name, fuzzy token-sort similarity, and finally
//! creation. Matches other than the alias lookup record a new alias so the
//! next occurrence is an exact hit.

mod classifier;
mod similarity;
mod stemmer;

pub use classifier::{classify_by_keywords, clean_label, CategoryClassifier};
pub use similarity::token_sort_ratio;
pub use stemmer::{stem_name, stem_token};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ResolveError, StoreError};
use crate::models::config::NormalizationConfig;
use crate::models::product::{Category, NewProduct, Product};
use crate::receipt::GenerativeModel;
use crate::store::{ProductStore, StoreResult};

/// Which resolution step produced the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Alias,
    Stemmed,
    Fuzzy { score: u8 },
    Created,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Alias => write!(f, "alias"),
            MatchKind::Stemmed => write!(f, "stemmed"),
            MatchKind::Fuzzy { score } => write!(f, "fuzzy ({score})"),
            MatchKind::Created => write!(f, "created"),
        }
    }
}

/// A raw name bound to its canonical product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub product: Product,
    pub is_new: bool,
    pub matched_by: MatchKind,
    /// The product's category, if it has one after classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// Maps raw receipt names to canonical products.
#[derive(Clone)]
pub struct ProductResolver {
    store: Arc<dyn ProductStore>,
    classifier: CategoryClassifier,
    fuzzy_threshold: u8,
    max_attempts: u32,
}

impl ProductResolver {
    /// Resolver with default settings and keyword-only classification.
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self::from_config(store, &NormalizationConfig::default())
    }

    pub fn from_config(store: Arc<dyn ProductStore>, config: &NormalizationConfig) -> Self {
        Self {
            store,
            classifier: CategoryClassifier::new(),
            fuzzy_threshold: config.fuzzy_threshold,
            max_attempts: config.max_resolve_attempts.max(1),
        }
    }

    /// Use a custom classifier (e.g. one backed by a model).
    pub fn with_classifier(mut self, classifier: CategoryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Ask `model` for a category when the keyword table has no answer.
    pub fn with_model(self, model: Arc<dyn GenerativeModel>) -> Self {
        let classifier = self.classifier.clone().with_model(model);
        self.with_classifier(classifier)
    }

    pub fn with_fuzzy_threshold(mut self, threshold: u8) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Resolve a raw name, creating the product if nothing matches.
    ///
    /// A uniqueness conflict means another writer got there first; the whole
    /// resolution restarts so the winner's row is found.
    pub async fn resolve(&self, raw_name: &str) -> Result<Resolution, ResolveError> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(ResolveError::EmptyName);
        }

        for attempt in 1..=self.max_attempts {
            match self.try_resolve(name) {
                Ok(mut resolution) => {
                    self.ensure_category(&mut resolution).await?;
                    return Ok(resolution);
                }
                Err(StoreError::Conflict { entity, key }) => {
                    debug!(attempt, entity, key = %key, "Lost creation race, retrying resolution");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(name, attempts = self.max_attempts, "Giving up on contended product name");
        Err(ResolveError::RetriesExhausted {
            name: name.to_string(),
            attempts: self.max_attempts,
        })
    }

    fn try_resolve(&self, name: &str) -> StoreResult<Resolution> {
        if let Some(alias) = self.store.find_alias(name)? {
            let product = self.store.product(alias.product_id)?.ok_or(StoreError::NotFound {
                entity: "product",
                id: alias.product_id,
            })?;
            return Ok(Resolution {
                product,
                is_new: false,
                matched_by: MatchKind::Alias,
                category: None,
            });
        }

        let products = self.store.products()?;

        let stem = stem_name(name);
        let stemmed = products.iter().find(|p| {
            p.normalized_name == name || (!stem.is_empty() && stem_name(&p.normalized_name) == stem)
        });
        if let Some(product) = stemmed {
            self.store.insert_alias(name, product.id)?;
            info!(raw = name, product = %product.normalized_name, "Resolved by stemmed name");
            return Ok(Resolution {
                product: product.clone(),
                is_new: false,
                matched_by: MatchKind::Stemmed,
                category: None,
            });
        }

        // Highest score wins; ties go to the oldest product
        let best = products
            .iter()
            .map(|p| (p, token_sort_ratio(name, &p.normalized_name)))
            .fold(None::<(&Product, u8)>, |best, (p, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((p, score)),
            });

        if let Some((product, score)) = best {
            if score >= self.fuzzy_threshold {
                self.store.insert_alias(name, product.id)?;
                info!(raw = name, product = %product.normalized_name, score, "Resolved by fuzzy match");
                return Ok(Resolution {
                    product: product.clone(),
                    is_new: false,
                    matched_by: MatchKind::Fuzzy { score },
                    category: None,
                });
            }
            debug!(raw = name, best = %product.normalized_name, score, "Best fuzzy candidate below threshold");
        }

        let product = self.store.insert_product(&NewProduct::named(name))?;
        match self.store.insert_alias(name, product.id) {
            // A concurrent resolver already bound this name to the product by exact match
            Ok(_) | Err(StoreError::Conflict { .. }) => {}
            Err(e) => return Err(e),
        }
        info!(raw = name, id = product.id, "Created product");

        Ok(Resolution {
            product,
            is_new: true,
            matched_by: MatchKind::Created,
            category: None,
        })
    }

    /// Load the product's category, classifying it first when it has none.
    async fn ensure_category(&self, resolution: &mut Resolution) -> StoreResult<()> {
        if let Some(category_id) = resolution.product.category_id {
            resolution.category = self.store.category(category_id)?;
            return Ok(());
        }

        let Some(label) = self.classifier.classify(&resolution.product.normalized_name).await else {
            debug!(product = %resolution.product.normalized_name, "Product left uncategorised");
            return Ok(());
        };

        let category = self.store.find_or_create_category(&label)?;
        resolution.product = self
            .store
            .set_product_category(resolution.product.id, category.id)?;
        resolution.category = Some(category);
        Ok(())
    }
}

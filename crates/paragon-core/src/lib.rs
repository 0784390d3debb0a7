//! Core library for Polish receipt ingestion.
//!
//! This crate provides:
//! - Regex and generative-model receipt extraction, reconciled field by field
//! - Arithmetic verification of line items (hidden discounts, misread totals)
//! - Store-specific post-processing (Lidl, Biedronka, Auchan)
//! - Product identity resolution (alias, stemmed, fuzzy) with category inference
//! - Pantry entries with expiration estimates
//! - Product stores (in-memory and SQLite)

pub mod error;
pub mod models;
pub mod normalize;
pub mod pantry;
pub mod pipeline;
pub mod receipt;
pub mod store;
pub mod strategy;
pub mod text;

pub use error::{ParagonError, Result};
pub use models::config::ParagonConfig;
pub use models::pantry::{PantryItem, PantryStatus};
pub use models::product::{Category, CategoryKind, Product, ProductAlias};
pub use models::receipt::{ItemsSource, ParsedItem, ParsedReceipt, RawReceipt, ReconciledReceipt};
pub use normalize::{MatchKind, ProductResolver, Resolution};
pub use pantry::PantryLifecycle;
pub use pipeline::{IngestedItem, IngestionOutcome, ReceiptPipeline};
pub use receipt::{
    ConsistencyVerifier, GenerationRequest, GenerativeExtractor, GenerativeModel, ReceiptParser,
    Reconciler, RegexReceiptParser,
};
pub use store::{MemoryStore, ProductStore};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use strategy::{select_strategy, ReceiptStrategy, StoreKind};
pub use text::{extract_text, read_receipt};

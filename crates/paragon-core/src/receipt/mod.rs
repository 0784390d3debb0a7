//! Receipt extraction: the rule-based and generative extractors, the
//! reconciliation engine that merges them and the arithmetic verifier.

pub mod generative;
mod reconcile;
mod regex_parser;
pub mod rules;
mod verify;

pub use generative::{
    GenerationRequest, GenerativeExtractor, GenerativeItem, GenerativeModel, GenerativeOutcome,
    GenerativeReceipt,
};
pub use reconcile::Reconciler;
pub use regex_parser::RegexReceiptParser;
pub use verify::{AdjustmentKind, ConsistencyVerifier, VerificationAdjustment};

use crate::models::receipt::ParsedReceipt;

/// Trait for deterministic receipt parsers.
pub trait ReceiptParser {
    /// Parse a receipt from OCR text. Never fails; missing fields stay empty.
    fn parse(&self, text: &str) -> ParsedReceipt;
}

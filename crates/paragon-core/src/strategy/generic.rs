//! Fallback for shops without dedicated handling.

use super::{retailer_prompt, ReceiptStrategy, StoreKind};

const GENERIC_NOTES: &str = r#"The shop is not known in advance; read its name from the receipt header.
If a discount appears as a separate negative line, report it as its own item."#;

/// Unknown shops: no item clean-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericStrategy;

impl ReceiptStrategy for GenericStrategy {
    fn store(&self) -> StoreKind {
        StoreKind::Generic
    }

    fn system_prompt(&self) -> String {
        retailer_prompt(GENERIC_NOTES)
    }
}

//! Arithmetic consistency checks on reconciled line items.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::config::VerificationConfig;
use crate::models::receipt::{ParsedItem, ReconciledReceipt};

/// What the verifier changed on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Non-positive quantity reset to 1.
    QuantityDefaulted,
    /// Unit price derived as `total / quantity`.
    UnitPriceDerived,
    /// Printed total below `quantity × unit_price`: the gap is a discount.
    HiddenDiscount,
    /// Printed total above `quantity × unit_price`: the total was misread.
    TotalCorrected,
    /// Amounts too large to check; the item was dropped.
    Rejected,
}

/// One repair, for logs and receipt warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationAdjustment {
    /// Index of the item in the receipt.
    pub index: usize,
    pub item: String,
    pub kind: AdjustmentKind,
    /// Value of the adjusted field before the repair.
    pub before: Decimal,
    /// Value after the repair.
    pub after: Decimal,
}

impl fmt::Display for VerificationAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AdjustmentKind::QuantityDefaulted => write!(
                f,
                "item {} '{}': quantity {} reset to {}",
                self.index, self.item, self.before, self.after
            ),
            AdjustmentKind::UnitPriceDerived => write!(
                f,
                "item {} '{}': unit price derived as {}",
                self.index, self.item, self.after
            ),
            AdjustmentKind::HiddenDiscount => write!(
                f,
                "item {} '{}': hidden discount {} inferred (discount {} -> {})",
                self.index,
                self.item,
                self.after.checked_sub(self.before).unwrap_or_default(),
                self.before,
                self.after
            ),
            AdjustmentKind::TotalCorrected => write!(
                f,
                "item {} '{}': total {} corrected to {}",
                self.index, self.item, self.before, self.after
            ),
            AdjustmentKind::Rejected => write!(
                f,
                "item {} '{}': amounts out of range, item dropped (total {})",
                self.index, self.item, self.before
            ),
        }
    }
}

/// Restores `quantity × unit_price − discount ≈ price_after_discount` on every item.
#[derive(Debug, Clone)]
pub struct ConsistencyVerifier {
    tolerance: Decimal,
}

impl ConsistencyVerifier {
    pub fn new() -> Self {
        Self::from_config(&VerificationConfig::default())
    }

    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            tolerance: config.tolerance,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify a reconciled receipt, appending each repair to its warnings.
    pub fn verify_receipt(&self, receipt: &mut ReconciledReceipt) -> Vec<VerificationAdjustment> {
        let adjustments = self.verify(&mut receipt.items);
        receipt
            .warnings
            .extend(adjustments.iter().map(ToString::to_string));
        adjustments
    }

    /// Verify items in place and return the repairs made. Items whose
    /// arithmetic overflows are removed.
    pub fn verify(&self, items: &mut Vec<ParsedItem>) -> Vec<VerificationAdjustment> {
        let mut adjustments = Vec::new();
        let mut index = 0;
        items.retain_mut(|item| {
            let keep = self.verify_item(index, item, &mut adjustments);
            index += 1;
            keep
        });
        adjustments
    }

    fn verify_item(
        &self,
        index: usize,
        item: &mut ParsedItem,
        adjustments: &mut Vec<VerificationAdjustment>,
    ) -> bool {
        let mut record = |item: &ParsedItem, kind, before, after| {
            let adjustment = VerificationAdjustment {
                index,
                item: item.raw_name.clone(),
                kind,
                before,
                after,
            };
            info!(
                item = %adjustment.item,
                kind = ?kind,
                before = %before,
                after = %after,
                "Verifier adjusted item"
            );
            adjustments.push(adjustment);
        };

        if item.quantity <= Decimal::ZERO {
            let before = item.quantity;
            item.quantity = Decimal::ONE;
            record(item, AdjustmentKind::QuantityDefaulted, before, item.quantity);
        }

        let unit_price = match item.unit_price {
            Some(price) => Some(price),
            None => item.total_price.checked_div(item.quantity).map(|price| {
                let derived = price.round_dp(4).normalize();
                item.unit_price = Some(derived);
                record(item, AdjustmentKind::UnitPriceDerived, Decimal::ZERO, derived);
                derived
            }),
        };

        let Some(repair) = unit_price.and_then(|price| self.repair(item, price)) else {
            warn!(item = %item.raw_name, total = %item.total_price, "Item amounts overflow, dropping it");
            record(item, AdjustmentKind::Rejected, item.total_price, Decimal::ZERO);
            return false;
        };

        match repair {
            Repair::HiddenDiscount { discount, paid } => {
                let before = item.discount;
                item.discount = discount;
                item.price_after_discount = paid;
                record(item, AdjustmentKind::HiddenDiscount, before, discount);
            }
            Repair::TotalCorrected { total, paid } => {
                let before = item.total_price;
                item.total_price = total;
                item.price_after_discount = paid;
                record(item, AdjustmentKind::TotalCorrected, before, total);
            }
            Repair::Settled(settled) => {
                let off = item
                    .price_after_discount
                    .checked_sub(settled)
                    .is_none_or(|gap| gap.abs() > self.tolerance);
                if off {
                    debug!(item = %item.raw_name, from = %item.price_after_discount, to = %settled, "Normalising price after discount");
                    item.price_after_discount = settled;
                }
            }
        }
        true
    }

    /// Work out the repair for an item, `None` if any step overflows.
    fn repair(&self, item: &ParsedItem, unit_price: Decimal) -> Option<Repair> {
        let expected = item.quantity.checked_mul(unit_price)?;

        let repair = if item.total_price < expected.checked_sub(self.tolerance)? {
            // Hidden discount on top of any printed one
            let gap = expected.checked_sub(item.total_price)?;
            Repair::HiddenDiscount {
                discount: item.discount.checked_add(gap)?,
                paid: item.total_price.checked_sub(item.discount)?,
            }
        } else if item.total_price > expected.checked_add(self.tolerance)? {
            Repair::TotalCorrected {
                total: expected,
                paid: expected.checked_sub(item.discount)?,
            }
        } else {
            Repair::Settled(item.total_price.checked_sub(item.discount)?)
        };
        Some(repair)
    }
}

enum Repair {
    HiddenDiscount { discount: Decimal, paid: Decimal },
    TotalCorrected { total: Decimal, paid: Decimal },
    Settled(Decimal),
}

impl Default for ConsistencyVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(name: &str, qty: &str, unit: &str, total: &str) -> ParsedItem {
        ParsedItem::new(name, d(total))
            .with_quantity(d(qty), None)
            .with_unit_price(Some(d(unit)))
    }

    fn assert_consistent(item: &ParsedItem) {
        let unit = item.unit_price.unwrap();
        let gap = item.quantity * unit - item.discount - item.price_after_discount;
        assert!(gap.abs() <= d("0.02"), "{item:?} off by {gap}");
    }

    #[test]
    fn test_consistent_item_untouched() {
        let mut items = vec![item("Mleko", "2", "3.49", "6.98")];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);
        assert!(adjustments.is_empty());
        assert_eq!(items[0].total_price, d("6.98"));
        assert_eq!(items[0].discount, Decimal::ZERO);
    }

    #[test]
    fn test_hidden_discount() {
        let mut items = vec![item("Jogurt", "2", "5.00", "8.00")];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);

        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].kind, AdjustmentKind::HiddenDiscount);
        assert_eq!(items[0].discount, d("2.00"));
        assert_eq!(items[0].price_after_discount, d("8.00"));
        assert_eq!(items[0].total_price, d("8.00"));
        assert_consistent(&items[0]);
    }

    #[test]
    fn test_hidden_discount_on_top_of_absorbed_one() {
        let mut jogurt = item("Jogurt", "2", "5.00", "8.00");
        jogurt.discount = d("1.00");
        jogurt.price_after_discount = d("7.00");
        let mut items = vec![jogurt];
        ConsistencyVerifier::new().verify(&mut items);
        assert_eq!(items[0].discount, d("3.00"));
        assert_eq!(items[0].price_after_discount, d("7.00"));
        assert_consistent(&items[0]);
    }

    #[test]
    fn test_over_read_total_corrected() {
        let mut items = vec![item("Masło", "1", "7.99", "79.90")];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);
        assert_eq!(adjustments[0].kind, AdjustmentKind::TotalCorrected);
        assert_eq!(adjustments[0].before, d("79.90"));
        assert_eq!(items[0].total_price, d("7.99"));
        assert_eq!(items[0].price_after_discount, d("7.99"));
        assert_consistent(&items[0]);
    }

    #[test]
    fn test_weighted_item_within_tolerance() {
        let mut items = vec![item("Banany", "0.365", "5.99", "2.19")];
        assert!(ConsistencyVerifier::new().verify(&mut items).is_empty());
        assert_consistent(&items[0]);
    }

    #[test]
    fn test_missing_unit_price_derived() {
        let mut items = vec![ParsedItem::new("Ser", d("10.00"))
            .with_quantity(d("3"), None)
            .with_unit_price(None)];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);
        assert_eq!(adjustments[0].kind, AdjustmentKind::UnitPriceDerived);
        assert_eq!(items[0].unit_price, Some(d("3.3333")));
        assert_consistent(&items[0]);
    }

    #[test]
    fn test_stale_price_after_discount_normalised() {
        let mut stale = item("Kawa", "1", "29.99", "29.99");
        stale.discount = d("5.00");
        stale.price_after_discount = d("29.99");
        let mut items = vec![stale];
        ConsistencyVerifier::new().verify(&mut items);
        assert_eq!(items[0].price_after_discount, d("24.99"));
    }

    #[test]
    fn test_zero_quantity_reset() {
        let mut items = vec![item("Chleb", "0", "4.99", "4.99")];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);
        assert_eq!(adjustments[0].kind, AdjustmentKind::QuantityDefaulted);
        assert_eq!(items[0].quantity, Decimal::ONE);
        assert_consistent(&items[0]);
    }

    #[test]
    fn test_overflowing_item_dropped() {
        let huge = ParsedItem::new("Chleb", d("5.00"))
            .with_quantity(d("99999999999999999999"), None)
            .with_unit_price(Some(d("99999999999.99")));
        let mut items = vec![huge, item("Mleko", "2", "3.49", "6.98")];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);

        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].kind, AdjustmentKind::Rejected);
        assert_eq!(adjustments[0].index, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].raw_name, "Mleko");
    }

    #[test]
    fn test_underivable_unit_price_dropped() {
        let mut items = vec![ParsedItem::new("Ser", Decimal::MAX)
            .with_quantity(d("0.001"), None)
            .with_unit_price(None)];
        let adjustments = ConsistencyVerifier::new().verify(&mut items);
        assert_eq!(adjustments[0].kind, AdjustmentKind::Rejected);
        assert!(adjustments[0].to_string().contains("item dropped"));
        assert!(items.is_empty());
    }

    #[test]
    fn test_adjustments_become_warnings() {
        let mut receipt = ReconciledReceipt {
            shop_name: "Lidl".to_string(),
            purchase_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            total_amount: d("8.00"),
            tax_id: None,
            items: vec![item("Jogurt", "2", "5.00", "8.00")],
            items_source: crate::models::receipt::ItemsSource::Regex,
            store: crate::strategy::StoreKind::Lidl,
            warnings: vec![],
        };
        let adjustments = ConsistencyVerifier::new().verify_receipt(&mut receipt);
        assert_eq!(receipt.warnings.len(), 1);
        assert_eq!(receipt.warnings[0], adjustments[0].to_string());
        assert!(receipt.warnings[0].contains("hidden discount 2.00"));
    }
}

//! Pantry inventory entries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PantryError;
use super::product::ProductId;

/// Lifecycle state of a pantry entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PantryStatus {
    #[default]
    InStock,
    Consumed,
    Wasted,
}

impl PantryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PantryStatus::InStock => "in_stock",
            PantryStatus::Consumed => "consumed",
            PantryStatus::Wasted => "wasted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "in_stock" => Some(PantryStatus::InStock),
            "consumed" => Some(PantryStatus::Consumed),
            "wasted" => Some(PantryStatus::Wasted),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PantryStatus::InStock)
    }
}

impl std::fmt::Display for PantryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased product sitting in the pantry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    /// Storage id, once persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub product_id: ProductId,
    pub quantity: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    pub purchase_date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,

    pub status: PantryStatus,
}

impl PantryItem {
    /// Use up part of the item. Reaching zero marks it consumed.
    pub fn consume(&mut self, amount: Decimal) -> Result<(), PantryError> {
        if self.status.is_terminal() {
            return Err(PantryError::InvalidTransition {
                from: self.status.as_str(),
                to: PantryStatus::Consumed.as_str(),
            });
        }
        if amount <= Decimal::ZERO {
            return Err(PantryError::InvalidAmount(amount.to_string()));
        }

        self.quantity = (self.quantity - amount).max(Decimal::ZERO);
        if self.quantity.is_zero() {
            self.status = PantryStatus::Consumed;
        }
        Ok(())
    }

    /// Throw the remainder away.
    pub fn mark_wasted(&mut self) -> Result<(), PantryError> {
        if self.status.is_terminal() {
            return Err(PantryError::InvalidTransition {
                from: self.status.as_str(),
                to: PantryStatus::Wasted.as_str(),
            });
        }
        self.status = PantryStatus::Wasted;
        Ok(())
    }

    /// Whether the item is past its expiration date on `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|d| d < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(quantity: i64) -> PantryItem {
        PantryItem {
            id: None,
            product_id: 1,
            quantity: Decimal::from(quantity),
            unit: Some("szt".to_string()),
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            expiration_date: NaiveDate::from_ymd_opt(2024, 3, 8),
            status: PantryStatus::InStock,
        }
    }

    #[test]
    fn test_partial_then_full_consumption() {
        let mut entry = item(2);
        entry.consume(Decimal::ONE).unwrap();
        assert_eq!(entry.status, PantryStatus::InStock);
        assert_eq!(entry.quantity, Decimal::ONE);

        entry.consume(Decimal::ONE).unwrap();
        assert_eq!(entry.status, PantryStatus::Consumed);
        assert!(entry.quantity.is_zero());
    }

    #[test]
    fn test_no_transition_out_of_terminal_state() {
        let mut entry = item(1);
        entry.mark_wasted().unwrap();
        assert_eq!(
            entry.consume(Decimal::ONE),
            Err(PantryError::InvalidTransition {
                from: "wasted",
                to: "consumed"
            })
        );
        assert!(entry.mark_wasted().is_err());
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let mut entry = item(1);
        assert!(matches!(
            entry.consume(Decimal::ZERO),
            Err(PantryError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_expiry_check() {
        let entry = item(1);
        assert!(!entry.is_expired(NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()));
        assert!(entry.is_expired(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PantryStatus::from_str("IN_STOCK"), Some(PantryStatus::InStock));
        assert_eq!(PantryStatus::from_str("gone"), None);
    }
}

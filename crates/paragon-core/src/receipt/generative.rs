//! Adapter over an external generative model that reads receipts as JSON.
//!
//! The model is a black box: prompt in, text out. Its answer is parsed
//! leniently (bare JSON, fenced JSON, JSON buried in chatter) into a tagged
//! [`GenerativeOutcome`], then repaired by a few deterministic rules before it
//! becomes a [`ParsedReceipt`].

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::models::config::GenerativeConfig;
use crate::models::receipt::{checked_sum, ParsedItem, ParsedReceipt};
use crate::strategy::{ReceiptStrategy, StoreKind};

use super::rules::{parse_amount, parse_date_str};

/// One prompt sent to the model service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Retailer-specific instructions.
    pub system_prompt: String,
    /// Raw receipt text.
    pub user_text: String,
}

/// A text-completion service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send one request and return the raw reply text.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// An item as read by the model, after numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerativeItem {
    pub name: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub total_price: Decimal,
}

/// A validated model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerativeReceipt {
    pub shop_name: Option<String>,
    pub date: Option<String>,
    pub total_amount: Option<Decimal>,
    pub items: Vec<GenerativeItem>,
}

/// Result of one generative extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerativeOutcome {
    /// The reply parsed into a receipt.
    Parsed(GenerativeReceipt),
    /// The call or the parse failed; `raw` keeps whatever the model said.
    Failed { reason: String, raw: String },
}

impl GenerativeOutcome {
    /// Parse a raw model reply.
    pub fn from_response(raw: &str) -> Self {
        match locate_json_object(raw) {
            Some(value) => GenerativeOutcome::Parsed(GenerativeReceipt::from_value(&value)),
            None => GenerativeOutcome::Failed {
                reason: "response is not a JSON object".to_string(),
                raw: raw.to_string(),
            },
        }
    }

    /// Repair and convert into the common receipt shape.
    ///
    /// A failure becomes an empty receipt with `error` set.
    pub fn into_parsed_receipt(self, raw_text: &str) -> ParsedReceipt {
        match self {
            GenerativeOutcome::Parsed(receipt) => receipt.repaired(raw_text).into_parsed_receipt(),
            GenerativeOutcome::Failed { reason, .. } => ParsedReceipt::failed(reason),
        }
    }
}

impl GenerativeReceipt {
    /// Build from loosely typed JSON, coercing every numeric field.
    pub fn from_value(value: &Value) -> Self {
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(GenerativeItem::from_value).collect())
            .unwrap_or_default();

        Self {
            shop_name: non_empty_str(value.get("shop_name")),
            date: non_empty_str(value.get("date")),
            total_amount: value.get("total_amount").and_then(coerce_decimal),
            items,
        }
    }

    /// Apply the repair rules. Each rule is idempotent.
    pub fn repaired(mut self, raw_text: &str) -> Self {
        // Retailer keywords in the raw text beat the model's guess
        if let Some(name) = StoreKind::detect(raw_text).display_name() {
            let reflected = self
                .shop_name
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&name.to_lowercase()));
            if !reflected {
                debug!(model = ?self.shop_name, corrected = name, "Correcting shop name");
                self.shop_name = Some(name.to_string());
            }
        }

        let missing_total = self.total_amount.is_none_or(|t| t.is_zero());
        if missing_total && !self.items.is_empty() {
            match checked_sum(self.items.iter().map(|i| i.total_price)) {
                Some(sum) => {
                    debug!(total = %sum, "Recomputing missing total from items");
                    self.total_amount = Some(sum);
                }
                None => debug!("Item totals overflow, leaving total unset"),
            }
        }

        self
    }

    /// Convert into the common receipt shape.
    pub fn into_parsed_receipt(self) -> ParsedReceipt {
        let purchase_date = self.date.as_deref().and_then(parse_date_str);
        let items = self
            .items
            .into_iter()
            .map(|item| {
                ParsedItem::new(item.name, item.total_price)
                    .with_quantity(item.quantity, None)
                    .with_unit_price(item.price)
            })
            .collect();

        ParsedReceipt {
            shop_name: self.shop_name,
            purchase_date,
            total_amount: self.total_amount,
            tax_id: None,
            items,
            error: None,
        }
    }
}

impl GenerativeItem {
    /// Coerce one item. Items without a name are dropped; bad numbers fall
    /// back to quantity 1, no unit price and `quantity × price` total, or 0
    /// when that product does not fit.
    pub fn from_value(value: &Value) -> Option<Self> {
        let name = non_empty_str(value.get("name"))?;
        let quantity = value
            .get("quantity")
            .and_then(coerce_decimal)
            .filter(|q| *q > Decimal::ZERO)
            .unwrap_or(Decimal::ONE);
        let price = value
            .get("price")
            .and_then(coerce_decimal)
            .filter(|p| !p.is_sign_negative());
        let total_price = value
            .get("total_price")
            .and_then(coerce_decimal)
            .or_else(|| price.and_then(|p| quantity.checked_mul(p)))
            .unwrap_or(Decimal::ZERO);

        Some(Self {
            name,
            quantity,
            price,
            total_price,
        })
    }
}

/// Runs the generative model with a strategy prompt and a time budget.
#[derive(Clone)]
pub struct GenerativeExtractor {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
    max_input_chars: usize,
}

impl GenerativeExtractor {
    /// Create an extractor with the default time budget.
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self::from_config(model, &GenerativeConfig::default())
    }

    /// Create an extractor from service settings.
    pub fn from_config(model: Arc<dyn GenerativeModel>, config: &GenerativeConfig) -> Self {
        Self {
            model,
            timeout: Duration::from_secs(config.timeout_secs),
            max_input_chars: config.max_input_chars,
        }
    }

    /// Set the per-call time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Call the model and parse its reply. Never fails; problems become
    /// [`GenerativeOutcome::Failed`].
    pub async fn run(&self, text: &str, strategy: &dyn ReceiptStrategy) -> GenerativeOutcome {
        if text.trim().is_empty() {
            return GenerativeOutcome::Failed {
                reason: "empty receipt text".to_string(),
                raw: String::new(),
            };
        }

        let request = GenerationRequest {
            system_prompt: strategy.system_prompt(),
            user_text: truncate_chars(text, self.max_input_chars).to_string(),
        };

        match tokio::time::timeout(self.timeout, self.model.complete(&request)).await {
            Ok(Ok(raw)) => GenerativeOutcome::from_response(&raw),
            Ok(Err(e)) => {
                warn!(error = %e, "Generative extraction failed");
                GenerativeOutcome::Failed {
                    reason: e.to_string(),
                    raw: String::new(),
                }
            }
            Err(_) => {
                let e = GenerationError::Timeout(self.timeout.as_secs());
                warn!(error = %e, "Generative extraction timed out");
                GenerativeOutcome::Failed {
                    reason: e.to_string(),
                    raw: String::new(),
                }
            }
        }
    }

    /// Call the model and return a repaired receipt.
    pub async fn extract(&self, text: &str, strategy: &dyn ReceiptStrategy) -> ParsedReceipt {
        let outcome = self.run(text, strategy).await;
        if let GenerativeOutcome::Failed { reason, raw } = &outcome {
            debug!(reason = %reason, raw_len = raw.len(), "Generative outcome unusable");
        }
        outcome.into_parsed_receipt(text)
    }
}

/// Find a JSON object in a model reply: as-is, then without markdown
/// fences, then the first balanced `{...}` span.
fn locate_json_object(raw: &str) -> Option<Value> {
    let parse = |s: &str| serde_json::from_str::<Value>(s).ok().filter(Value::is_object);

    let trimmed = raw.trim();
    if let Some(value) = parse(trimmed) {
        return Some(value);
    }

    let stripped = trimmed
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Some(value) = parse(stripped) {
        return Some(value);
    }

    first_balanced_object(stripped).and_then(parse)
}

/// First `{...}` span with balanced braces, ignoring braces inside strings.
fn first_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Numbers, or numeric strings in either decimal convention.
fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()
        }
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

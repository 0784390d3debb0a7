use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

use paragon_core::error::GenerationError;
use paragon_core::receipt::AdjustmentKind;
use paragon_core::{
    GenerationRequest, GenerativeModel, ItemsSource, MatchKind, MemoryStore, PantryStatus,
    ParagonConfig, ProductStore, RawReceipt, ReceiptPipeline, StoreKind,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
}

/// Replies with a fixed text and remembers the prompts it saw.
struct ScriptedModel {
    reply: String,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.system_prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }
}

fn pipeline_with(store: Arc<MemoryStore>, model: Arc<ScriptedModel>) -> ReceiptPipeline {
    let mut config = ParagonConfig::default();
    config.normalization.use_model_classifier = false;
    ReceiptPipeline::new(&config, store).with_model(&config, model)
}

const LIDL_RECEIPT: &str = "\
LIDL sp. z o.o. sp. k.
NIP 781-18-97-358
2024-03-15 18:42
Chleb razowy 4,99 C
Mleko 3,2% 1L 2 szt x 3,49 6,98 C
Ser Gouda plastry 9,79 C
SUMA PLN 21.76
";

#[tokio::test]
async fn regex_items_win_when_they_match_the_total() {
    let store = Arc::new(MemoryStore::new());
    // The model misreads a price; the regex sum matches the printed total.
    let model = ScriptedModel::new(
        r#"{"shop_name": "Lidl", "date": "2024-03-15", "total_amount": 21.76,
            "items": [{"name": "Chleb", "quantity": 1, "price": 49.9, "total_price": 49.9}]}"#,
    );
    let pipeline = pipeline_with(store.clone(), model.clone());

    let outcome = pipeline.ingest(&RawReceipt::new(LIDL_RECEIPT), today()).await;
    let receipt = &outcome.receipt;

    assert_eq!(receipt.items_source, ItemsSource::Regex);
    assert_eq!(receipt.total_amount, d("21.76"));
    assert_eq!(receipt.store, StoreKind::Lidl);
    assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    assert_eq!(receipt.tax_id.as_deref(), Some("7811897358"));
    assert_eq!(receipt.items.len(), 3);

    assert_eq!(outcome.entries.len(), 3);
    assert_eq!(outcome.new_product_count(), 3);
    assert_eq!(store.pantry_items().unwrap().len(), 3);

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Lidl"));
}

#[tokio::test]
async fn generative_items_used_when_regex_finds_none() {
    let store = Arc::new(MemoryStore::new());
    let model = ScriptedModel::new(
        "```json\n{\"shop_name\": \"Sklep U Ani\", \"date\": \"2024-03-10\", \"total_amount\": 18.50,\n\
         \"items\": [{\"name\": \"Chleb wiejski\", \"quantity\": 1, \"price\": 6.50, \"total_price\": 6.50},\n\
         {\"name\": \"Masło ekstra\", \"quantity\": 1, \"price\": 12.00, \"total_price\": 12.00}]}\n```",
    );
    let pipeline = pipeline_with(store, model);

    let raw = RawReceipt::new("Sklep osiedlowy\nzakupy spozywcze\ndziekujemy");
    let outcome = pipeline.ingest(&raw, today()).await;
    let receipt = &outcome.receipt;

    assert_eq!(receipt.items_source, ItemsSource::Generative);
    assert_eq!(receipt.total_amount, d("18.50"));
    assert_eq!(receipt.shop_name, "Sklep U Ani");
    assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    assert_eq!(receipt.items.len(), 2);
    assert_eq!(receipt.items_paid(), Some(d("18.50")));
    assert!(receipt.warnings.is_empty(), "{:?}", receipt.warnings);
}

#[tokio::test]
async fn hidden_discount_is_inferred() {
    let store = Arc::new(MemoryStore::new());
    let model = ScriptedModel::new(
        r#"{"shop_name": "Sklep", "total_amount": 8.00,
            "items": [{"name": "Jogurt naturalny", "quantity": 2, "price": 5.00, "total_price": 8.00}]}"#,
    );
    let pipeline = pipeline_with(store, model);

    let outcome = pipeline
        .ingest(&RawReceipt::new("Sklep osiedlowy\ndziekujemy"), today())
        .await;
    let item = &outcome.receipt.items[0];

    assert_eq!(item.discount, d("2.00"));
    assert_eq!(item.price_after_discount, d("8.00"));
    assert_eq!(item.total_price, d("8.00"));
    assert_eq!(outcome.adjustments.len(), 1);
    assert_eq!(outcome.adjustments[0].kind, AdjustmentKind::HiddenDiscount);
    // No date anywhere: the ingestion date is used
    assert_eq!(outcome.receipt.purchase_date, today());
}

#[tokio::test]
async fn discount_line_folds_into_previous_item() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = ReceiptPipeline::new(&ParagonConfig::default(), store.clone());

    let raw = RawReceipt::new(
        "BIEDRONKA\nJeronimo Martins Polska S.A.\n12.03.2024\nKawa mielona 500g 18,99 A\nRabat -4,00\nSUMA PLN 14,99",
    );
    let outcome = pipeline.ingest(&raw, today()).await;
    let receipt = &outcome.receipt;

    assert_eq!(receipt.store, StoreKind::Biedronka);
    assert_eq!(receipt.items_source, ItemsSource::Regex);
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].discount, d("4.00"));
    assert_eq!(receipt.items[0].price_after_discount, d("14.99"));
    assert_eq!(receipt.items_paid(), Some(receipt.total_amount));

    // Without a model the receipt still ingests, with a warning
    assert!(receipt
        .warnings
        .iter()
        .any(|w| w.contains("generative extraction disabled")));
    assert_eq!(store.products().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_model_numbers_are_dropped() {
    let store = Arc::new(MemoryStore::new());
    let model = ScriptedModel::new(r#"{"items": [{"name": "Chleb", "quantity": 1e20, "price": 1e20}]}"#);
    let pipeline = pipeline_with(store.clone(), model);

    let outcome = pipeline.ingest(&RawReceipt::new("Sklep\nparagon fiskalny"), today()).await;

    assert_eq!(outcome.receipt.items_source, ItemsSource::Generative);
    assert!(outcome.receipt.items.is_empty());
    assert!(outcome
        .adjustments
        .iter()
        .any(|a| a.kind == AdjustmentKind::Rejected));
    assert!(store.pantry_items().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_ocr_quantity_is_not_multiplied() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = ReceiptPipeline::new(&ParagonConfig::default(), store);

    let raw = RawReceipt::new("Sklep\nChleb 99999999999999999999 szt x 99999999999,99 5,00 C\nSUMA PLN 5,00");
    let outcome = pipeline.ingest(&raw, today()).await;
    let receipt = &outcome.receipt;

    assert_eq!(receipt.total_amount, d("5.00"));
    assert!(receipt.items.iter().all(|item| item.quantity == Decimal::ONE));
    assert!(receipt.items_paid().is_some());
}

#[tokio::test]
async fn repeated_name_resolves_to_same_product() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = ReceiptPipeline::new(&ParagonConfig::default(), store.clone());
    let raw = RawReceipt::new("Sklep\nMleko UHT 3,2% Łaciate 1L 3,79 C\nSUMA PLN 3,79");

    let first = pipeline.ingest(&raw, today()).await;
    let first = first.entries[0].resolution.clone().unwrap();
    assert!(first.is_new);
    assert_eq!(first.matched_by, MatchKind::Created);

    let second = pipeline.ingest(&raw, today()).await;
    let second = second.entries[0].resolution.clone().unwrap();
    assert!(!second.is_new);
    assert_eq!(second.matched_by, MatchKind::Alias);
    assert_eq!(second.product.id, first.product.id);

    assert_eq!(store.products().unwrap().len(), 1);
    assert!(store.find_alias("Mleko UHT 3,2% Łaciate 1L").unwrap().is_some());

    let pantry = store.pantry_items().unwrap();
    assert_eq!(pantry.len(), 2);
    assert!(pantry.iter().all(|p| p.status == PantryStatus::InStock));
    // Dairy keeps for a week
    assert_eq!(pantry[0].expiration_date, NaiveDate::from_ymd_opt(2024, 4, 8));
}

#[tokio::test(start_paused = true)]
async fn slow_model_falls_back_to_regex() {
    let store = Arc::new(MemoryStore::new());
    let model = ScriptedModel::slow("{}", Duration::from_secs(120));
    let pipeline = pipeline_with(store, model);

    let outcome = pipeline.ingest(&RawReceipt::new(LIDL_RECEIPT), today()).await;

    assert_eq!(outcome.receipt.items_source, ItemsSource::Regex);
    assert_eq!(outcome.receipt.shop_name, "Lidl");
    assert!(outcome
        .receipt
        .warnings
        .iter()
        .any(|w| w.contains("timed out")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingestion_creates_each_product_once() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = ReceiptPipeline::new(&ParagonConfig::default(), store.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline.ingest(&RawReceipt::new(LIDL_RECEIPT), today()).await
        }));
    }

    let mut new_products = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.resolved_count(), 3);
        new_products += outcome.new_product_count();
    }

    assert_eq!(new_products, 3);
    assert_eq!(store.products().unwrap().len(), 3);
    assert_eq!(store.pantry_items().unwrap().len(), 24);
}

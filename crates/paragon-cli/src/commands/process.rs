//! Process command - ingest a single receipt file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use paragon_core::text::read_receipt;
use paragon_core::IngestionOutcome;

use super::{build_pipeline, load_config, open_store};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (OCR text dump or PDF with a text layer)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// SQLite database to persist products and pantry entries in
    #[arg(long)]
    db: Option<PathBuf>,

    /// Skip the generative model and trust regex extraction only
    #[arg(long)]
    no_llm: bool,

    /// Date used when the receipt has none (default: today)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Show verification adjustments and warnings
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    pb.set_message("Reading receipt...");
    let raw = read_receipt(&args.input)?;

    let store = open_store(args.db.as_ref())?;
    let pipeline = build_pipeline(&config, store, args.no_llm)?;

    pb.set_message("Extracting and resolving items...");
    let today = args.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let outcome = pipeline.ingest(&raw, today).await;

    pb.finish_and_clear();

    let output = format_outcome(&outcome, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_warnings {
        for adjustment in &outcome.adjustments {
            eprintln!("{} {}", style("ℹ").blue(), adjustment);
        }
        for warning in &outcome.receipt.warnings {
            eprintln!("{} {}", style("⚠").yellow(), warning);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_outcome(outcome: &IngestionOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &IngestionOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let receipt = &outcome.receipt;

    wtr.write_record([
        "shop_name",
        "purchase_date",
        "raw_name",
        "quantity",
        "unit",
        "unit_price",
        "total_price",
        "discount",
        "price_after_discount",
        "product",
        "matched_by",
        "category",
        "expiration_date",
    ])?;

    for entry in &outcome.entries {
        let item = &entry.item;
        let resolution = entry.resolution.as_ref();
        wtr.write_record([
            receipt.shop_name.as_str(),
            &receipt.purchase_date.to_string(),
            &item.raw_name,
            &item.quantity.to_string(),
            item.unit.as_deref().unwrap_or(""),
            &item.unit_price.map(|p| p.to_string()).unwrap_or_default(),
            &item.total_price.to_string(),
            &item.discount.to_string(),
            &item.price_after_discount.to_string(),
            resolution.map(|r| r.product.normalized_name.as_str()).unwrap_or(""),
            &resolution.map(|r| r.matched_by.to_string()).unwrap_or_default(),
            resolution
                .and_then(|r| r.category.as_ref())
                .map(|c| c.name.as_str())
                .unwrap_or(""),
            &entry
                .pantry
                .as_ref()
                .and_then(|p| p.expiration_date)
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &IngestionOutcome) -> String {
    let receipt = &outcome.receipt;
    let mut output = String::new();

    output.push_str(&format!("Shop: {}\n", receipt.shop_name));
    output.push_str(&format!("Date: {}\n", receipt.purchase_date));
    if let Some(tax_id) = &receipt.tax_id {
        output.push_str(&format!("NIP: {}\n", tax_id));
    }
    output.push_str(&format!("Items from: {} ({})\n", receipt.items_source, receipt.store));
    output.push('\n');

    for entry in &outcome.entries {
        let item = &entry.item;
        output.push_str(&format!("  {:<32} {:>8}", item.raw_name, item.price_after_discount));
        if !item.discount.is_zero() {
            output.push_str(&format!("  (-{})", item.discount));
        }
        if let Some(resolution) = &entry.resolution {
            output.push_str(&format!("  -> {} [{}]", resolution.product.normalized_name, resolution.matched_by));
        }
        output.push('\n');
    }

    output.push('\n');
    match receipt.items_paid() {
        Some(paid) => output.push_str(&format!("Items paid: {} PLN\n", paid)),
        None => output.push_str("Items paid: out of range\n"),
    }
    output.push_str(&format!("Total:      {} PLN\n", receipt.total_amount));
    output.push_str(&format!(
        "Products:   {} resolved, {} new\n",
        outcome.resolved_count(),
        outcome.new_product_count()
    ));

    output
}

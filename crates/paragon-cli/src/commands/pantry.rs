//! Pantry command - list, consume and waste stored pantry entries.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use console::style;
use rust_decimal::Decimal;

use paragon_core::models::pantry::PantryStatus;
use paragon_core::store::ProductStore;

use super::{load_config, open_database};

/// Arguments for the pantry command.
#[derive(Args)]
pub struct PantryArgs {
    /// Product database (default: the configured one)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: PantryCommand,
}

#[derive(Subcommand)]
enum PantryCommand {
    /// List pantry entries
    List {
        /// Include consumed and wasted entries
        #[arg(long)]
        all: bool,

        /// Only entries expiring on or before this date
        #[arg(long)]
        expiring_by: Option<NaiveDate>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Use up part of an entry (all of it when no amount is given)
    Consume {
        /// Pantry entry id
        id: i64,

        /// Amount to consume
        amount: Option<Decimal>,
    },

    /// Throw an entry away
    Waste {
        /// Pantry entry id
        id: i64,
    },
}

pub async fn run(args: PantryArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_database(&config, args.db)?;

    match args.command {
        PantryCommand::List { all, expiring_by, json } => list(store.as_ref(), all, expiring_by, json),
        PantryCommand::Consume { id, amount } => consume(store.as_ref(), id, amount),
        PantryCommand::Waste { id } => waste(store.as_ref(), id),
    }
}

fn list(
    store: &dyn ProductStore,
    all: bool,
    expiring_by: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    let items: Vec<_> = store
        .pantry_items()?
        .into_iter()
        .filter(|item| all || item.status == PantryStatus::InStock)
        .filter(|item| {
            expiring_by.is_none_or(|by| item.expiration_date.is_some_and(|d| d <= by))
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("{} Pantry is empty.", style("ℹ").blue());
        return Ok(());
    }

    let names: HashMap<i64, String> = store
        .products()?
        .into_iter()
        .map(|p| (p.id, p.normalized_name))
        .collect();
    let today = chrono::Local::now().date_naive();

    for item in &items {
        let name = names.get(&item.product_id).map(String::as_str).unwrap_or("?");
        let expires = item
            .expiration_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let expires = if item.is_expired(today) {
            style(expires).red()
        } else {
            style(expires).dim()
        };

        println!(
            "{:>5}  {:<32} {:>8} {:<4} {:<10} {}",
            item.id.map(|id| id.to_string()).unwrap_or_default(),
            name,
            item.quantity,
            item.unit.as_deref().unwrap_or(""),
            item.status,
            expires
        );
    }

    Ok(())
}

fn consume(store: &dyn ProductStore, id: i64, amount: Option<Decimal>) -> anyhow::Result<()> {
    let mut item = store
        .pantry_item(id)?
        .ok_or_else(|| anyhow::anyhow!("Pantry entry not found: {}", id))?;

    let amount = amount.unwrap_or(item.quantity);
    item.consume(amount)?;
    store.update_pantry_item(&item)?;

    println!(
        "{} Entry {}: {} left ({})",
        style("✓").green(),
        id,
        item.quantity,
        item.status
    );

    Ok(())
}

fn waste(store: &dyn ProductStore, id: i64) -> anyhow::Result<()> {
    let mut item = store
        .pantry_item(id)?
        .ok_or_else(|| anyhow::anyhow!("Pantry entry not found: {}", id))?;

    item.mark_wasted()?;
    store.update_pantry_item(&item)?;

    println!("{} Entry {} marked as wasted", style("✓").green(), id);

    Ok(())
}

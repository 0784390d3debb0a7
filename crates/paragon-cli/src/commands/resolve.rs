//! Resolve command - map raw receipt names to canonical products.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;

use paragon_core::ProductResolver;

use super::{load_config, open_database};
use crate::llm::ChatCompletionsClient;

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Raw product names as printed on receipts
    #[arg(required = true)]
    names: Vec<String>,

    /// Product database (default: the configured one)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Classify new products by keywords only
    #[arg(long)]
    no_llm: bool,

    /// Print resolutions as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ResolveArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_database(&config, args.db)?;

    let mut resolver = ProductResolver::from_config(store, &config.normalization);
    if !args.no_llm && config.generative.enabled && config.normalization.use_model_classifier {
        let client = ChatCompletionsClient::from_config(&config.generative)?;
        resolver = resolver.with_model(Arc::new(client));
    }

    let mut resolutions = Vec::with_capacity(args.names.len());
    for name in &args.names {
        let resolution = resolver.resolve(name).await?;
        if !args.json {
            let marker = if resolution.is_new {
                style("+").green()
            } else {
                style("=").blue()
            };
            println!(
                "{} {} -> {} (#{}, {}, {})",
                marker,
                name,
                resolution.product.normalized_name,
                resolution.product.id,
                resolution.matched_by,
                resolution
                    .category
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("uncategorized")
            );
        }
        resolutions.push(resolution);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolutions)?);
    }

    Ok(())
}

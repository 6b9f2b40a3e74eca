use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use inventory_client::api::HttpStore;
use inventory_client::config;
use inventory_client::shell::{format_currency, render_table};
use inventory_client::view::{derive, SortField, TableState, ViewQuery};

#[derive(Parser, Debug)]
#[command(about = "Print the product table (or a single product) and exit")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Show only the product with this id
    #[arg(long)]
    id: Option<i64>,

    /// Filter text
    #[arg(long, default_value = "")]
    filter: String,

    /// Sort column: id, name, price or quantity
    #[arg(long, default_value = "id")]
    sort: String,

    /// Sort descending
    #[arg(long)]
    desc: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load_or_default(Some(&args.config))?;
    let store = HttpStore::from_config(&cfg)?;

    if let Some(id) = args.id {
        let p = store
            .get(id)
            .await
            .with_context(|| format!("failed to fetch product {}", id))?;
        println!("ID:          {}", p.id);
        println!("Name:        {}", p.name);
        println!("Description: {}", p.description);
        println!("Price:       {}", format_currency(p.price));
        println!("Quantity:    {}", p.quantity);
        return Ok(());
    }

    let sort_field = SortField::parse(&args.sort)
        .with_context(|| format!("unknown sort column '{}'", args.sort))?;
    let mut query = ViewQuery {
        filter: args.filter,
        sort_field,
        ..Default::default()
    };
    if args.desc {
        query.direction = query.direction.flipped();
    }

    let products = store.list().await.context("failed to fetch products")?;
    let rows = derive(&products, &query);
    let state = if rows.is_empty() {
        TableState::Empty
    } else {
        TableState::Rows(rows)
    };
    println!("{}", render_table(&state, &query, products.len()));
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use inventory_client::api::HttpStore;
use inventory_client::config;
use inventory_client::inventory::Inventory;
use inventory_client::shell::{self, CommandError, Flow, LineConfirm};

#[derive(Debug, Parser)]
#[command(author, version, about = "Interactive inventory client for the /products API")]
struct Args {
    /// Path to YAML config file (defaults apply when it does not exist)
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load_or_default(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(url) = args.base_url {
        cfg.api.base_url = url;
        config::validate(&cfg)?;
    }

    let store = HttpStore::from_config(&cfg).context("failed to build HTTP client")?;
    info!(base_url = %store.base_url(), "starting inventory client");

    let mut view = Inventory::new(store, cfg.notice_ttl());
    let mut loading = view.loading();
    tokio::spawn(async move {
        while let Some(marker) = shell::loading_started(&mut loading).await {
            println!("{}", marker);
        }
    });
    view.mount().await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Flow::Continue(out) = shell::execute(&mut view, shell::Command::List, &mut LineConfirm::new(&mut lines)).await {
        println!("{}", out);
    }
    prompt();

    loop {
        tokio::select! {
            biased;

            channel = view.next_dismissal() => {
                debug!(?channel, "notice expired");
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match shell::parse(&line) {
                    Ok(command) => {
                        view.drain_notices();
                        let mut confirm = LineConfirm::new(&mut lines);
                        match shell::execute(&mut view, command, &mut confirm).await {
                            Flow::Continue(out) if !out.is_empty() => println!("{}", out),
                            Flow::Continue(_) => {}
                            Flow::Quit => break,
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(err) => println!("{}", err),
                }
                prompt();
            }
        }
    }

    info!("bye");
    Ok(())
}

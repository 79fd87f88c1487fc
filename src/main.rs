mod config;
mod credentials;
mod dirs;
mod download;
mod error;
mod fetch;
mod parser;
mod pipeline;
mod resource;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::credentials::Credentials;
use crate::fetch::HttpFetcher;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "parts_archiver", about = "Crawl a parts catalog into a directory tree")]
struct Cli {
    /// Settings file (TOML). Defaults to ./parts_archiver.toml when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Menu, listings, content and download over the whole catalog
    Run {
        /// Output base directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Cookie file (JSON object of name -> value)
        #[arg(long)]
        cookies: Option<PathBuf>,
        /// Concurrent requests per stage
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },
    /// Fetch and print the category menu only
    Menu {
        /// Cookie file (JSON object of name -> value)
        #[arg(long)]
        cookies: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            output,
            cookies,
            concurrency,
        } => {
            if let Some(output) = output {
                settings.output_dir = output;
            }
            if let Some(cookies) = cookies {
                settings.cookies_path = cookies;
            }
            if let Some(n) = concurrency {
                anyhow::ensure!(n > 0, "concurrency must be at least 1");
                settings.concurrency = n;
            }

            let credentials = Credentials::load(&settings.cookies_path)?;
            std::fs::create_dir_all(&settings.output_dir).with_context(|| {
                format!("Failed to create {}", settings.output_dir.display())
            })?;
            info!(
                "Archiving {} into {} ({} cookies, {} concurrent)",
                settings.base_url,
                settings.output_dir.display(),
                credentials.len(),
                settings.concurrency
            );

            let fetcher = Arc::new(HttpFetcher::new(&settings)?);
            let stats = Pipeline::new(fetcher, credentials, settings).run().await;
            println!("\n{}", stats);
        }
        Commands::Menu { cookies } => {
            if let Some(cookies) = cookies {
                settings.cookies_path = cookies;
            }
            let credentials = Credentials::load(&settings.cookies_path)?;
            let fetcher = Arc::new(HttpFetcher::new(&settings)?);
            let menu = Pipeline::new(fetcher, credentials, settings)
                .menu_stage()
                .await?;

            for category in menu.categories() {
                println!("{}", category.name);
                for sub in &category.subcategories {
                    println!("  {} -> {}", sub.name, sub.listing_url);
                }
            }
            println!(
                "\n{} categories, {} subcategories",
                menu.len(),
                menu.subcategories().count()
            );
        }
    }

    let elapsed = t0.elapsed();
    info!("Finished in {}", format_duration(elapsed));
    println!("Finished in {}", format_duration(elapsed));
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──

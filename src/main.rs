use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use journal_catalogue::catalogue::CatalogueFilter;
use journal_catalogue::store::CatalogueRow;
use journal_catalogue::{Pipeline, RefreshOptions, RsciFilter, Settings};

#[derive(Parser)]
#[command(name = "journals", about = "VAK journal catalogue with RSCI inclusion and levels")]
struct Cli {
    /// Settings file (default: ./journals.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect both listings, flag RSCI members, fetch levels, write the catalogue
    Refresh {
        /// Ignore cached listings and collect from the site
        #[arg(long)]
        no_cache: bool,
    },
    /// Write the subset of the catalogue matching levels and RSCI inclusion
    Filter {
        /// Level to keep; repeat for several (default: all levels)
        #[arg(short, long = "level")]
        levels: Vec<u8>,
        /// RSCI inclusion to keep
        #[arg(short, long, value_enum, default_value_t = RsciFilter::Any)]
        rsci: RsciFilter,
    },
    /// Print the current catalogue
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let t0 = Instant::now();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Refresh { no_cache } => {
            let pipeline = Pipeline::from_settings(settings).context("Failed to set up pipeline")?;
            let opts = RefreshOptions { ignore_cache: no_cache };
            let report = pipeline
                .refresh(opts)
                .await
                .context("Failed to refresh journals")?;
            println!(
                "Journals updated: {} ({} VAK, {} RSCI, {} in RSCI, {} with level{})",
                report.location.display(),
                report.vak,
                report.rsci,
                report.in_rsci,
                report.with_level,
                if report.from_cache { ", listings from cache" } else { "" },
            );
            Ok(())
        }
        Commands::Filter { levels, rsci } => {
            let levels: BTreeSet<String> = levels.iter().map(u8::to_string).collect();
            let location = CatalogueFilter::from_settings(&settings)
                .filter(&levels, rsci)
                .context("Failed to filter journals")?;
            println!("Journals saved: {}", location.display());
            Ok(())
        }
        Commands::Overview { limit } => {
            let rows = CatalogueFilter::from_settings(&settings)
                .read_catalogue()
                .context("Failed to read catalogue")?;
            if rows.is_empty() {
                println!("Catalogue is empty. Run 'refresh' first.");
                return Ok(());
            }
            print_overview(&rows, limit);
            Ok(())
        }
    };

    println!("\nDone in {}", format_duration(t0.elapsed()));

    result
}

fn print_overview(rows: &[CatalogueRow], limit: usize) {
    println!(
        "{:>4} | {:<48} | {:<22} | {:<7} | {:<5}",
        "#", "Title", "ISSN", "Level", "RSCI"
    );
    println!("{}", "-".repeat(98));

    for (i, r) in rows.iter().take(limit).enumerate() {
        println!(
            "{:>4} | {:<48} | {:<22} | {:<7} | {:<5}",
            i + 1,
            truncate(&r.title, 48),
            truncate(&r.issn, 22),
            truncate(&r.level, 7),
            r.in_rsci
        );
    }

    let in_rsci = rows.iter().filter(|r| r.is_in_rsci()).count();
    println!("\n{} journals | {} in RSCI", rows.len(), in_rsci);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

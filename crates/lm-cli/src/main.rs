use std::io::stdout;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lm_cli::commands::{collect, export, list, status};
use lm_cli::{Cli, Commands, Config, acquire};
use lm_core::ProductName;

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Open the database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<lm_db::Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    lm_db::Database::open(&config.database_path).context("failed to open database")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    let now = Local::now().naive_local();

    match command {
        Commands::Status => {
            let db = open_database(&config)?;
            status::run(&mut stdout().lock(), &db, &config)?;
        }
        Commands::Collect { file, dry_run } => {
            let tracked = config
                .tracked_products()
                .context("invalid product list in configuration")?;
            let lines = acquire::acquire(&config, file.as_deref());
            if *dry_run {
                let records = collect::parse_report(&tracked, &lines, now);
                collect::print_records(&mut stdout().lock(), &records)?;
            } else {
                let mut db = open_database(&config)?;
                let inserted = collect::run(&mut db, &tracked, &lines, now)?;
                println!("Stored {inserted} usage records.");
            }
        }
        Commands::List {
            product,
            days,
            json,
        } => {
            let product = ProductName::new(product.as_str()).context("invalid product name")?;
            let tracked = config
                .tracked_products()
                .context("invalid product list in configuration")?;
            if !tracked.contains(&product) {
                tracing::warn!(%product, "product is not tracked; no usage will be found");
            }
            let db = open_database(&config)?;
            let history_days = days.unwrap_or(config.history_days);
            list::run(&mut stdout().lock(), &db, &product, now, history_days, *json)?;
        }
        Commands::Export { dir, days } => {
            let tracked = config
                .tracked_products()
                .context("invalid product list in configuration")?;
            let db = open_database(&config)?;
            let history_days = days.unwrap_or(config.history_days);
            let written = export::run(&db, &tracked, dir, now, history_days)?;
            println!("Exported {} files to {}", written.len(), dir.display());
        }
    }

    Ok(())
}

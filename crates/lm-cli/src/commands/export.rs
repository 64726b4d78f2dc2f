//! Export command: write summary tables for every tracked product.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use lm_core::export::export_tables;
use lm_core::{ProductSummary, TrackedProducts};
use lm_db::Database;
use rayon::prelude::*;

/// Computes summaries for all tracked products, in tracked order.
///
/// Histories are loaded sequentially from the database, then summarized in
/// parallel.
pub fn summarize_products(
    db: &Database,
    tracked: &TrackedProducts,
    now: NaiveDateTime,
    history_days: u32,
) -> Result<Vec<ProductSummary>> {
    let histories = tracked
        .iter()
        .map(|product| {
            db.load_history(product, now, history_days)
                .with_context(|| format!("failed to load history for {product}"))
        })
        .collect::<Result<Vec<_>>>()?;

    histories
        .par_iter()
        .map(|history| {
            history
                .summarize(now, history_days)
                .with_context(|| format!("failed to summarize {}", history.product()))
        })
        .collect()
}

/// Writes four TSV files per tracked product into `dir`, returning their paths.
pub fn run(
    db: &Database,
    tracked: &TrackedProducts,
    dir: &Path,
    now: NaiveDateTime,
    history_days: u32,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;

    let mut written = Vec::new();
    for summary in summarize_products(db, tracked, now, history_days)? {
        for table in export_tables(&summary) {
            let path = dir.join(&table.file_name);
            fs::write(&path, table.contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            written.push(path);
        }
        tracing::debug!(product = %summary.product, "exported summary tables");
    }
    Ok(written)
}

//! Collect command: parse a status report and store its usage records.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, SubsecRound};
use lm_core::{ReportParser, TrackedProducts, UsageRecord};
use lm_db::Database;

/// Parses report lines, keeping tracked products only.
///
/// `collected_at` is truncated to milliseconds, the precision the database
/// keeps, so printed and stored records carry the same timestamp.
pub fn parse_report(
    tracked: &TrackedProducts,
    lines: &[String],
    collected_at: NaiveDateTime,
) -> Vec<UsageRecord> {
    let collected_at = collected_at.trunc_subsecs(3);
    let records = ReportParser::new(tracked).parse(lines, collected_at);
    tracing::debug!(
        lines = lines.len(),
        records = records.len(),
        %collected_at,
        "parsed status report"
    );
    records
}

/// Parses and stores one report. Returns the number of records inserted.
pub fn run(
    db: &mut Database,
    tracked: &TrackedProducts,
    lines: &[String],
    collected_at: NaiveDateTime,
) -> Result<usize> {
    let records = parse_report(tracked, lines, collected_at);
    let inserted = db
        .append_records(&records)
        .context("failed to store usage records")?;
    tracing::info!(inserted, "stored usage records");
    Ok(inserted)
}

/// Writes parsed records as JSON lines without storing them.
pub fn print_records<W: Write>(writer: &mut W, records: &[UsageRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record).context("failed to serialize record")?;
        writeln!(writer)?;
    }
    Ok(())
}

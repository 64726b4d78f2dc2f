//! Status command for showing stored usage per product.

use std::io::Write;

use anyhow::{Context, Result};

use lm_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let statuses = db
        .product_status()
        .context("failed to read product status")?;

    writeln!(writer, "License usage status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Tracking: {}", config.products.join(", "))?;

    if statuses.is_empty() {
        writeln!(writer, "No usage recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Products:")?;
    for status in statuses {
        writeln!(
            writer,
            "- {}: {} records, last {}",
            status.product, status.records, status.last_seen
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use lm_core::{ProductName, UsageRecord};

    fn record(product: &str, day: u32, users: &[&str]) -> UsageRecord {
        let timestamp = NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let users: Vec<String> = users.iter().map(|u| (*u).to_string()).collect();
        let in_use = u32::try_from(users.len()).unwrap();
        UsageRecord::new(ProductName::new(product).unwrap(), timestamp, in_use, users).unwrap()
    }

    fn config(db_path: std::path::PathBuf) -> Config {
        Config {
            database_path: db_path,
            products: vec!["MATLAB".to_string(), "SIMULINK".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn status_command_outputs_latest_record_per_product() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("lmstat.db");
        let mut db = Database::open(&db_path).unwrap();
        db.append_records(&[
            record("MATLAB", 1, &["alice"]),
            record("MATLAB", 2, &["alice", "bob"]),
            record("SIMULINK", 1, &["carol"]),
        ])
        .unwrap();

        let config = config(db_path.clone());
        let mut output = Vec::new();
        run(&mut output, &db, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/lmstat.db");
        assert_snapshot!(output, @r"
        License usage status
        Database: [TEMP]/lmstat.db
        Tracking: MATLAB, SIMULINK
        Products:
        - MATLAB: 2 records, last 2025-01-02T09:30:00.000
        - SIMULINK: 1 records, last 2025-01-01T09:30:00.000
        ");
    }

    #[test]
    fn status_command_reports_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let config = config("/var/lib/lmstat/lmstat.db".into());
        let mut output = Vec::new();
        run(&mut output, &db, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        License usage status
        Database: /var/lib/lmstat/lmstat.db
        Tracking: MATLAB, SIMULINK
        No usage recorded.
        ");
    }
}

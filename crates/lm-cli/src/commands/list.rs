//! List command: hourly usage chart for one product.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use lm_core::{HourlyProfile, ProductName, compute_hourly_profile};
use lm_db::Database;

/// Renders the peak usage of each hour as a row of stars.
pub fn format_hourly_chart(profile: &HourlyProfile) -> String {
    let mut output = String::new();
    writeln!(output, "{}", profile.product).unwrap();
    for slot in &profile.slots {
        let max = slot.max_over_history;
        let bar = "*".repeat(max as usize);
        writeln!(output, "{:2}: {bar} ({max})", slot.hour).unwrap();
    }
    output
}

/// Runs the list command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    product: &ProductName,
    now: NaiveDateTime,
    history_days: u32,
    json: bool,
) -> Result<()> {
    let history = db
        .load_history(product, now, history_days)
        .with_context(|| format!("failed to load history for {product}"))?;
    let profile = compute_hourly_profile(&history, product, now, history_days)
        .context("failed to compute hourly profile")?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &profile)
            .context("failed to serialize hourly profile")?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_hourly_chart(&profile))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lm_core::UsageRecord;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(timestamp: NaiveDateTime, users: &[&str]) -> UsageRecord {
        let users: Vec<String> = users.iter().map(|u| (*u).to_string()).collect();
        let in_use = u32::try_from(users.len()).unwrap();
        UsageRecord::new(ProductName::new("MATLAB").unwrap(), timestamp, in_use, users).unwrap()
    }

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.append_records(&[
            record(at(24, 9), &["a", "b", "c"]),
            record(at(23, 9), &["a"]),
            record(at(23, 14), &["a", "b"]),
        ])
        .unwrap();
        db
    }

    #[test]
    fn list_renders_peak_per_hour() {
        let db = seeded_db();
        let mut output = Vec::new();
        run(
            &mut output,
            &db,
            &ProductName::new("MATLAB").unwrap(),
            at(24, 17),
            100,
            false,
        )
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        insta::assert_snapshot!(output, @r"
        MATLAB
         0:  (0)
         1:  (0)
         2:  (0)
         3:  (0)
         4:  (0)
         5:  (0)
         6:  (0)
         7:  (0)
         8:  (0)
         9: *** (3)
        10:  (0)
        11:  (0)
        12:  (0)
        13:  (0)
        14: ** (2)
        15:  (0)
        16:  (0)
        17:  (0)
        18:  (0)
        19:  (0)
        20:  (0)
        21:  (0)
        22:  (0)
        23:  (0)
        ");
    }

    #[test]
    fn list_json_contains_all_slots() {
        let db = seeded_db();
        let mut output = Vec::new();
        run(
            &mut output,
            &db,
            &ProductName::new("MATLAB").unwrap(),
            at(24, 17),
            2,
            true,
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["product"], "MATLAB");
        assert_eq!(value["history_days"], 2);
        let slots = value["slots"].as_array().unwrap();
        assert_eq!(slots.len(), 24);
        assert_eq!(slots[9]["max_over_history"], 3);
        assert_eq!(slots[9]["avg_over_history"], 2.0);
        assert_eq!(slots[9]["users_today"], serde_json::json!(["a", "b", "c"]));
    }
}

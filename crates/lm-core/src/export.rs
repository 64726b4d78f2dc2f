//! Tab-separated renderings of rollup output.
//!
//! Each product exports four tables. Column order is fixed, floating-point
//! values use six decimals and user lists are joined with `", "`.

use std::fmt::Write;

use crate::product::ProductName;
use crate::rollup::{DailyDetail, HourlyProfile, ProductSummary, UserHours, YearlyDaily};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Joins a user list for display.
pub fn join_users(users: &[String]) -> String {
    users.join(", ")
}

/// `Hour  Maximum  Average  Daily  Names`, one row per hour of day.
pub fn hourly_tsv(profile: &HourlyProfile) -> String {
    let mut output = String::new();
    writeln!(output, "Hour\tMaximum\tAverage\tDaily\tNames").unwrap();
    for slot in &profile.slots {
        writeln!(
            output,
            "{}\t{:.6}\t{:.6}\t{:.6}\t{}",
            slot.hour,
            f64::from(slot.max_over_history),
            slot.avg_over_history,
            slot.avg_today,
            join_users(&slot.users_today)
        )
        .unwrap();
    }
    output
}

/// `Date  Hour  Daily  Names`, one row per hour of every day in the history.
pub fn daily_tsv(detail: &DailyDetail) -> String {
    let mut output = String::new();
    writeln!(output, "Date\tHour\tDaily\tNames").unwrap();
    for cell in &detail.hours {
        writeln!(
            output,
            "{}\t{:02}\t{:.6}\t{}",
            cell.date.format(DATE_FORMAT),
            cell.hour,
            cell.avg_in_use,
            join_users(&cell.users)
        )
        .unwrap();
    }
    output
}

/// `Date  Average  Names`, one row per day with a positive average.
pub fn yearly_tsv(yearly: &YearlyDaily) -> String {
    let mut output = String::new();
    writeln!(output, "Date\tAverage\tNames").unwrap();
    for day in yearly.days.iter().filter(|d| d.avg_in_use > 0.0) {
        writeln!(
            output,
            "{}\t{:.6}\t{}",
            day.date.format(DATE_FORMAT),
            day.avg_in_use,
            join_users(&day.users)
        )
        .unwrap();
    }
    output
}

/// `User  Hours`, busiest users first.
pub fn user_hours_tsv(user_hours: &UserHours) -> String {
    let mut output = String::new();
    writeln!(output, "User\tHours").unwrap();
    for (user, hours) in user_hours.ranked() {
        writeln!(output, "{user}\t{hours}").unwrap();
    }
    output
}

/// A rendered table and the file name it is exported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub file_name: String,
    pub contents: String,
}

/// Renders all four tables for one product.
pub fn export_tables(summary: &ProductSummary) -> Vec<ExportTable> {
    let product = &summary.product;
    vec![
        table(product, "", hourly_tsv(&summary.hourly)),
        table(product, "-days", daily_tsv(&summary.daily)),
        table(product, "-year", yearly_tsv(&summary.yearly)),
        table(product, "-users", user_hours_tsv(&summary.daily.user_hours)),
    ]
}

fn table(product: &ProductName, suffix: &str, contents: String) -> ExportTable {
    ExportTable {
        file_name: format!("lmstat-{product}{suffix}.tsv"),
        contents,
    }
}

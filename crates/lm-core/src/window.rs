//! Half-open time windows over stored usage records.

use std::borrow::Cow;
use std::convert::Infallible;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::product::ProductName;
use crate::record::UsageRecord;

/// Longest history a rollup accepts, roughly a century of days.
pub const MAX_HISTORY_DAYS: u32 = 36_600;

/// A window that cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("history of {days} days exceeds the maximum of {max}")]
    HistoryTooLong { days: u32, max: u32 },
    #[error("window {days_ago} days before {now} is out of range")]
    OutOfRange { now: NaiveDateTime, days_ago: u32 },
}

/// Rejects history lengths above [`MAX_HISTORY_DAYS`].
pub const fn check_history_days(days: u32) -> Result<u32, WindowError> {
    if days > MAX_HISTORY_DAYS {
        return Err(WindowError::HistoryTooLong {
            days,
            max: MAX_HISTORY_DAYS,
        });
    }
    Ok(days)
}

/// Midnight of the calendar day containing `t`.
pub fn day_start(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_time(NaiveTime::MIN)
}

/// The one-hour window `hour` hours into the day `days_ago` days before `now`.
pub fn hour_window(
    now: NaiveDateTime,
    days_ago: u32,
    hour: u32,
) -> Result<(NaiveDateTime, NaiveDateTime), WindowError> {
    let (day, _) = day_window(now, days_ago)?;
    let start = day
        .checked_add_signed(Duration::hours(i64::from(hour)))
        .ok_or(WindowError::OutOfRange { now, days_ago })?;
    let end = start
        .checked_add_signed(Duration::hours(1))
        .ok_or(WindowError::OutOfRange { now, days_ago })?;
    Ok((start, end))
}

/// The whole-day window `days_ago` days before `now`.
pub fn day_window(
    now: NaiveDateTime,
    days_ago: u32,
) -> Result<(NaiveDateTime, NaiveDateTime), WindowError> {
    let out_of_range = WindowError::OutOfRange { now, days_ago };
    let start = day_start(now)
        .checked_sub_signed(Duration::days(i64::from(days_ago)))
        .ok_or(out_of_range)?;
    let end = start
        .checked_add_signed(Duration::days(1))
        .ok_or(out_of_range)?;
    Ok((start, end))
}

/// The span covering every window of a `history_days` rollup ending today.
pub fn history_span(
    now: NaiveDateTime,
    history_days: u32,
) -> Result<(NaiveDateTime, NaiveDateTime), WindowError> {
    let history_days = check_history_days(history_days)?;
    let (_, end) = day_window(now, 0)?;
    let (start, _) = day_window(now, history_days.saturating_sub(1))?;
    Ok((start, end))
}

/// A source of records for a product within `[start, end)`.
///
/// Results are ordered by timestamp ascending. Implementations may hand back
/// borrowed slices when the records are already in memory.
pub trait WindowSource {
    type Error;

    fn records_in(
        &self,
        product: &ProductName,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Cow<'_, [UsageRecord]>, Self::Error>;
}

/// Preloaded, time-ordered records for one product.
///
/// Loading a product's full span once and answering each hourly window from
/// memory keeps a rollup to a single storage query.
#[derive(Debug, Clone)]
pub struct History {
    product: ProductName,
    records: Vec<UsageRecord>,
}

impl History {
    /// Builds a history, keeping only records for `product`.
    pub fn new(product: ProductName, records: Vec<UsageRecord>) -> Self {
        let mut records: Vec<UsageRecord> = records
            .into_iter()
            .filter(|r| r.product() == &product)
            .collect();
        records.sort_by_key(UsageRecord::timestamp);
        Self { product, records }
    }

    pub const fn product(&self) -> &ProductName {
        &self.product
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    fn slice(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[UsageRecord] {
        if end <= start {
            return &[];
        }
        let lo = self.records.partition_point(|r| r.timestamp() < start);
        let hi = self.records.partition_point(|r| r.timestamp() < end);
        &self.records[lo..hi]
    }
}

impl WindowSource for History {
    type Error = Infallible;

    fn records_in(
        &self,
        product: &ProductName,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Cow<'_, [UsageRecord]>, Self::Error> {
        if product != &self.product {
            return Ok(Cow::Borrowed(&[]));
        }
        Ok(Cow::Borrowed(self.slice(start, end)))
    }
}

//! Usage rollups over windowed record history.
//!
//! Three independent views are computed for a product, each a full pass over
//! its windows with no state carried between runs:
//!
//! - [`HourlyProfile`]: per hour of day, the peak over the whole history, the
//!   average of daily averages, and today's average and users.
//! - [`DailyDetail`]: every hour of every day in the history, plus how many
//!   distinct (day, hour) slots each user appeared in.
//! - [`YearlyDaily`]: one entry per day that has observations.
//!
//! The hourly history average always divides by the number of days in the
//! history, so hours that were never observed pull the average toward zero.
//! The per-day view instead omits days without observations entirely.

use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::product::ProductName;
use crate::record::UsageRecord;
use crate::window::{
    History, WindowError, WindowSource, check_history_days, day_window, hour_window,
};

/// Number of days looked back by default.
pub const DEFAULT_HISTORY_DAYS: u32 = 100;

pub const HOURS_PER_DAY: u32 = 24;

/// Errors from computing a rollup over a [`WindowSource`].
#[derive(Debug, Error)]
pub enum RollupError<E> {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Source(E),
}

impl RollupError<Infallible> {
    /// An in-memory rollup can only fail on its windows.
    pub fn into_window_error(self) -> WindowError {
        match self {
            Self::Window(e) => e,
            Self::Source(never) => match never {},
        }
    }
}

/// User names in order of first appearance, without repeats.
#[derive(Debug, Default)]
struct UserList {
    seen: HashSet<String>,
    users: Vec<String>,
}

impl UserList {
    fn extend(&mut self, users: &[String]) {
        for user in users {
            if self.seen.insert(user.clone()) {
                self.users.push(user.clone());
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.users
    }
}

/// Aggregates of the records falling in one window.
#[derive(Debug, Default)]
struct WindowStats {
    samples: usize,
    total: u64,
    max: u32,
    users: UserList,
}

impl WindowStats {
    fn collect(records: &[UsageRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.samples += 1;
            stats.total += u64::from(record.in_use());
            stats.max = stats.max.max(record.in_use());
            stats.users.extend(record.users());
        }
        stats
    }

    /// Mean in-use count, or zero for an empty window.
    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.total as f64 / self.samples as f64
    }
}

/// One hour-of-day bucket of an [`HourlyProfile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSlot {
    pub hour: u32,
    /// Highest in-use count seen in this hour on any day.
    pub max_over_history: u32,
    /// Sum of the daily averages for this hour divided by the history length.
    pub avg_over_history: f64,
    pub avg_today: f64,
    pub users_today: Vec<String>,
}

impl HourSlot {
    const fn empty(hour: u32) -> Self {
        Self {
            hour,
            max_over_history: 0,
            avg_over_history: 0.0,
            avg_today: 0.0,
            users_today: Vec::new(),
        }
    }
}

/// Typical load per hour of day for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyProfile {
    pub product: ProductName,
    pub history_days: u32,
    /// Always 24 slots, indexed by hour.
    pub slots: Vec<HourSlot>,
}

impl HourlyProfile {
    pub fn slot(&self, hour: u32) -> Option<&HourSlot> {
        self.slots.get(usize::try_from(hour).ok()?)
    }
}

/// One (day, hour) cell of a [`DailyDetail`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourDetail {
    pub date: NaiveDate,
    pub hour: u32,
    pub avg_in_use: f64,
    pub users: Vec<String>,
}

/// Number of distinct (day, hour) slots in which each user held a license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserHours(BTreeMap<String, u32>);

impl UserHours {
    fn record(&mut self, user: &str) {
        *self.0.entry(user.to_string()).or_default() += 1;
    }

    pub fn get(&self, user: &str) -> u32 {
        self.0.get(user).copied().unwrap_or(0)
    }

    /// Users by descending hour count, ties broken by name.
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        let mut ranked: Vec<(&str, u32)> =
            self.0.iter().map(|(user, hours)| (user.as_str(), *hours)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hour-by-hour usage for each day of the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDetail {
    pub product: ProductName,
    /// `history_days * 24` cells, most recent day first, hours ascending.
    pub hours: Vec<HourDetail>,
    pub user_hours: UserHours,
}

/// One observed day of a [`YearlyDaily`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub avg_in_use: f64,
    pub users: Vec<String>,
}

/// Per-day averages, most recent first; days without records are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyDaily {
    pub product: ProductName,
    pub days: Vec<DaySummary>,
}

/// All three views for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub product: ProductName,
    pub hourly: HourlyProfile,
    pub daily: DailyDetail,
    pub yearly: YearlyDaily,
}

/// Computes the hour-of-day profile over the last `history_days` days.
pub fn compute_hourly_profile<S: WindowSource>(
    source: &S,
    product: &ProductName,
    now: NaiveDateTime,
    history_days: u32,
) -> Result<HourlyProfile, RollupError<S::Error>> {
    let history_days = check_history_days(history_days)?;
    let mut slots = Vec::with_capacity(HOURS_PER_DAY as usize);
    for hour in 0..HOURS_PER_DAY {
        let mut slot = HourSlot::empty(hour);
        let mut daily_averages = 0.0;
        for days_ago in 0..history_days {
            let (start, end) = hour_window(now, days_ago, hour)?;
            let records = source
                .records_in(product, start, end)
                .map_err(RollupError::Source)?;
            let stats = WindowStats::collect(&records);

            slot.max_over_history = slot.max_over_history.max(stats.max);
            daily_averages += stats.average();
            if days_ago == 0 {
                slot.avg_today = stats.average();
                slot.users_today = stats.users.into_vec();
            }
        }
        if history_days > 0 {
            slot.avg_over_history = daily_averages / f64::from(history_days);
        }
        slots.push(slot);
    }

    Ok(HourlyProfile {
        product: product.clone(),
        history_days,
        slots,
    })
}

/// Computes every (day, hour) cell and per-user active hour counts.
pub fn compute_daily_detail<S: WindowSource>(
    source: &S,
    product: &ProductName,
    now: NaiveDateTime,
    history_days: u32,
) -> Result<DailyDetail, RollupError<S::Error>> {
    let history_days = check_history_days(history_days)?;
    let mut hours = Vec::with_capacity((history_days * HOURS_PER_DAY) as usize);
    let mut user_hours = UserHours::default();
    for days_ago in 0..history_days {
        let (day, _) = day_window(now, days_ago)?;
        for hour in 0..HOURS_PER_DAY {
            let (start, end) = hour_window(now, days_ago, hour)?;
            let records = source
                .records_in(product, start, end)
                .map_err(RollupError::Source)?;
            let stats = WindowStats::collect(&records);
            let avg_in_use = stats.average();
            let users = stats.users.into_vec();
            for user in &users {
                user_hours.record(user);
            }
            hours.push(HourDetail {
                date: day.date(),
                hour,
                avg_in_use,
                users,
            });
        }
    }

    Ok(DailyDetail {
        product: product.clone(),
        hours,
        user_hours,
    })
}

/// Computes per-day averages, skipping days with no records.
pub fn compute_yearly_daily<S: WindowSource>(
    source: &S,
    product: &ProductName,
    now: NaiveDateTime,
    history_days: u32,
) -> Result<YearlyDaily, RollupError<S::Error>> {
    let history_days = check_history_days(history_days)?;
    let mut days = Vec::new();
    for days_ago in 0..history_days {
        let (start, end) = day_window(now, days_ago)?;
        let records = source
            .records_in(product, start, end)
            .map_err(RollupError::Source)?;
        if records.is_empty() {
            continue;
        }
        let stats = WindowStats::collect(&records);
        days.push(DaySummary {
            date: start.date(),
            avg_in_use: stats.average(),
            users: stats.users.into_vec(),
        });
    }

    Ok(YearlyDaily {
        product: product.clone(),
        days,
    })
}

/// Computes all three views concurrently.
pub fn summarize<S>(
    source: &S,
    product: &ProductName,
    now: NaiveDateTime,
    history_days: u32,
) -> Result<ProductSummary, RollupError<S::Error>>
where
    S: WindowSource + Sync,
    S::Error: Send,
{
    let (hourly, (daily, yearly)) = rayon::join(
        || compute_hourly_profile(source, product, now, history_days),
        || {
            rayon::join(
                || compute_daily_detail(source, product, now, history_days),
                || compute_yearly_daily(source, product, now, history_days),
            )
        },
    );

    Ok(ProductSummary {
        product: product.clone(),
        hourly: hourly?,
        daily: daily?,
        yearly: yearly?,
    })
}

impl History {
    /// Summarizes this product's preloaded history.
    pub fn summarize(
        &self,
        now: NaiveDateTime,
        history_days: u32,
    ) -> Result<ProductSummary, WindowError> {
        summarize(self, self.product(), now, history_days)
            .map_err(RollupError::into_window_error)
    }
}

//! Core domain logic for the license usage monitor.
//!
//! This crate contains the fundamental types and logic for:
//! - Parsing: turning license-manager status text into usage records
//! - Windows: half-open time windows over stored records
//! - Rollups: hourly profiles, daily detail and per-day summaries
//! - Export: tab-separated renderings of rollup output

pub mod export;
pub mod parser;
pub mod product;
pub mod record;
pub mod rollup;
pub mod window;

pub use parser::{ReportParser, parse_blocks};
pub use product::{ProductName, TrackedProducts};
pub use record::{UsageRecord, ValidationError};
pub use rollup::{
    DEFAULT_HISTORY_DAYS, DailyDetail, DaySummary, HourDetail, HourSlot, HourlyProfile,
    ProductSummary, RollupError, UserHours, YearlyDaily, compute_daily_detail,
    compute_hourly_profile, compute_yearly_daily, summarize,
};
pub use window::{History, MAX_HISTORY_DAYS, WindowError, WindowSource, day_start};

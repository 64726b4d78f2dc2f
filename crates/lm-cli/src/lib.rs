//! License usage monitor CLI library.
//!
//! This crate provides the CLI interface for collecting license status
//! reports and summarizing stored usage.

pub mod acquire;
mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;

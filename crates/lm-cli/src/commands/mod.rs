//! CLI subcommand implementations.

pub mod collect;
pub mod export;
pub mod list;
pub mod status;

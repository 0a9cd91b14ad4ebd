//! Opsdeck CLI - terminal front end for the dashboard lists
//!
//! Each list subcommand builds the same [`opsdeck_query::ListView`] the
//! dashboard uses, so filtered listings come back as numbered pages and
//! unfiltered ones stream.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod logging;
pub mod render;

pub use commands::{collect, CommandError, ListOptions, Listing};
pub use config::{ConfigError, LogFormat, OpsdeckConfig};
pub use render::{Summary, Tabular};

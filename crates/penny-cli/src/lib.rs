//! CLI argument models and validation for the Penny binary.
//!
//! Every flag can also be set through a `PENNY_*` environment variable.
//! [`Cli::moderation_config`] turns the parsed flags into the immutable
//! configuration the moderation pipeline runs with.

pub mod cli_args;
pub mod validation;

pub use cli_args::{
    Cli, CliAnomalyFlags, CliEventIngestFlags, CliSlackFlags, CliSpamFeedFlags,
};
pub use validation::parse_local_timezone;

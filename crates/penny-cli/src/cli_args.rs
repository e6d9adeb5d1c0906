use clap::Parser;

mod anomaly_flags;
mod event_ingest_flags;
mod slack_flags;
mod spam_feed_flags;

pub use anomaly_flags::CliAnomalyFlags;
pub use event_ingest_flags::CliEventIngestFlags;
pub use slack_flags::CliSlackFlags;
pub use spam_feed_flags::CliSpamFeedFlags;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "penny",
    about = "Community moderation bot that removes spam reported into a Slack spam-feed channel",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub slack: CliSlackFlags,

    #[command(flatten)]
    pub spam_feed: CliSpamFeedFlags,

    #[command(flatten)]
    pub anomaly: CliAnomalyFlags,

    #[command(flatten)]
    pub event_ingest: CliEventIngestFlags,
}

use std::path::PathBuf;

use clap::Args;

/// One-shot ingest of a Slack request body captured to disk.
#[derive(Debug, Clone, Args)]
pub struct CliEventIngestFlags {
    #[arg(
        long = "slack-event-ingest-file",
        env = "PENNY_SLACK_EVENT_INGEST_FILE",
        help = "Verify and dispatch one Slack request body (Events API JSON or slash-command form) and print the response"
    )]
    pub slack_event_ingest_file: Option<PathBuf>,

    #[arg(
        long = "slack-event-signature",
        env = "PENNY_SLACK_EVENT_SIGNATURE",
        requires = "slack_event_ingest_file",
        help = "X-Slack-Signature header value for --slack-event-ingest-file"
    )]
    pub slack_event_signature: Option<String>,

    #[arg(
        long = "slack-event-timestamp",
        env = "PENNY_SLACK_EVENT_TIMESTAMP",
        requires = "slack_event_ingest_file",
        help = "X-Slack-Request-Timestamp header value for --slack-event-ingest-file"
    )]
    pub slack_event_timestamp: Option<String>,

    #[arg(
        long = "slack-event-max-skew-seconds",
        env = "PENNY_SLACK_EVENT_MAX_SKEW_SECONDS",
        default_value_t = 300,
        help = "Max allowed request timestamp skew in seconds (0 disables the check)"
    )]
    pub slack_event_max_skew_seconds: u64,
}

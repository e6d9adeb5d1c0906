use clap::Args;
use penny_slack::DEFAULT_SLACK_API_BASE;

use super::{parse_positive_u64, parse_positive_usize};

/// Slack Web API credentials and transport tuning.
#[derive(Debug, Clone, Args)]
pub struct CliSlackFlags {
    #[arg(
        long = "slack-api-base",
        env = "PENNY_SLACK_API_BASE",
        default_value = DEFAULT_SLACK_API_BASE,
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-bot-token",
        env = "PENNY_SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-user-token",
        env = "PENNY_SLACK_USER_TOKEN",
        hide_env_values = true,
        help = "Slack user token (xoxp-...) used for message search and deleting reported posts"
    )]
    pub slack_user_token: Option<String>,

    #[arg(
        long = "slack-signing-secret",
        env = "PENNY_SLACK_SIGNING_SECRET",
        hide_env_values = true,
        help = "Slack app signing secret used to verify inbound requests"
    )]
    pub slack_signing_secret: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "PENNY_SLACK_BOT_USER_ID",
        help = "Bot user id; resolved with auth.test when omitted"
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-request-timeout-ms",
        env = "PENNY_SLACK_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each Slack Web API request in milliseconds"
    )]
    pub slack_request_timeout_ms: u64,

    #[arg(
        long = "slack-retry-max-attempts",
        env = "PENNY_SLACK_RETRY_MAX_ATTEMPTS",
        default_value_t = 1,
        value_parser = parse_positive_usize,
        help = "Attempts per Slack Web API call; values above 1 retry rate limits and 5xx responses"
    )]
    pub slack_retry_max_attempts: usize,

    #[arg(
        long = "slack-retry-base-delay-ms",
        env = "PENNY_SLACK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff between Slack Web API retries in milliseconds"
    )]
    pub slack_retry_base_delay_ms: u64,
}

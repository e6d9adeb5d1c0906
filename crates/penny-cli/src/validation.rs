use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use penny_moderation::{non_empty, AnomalyWeights, ModerationConfig, ModerationTexts};
use penny_slack::SlackApiClientConfig;

use crate::Cli;

/// Parses an IANA timezone name; blank means the timezone check is off.
pub fn parse_local_timezone(raw: Option<&str>) -> Result<Option<Tz>> {
    let Some(name) = non_empty(raw) else {
        return Ok(None);
    };
    name.parse::<Tz>()
        .map(Some)
        .map_err(|_| anyhow!("invalid --local-timezone '{name}': expected an IANA name such as America/New_York"))
}

impl Cli {
    /// Validated moderation settings for the whole process lifetime.
    pub fn moderation_config(&self) -> Result<ModerationConfig> {
        let spam_feed = &self.spam_feed;
        let anomaly = &self.anomaly;
        if anomaly.max_anomaly_score == 0 {
            bail!("--max-anomaly-score must be greater than 0");
        }
        let report_emoji = spam_feed.spam_feed_emoji.trim().trim_matches(':').to_string();
        if report_emoji.is_empty() {
            bail!("--spam-feed-emoji cannot be empty");
        }
        let activity_search_after = anomaly.activity_search_after.trim().to_string();
        if anomaly.activity_low_watermark > 0 && activity_search_after.is_empty() {
            bail!("--activity-search-after is required when --activity-low-watermark is set");
        }

        Ok(ModerationConfig {
            spam_feed_channel: spam_feed.spam_feed_channel.trim().to_lowercase(),
            report_emoji,
            acknowledgement: non_empty(spam_feed.spam_feed_reacji_response.as_deref()),
            op_warning: non_empty(spam_feed.spam_feed_op_warning.as_deref()),
            assistance_channel_id: non_empty(spam_feed.spam_feed_assistance_channel_id.as_deref()),
            reaction_emoji_hit: non_empty(spam_feed.spam_feed_reaction_emoji_hit.as_deref()),
            reaction_emoji_miss: non_empty(spam_feed.spam_feed_reaction_emoji_miss.as_deref()),
            activity_low_watermark: anomaly.activity_low_watermark,
            activity_search_after,
            local_timezone: parse_local_timezone(anomaly.local_timezone.as_deref())?,
            weights: AnomalyWeights {
                reported: anomaly.anomaly_score_reported,
                low_activity: anomaly.anomaly_score_low_activity,
                outside_timezone: anomaly.anomaly_score_outside_tz,
            },
            max_anomaly_score: anomaly.max_anomaly_score,
            texts: ModerationTexts::default(),
        })
    }

    /// Client settings for the bot token.
    pub fn bot_client_config(&self) -> Result<SlackApiClientConfig> {
        let token = non_empty(self.slack.slack_bot_token.as_deref())
            .ok_or_else(|| anyhow!("--slack-bot-token is required"))?;
        Ok(self.client_config(token))
    }

    /// Client settings for the user token used for search and deletion.
    pub fn user_client_config(&self) -> Result<SlackApiClientConfig> {
        let token = non_empty(self.slack.slack_user_token.as_deref())
            .ok_or_else(|| anyhow!("--slack-user-token is required"))?;
        Ok(self.client_config(token))
    }

    fn client_config(&self, token: String) -> SlackApiClientConfig {
        let slack = &self.slack;
        SlackApiClientConfig {
            request_timeout_ms: slack.slack_request_timeout_ms,
            retry_max_attempts: slack.slack_retry_max_attempts,
            retry_base_delay_ms: slack.slack_retry_base_delay_ms,
            ..SlackApiClientConfig::new(slack.slack_api_base.trim_end_matches('/'), token)
        }
    }
}

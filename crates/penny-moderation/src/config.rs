use chrono_tz::Tz;

/// Points each anomaly signal adds to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnomalyWeights {
    pub reported: u32,
    pub low_activity: u32,
    pub outside_timezone: u32,
}

impl Default for AnomalyWeights {
    fn default() -> Self {
        Self {
            reported: 2,
            low_activity: 1,
            outside_timezone: 2,
        }
    }
}

/// Fixed replies posted on degraded or terminal paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationTexts {
    pub threaded_reply_unsupported: String,
    pub original_unavailable: String,
    pub malformed_permalink: String,
    pub self_report: String,
    pub removal_notice: String,
}

impl Default for ModerationTexts {
    fn default() -> Self {
        Self {
            threaded_reply_unsupported: "I currently don't handle threaded replies.".to_string(),
            original_unavailable: "I couldn't retrieve the original message from the Slack API."
                .to_string(),
            malformed_permalink: "I couldn't find a message link in this report.".to_string(),
            self_report: "Hey! That's not nice.".to_string(),
            removal_notice:
                "Your message was reported by the community as SPAM and I've removed this post."
                    .to_string(),
        }
    }
}

/// Immutable moderation settings, resolved once at startup.
///
/// Optional features are `None` when unconfigured and are skipped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationConfig {
    /// Normalized name of the channel reports are forwarded into.
    pub spam_feed_channel: String,
    /// Emoji the community uses to report a post.
    pub report_emoji: String,
    pub acknowledgement: Option<String>,
    pub op_warning: Option<String>,
    pub assistance_channel_id: Option<String>,
    pub reaction_emoji_hit: Option<String>,
    pub reaction_emoji_miss: Option<String>,
    /// Posters with fewer public messages than this are suspect. 0 disables the check.
    pub activity_low_watermark: u64,
    /// `after:` date for the public activity search, `YYYY/MM/DD`.
    pub activity_search_after: String,
    pub local_timezone: Option<Tz>,
    pub weights: AnomalyWeights,
    pub max_anomaly_score: u32,
    pub texts: ModerationTexts,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            spam_feed_channel: "spam-feed".to_string(),
            report_emoji: "no_good".to_string(),
            acknowledgement: None,
            op_warning: None,
            assistance_channel_id: None,
            reaction_emoji_hit: None,
            reaction_emoji_miss: None,
            activity_low_watermark: 0,
            activity_search_after: "2021/12/01".to_string(),
            local_timezone: None,
            weights: AnomalyWeights::default(),
            max_anomaly_score: 5,
            texts: ModerationTexts::default(),
        }
    }
}

impl ModerationConfig {
    /// Notice posted on the OP thread before the post is deleted.
    pub fn removal_reply(&self) -> String {
        match &self.assistance_channel_id {
            Some(channel) => format!(
                "{} Please join <#{channel}> if you have questions.",
                self.texts.removal_notice
            ),
            None => self.texts.removal_notice.clone(),
        }
    }

    /// Emoji added to the spam-feed message once the outcome is known.
    pub fn feedback_emoji(&self, removed: bool) -> Option<&str> {
        if removed {
            self.reaction_emoji_hit.as_deref()
        } else {
            self.reaction_emoji_miss.as_deref()
        }
    }
}

/// Maps blank strings to `None`.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

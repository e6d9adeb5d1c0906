use std::sync::LazyLock;

use penny_slack::{AppMentionEvent, PostedMessage, SlackApi, SlackApiError};
use regex::Regex;

use crate::{Changelog, ChangelogError};

pub const CHANGELOG_UNAVAILABLE: &str = "Sorry, I couldn't retrieve the changelog.";

static WHATS_NEW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)what'?s\s+new").expect("what's new pattern is valid"));
static WHATS_NEW_SINCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)what'?s\s+new\s+since\s+v?(\S+)").expect("what's new since pattern is valid")
});

/// True when a mention asks what changed.
pub fn is_whats_new(text: &str) -> bool {
    WHATS_NEW.is_match(text)
}

/// Latest changelog section, or every section after `since <version>`.
pub fn format_whats_new(message: &str, raw_changelog: &str) -> Result<String, ChangelogError> {
    let changelog = Changelog::parse(raw_changelog);
    match WHATS_NEW_SINCE.captures(message) {
        Some(captures) => {
            let version = captures[1].trim_start_matches(['v', 'V']);
            changelog.since(version)
        }
        None => changelog.latest(),
    }
}

/// Answers a "what's new" mention in the mention's thread.
pub async fn reply_whats_new(
    api: &dyn SlackApi,
    event: &AppMentionEvent,
    raw_changelog: &str,
) -> Result<PostedMessage, SlackApiError> {
    let text = format_whats_new(&event.text, raw_changelog).unwrap_or_else(|error| {
        tracing::warn!(
            channel = %event.channel,
            user = event.user.as_deref().unwrap_or_default(),
            error = %error,
            "failed to format changelog"
        );
        CHANGELOG_UNAVAILABLE.to_string()
    });
    api.post_message(&event.channel, Some(&event.ts), &text).await
}

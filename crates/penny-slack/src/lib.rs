//! Slack data model, Web API client, and conversation helpers for Penny.
//!
//! Everything that talks to Slack goes through the [`SlackApi`] capability
//! trait so moderation logic can run against the live Web API client or a
//! recording double in tests.

mod conversations;
mod permalink;
mod slack_api;
mod slack_api_client;
mod slack_helpers;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use conversations::{
    reply_in_thread, resolve_message, who_reacted, who_reacted_as_mentions, ConversationError,
};
pub use permalink::{parse_permalink, permalink_path_ts, ParsedPermalink, PermalinkError};
pub use slack_api::{SlackApi, SlackApiError};
pub use slack_api_client::{SlackApiClient, SlackApiClientConfig, DEFAULT_SLACK_API_BASE};
pub use types::{
    AppMentionEvent, ChannelInfo, ChannelPage, Message, MessageEvent, MessageRef, PostedMessage,
    Reaction, SearchSummary, UserProfile,
};

//! Capability interface over the Slack Web API methods Penny uses.

use async_trait::async_trait;
use thiserror::Error;

use crate::{ChannelInfo, ChannelPage, Message, MessageRef, PostedMessage, SearchSummary, UserProfile};

/// Transport, auth, or API-level failure reported by Slack.
#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("failed to create slack api client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("slack api {method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack api {method} failed with status {status}: {body}")]
    HttpStatus {
        method: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to decode slack {method}: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack {method} response missing {field}")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },
}

impl SlackApiError {
    /// Slack error code for `ok=false` responses, e.g. `channel_not_found`.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
/// One method per Slack operation the moderation pipeline depends on.
pub trait SlackApi: Send + Sync {
    /// `conversations.info`
    async fn conversation_info(&self, channel: &str) -> Result<ChannelInfo, SlackApiError>;

    /// `conversations.join`. Joining a channel the caller is already in succeeds.
    async fn join_conversation(&self, channel: &str) -> Result<(), SlackApiError>;

    /// `conversations.history` anchored at `latest_ts`, inclusive, limit 1.
    async fn conversation_history(
        &self,
        channel: &str,
        latest_ts: &str,
    ) -> Result<Vec<Message>, SlackApiError>;

    /// `conversations.list` over public and private channels, one page per call.
    async fn list_conversations(&self, cursor: Option<&str>) -> Result<ChannelPage, SlackApiError>;

    /// `chat.postMessage`, threaded under `thread_ts` when given.
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<PostedMessage, SlackApiError>;

    /// `reactions.add`
    async fn add_reaction(&self, emoji: &str, item: &MessageRef) -> Result<(), SlackApiError>;

    /// `chat.delete`
    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackApiError>;

    /// `users.info`
    async fn user_profile(&self, user: &str) -> Result<UserProfile, SlackApiError>;

    /// `search.messages`; needs a user token.
    async fn search_messages(&self, query: &str) -> Result<SearchSummary, SlackApiError>;
}

//! In-memory [`SlackApi`] double that records every call.
//!
//! Enabled with the `test-support` feature. Each operation can be made to
//! fail independently with [`RecordingSlackApi::failing`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{
    ChannelInfo, ChannelPage, Message, MessageRef, PostedMessage, SearchSummary, SlackApi,
    SlackApiError, UserProfile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlackOperation {
    ConversationInfo,
    JoinConversation,
    ConversationHistory,
    ListConversations,
    PostMessage,
    AddReaction,
    DeleteMessage,
    UserProfile,
    SearchMessages,
}

impl SlackOperation {
    pub fn method(self) -> &'static str {
        match self {
            Self::ConversationInfo => "conversations.info",
            Self::JoinConversation => "conversations.join",
            Self::ConversationHistory => "conversations.history",
            Self::ListConversations => "conversations.list",
            Self::PostMessage => "chat.postMessage",
            Self::AddReaction => "reactions.add",
            Self::DeleteMessage => "chat.delete",
            Self::UserProfile => "users.info",
            Self::SearchMessages => "search.messages",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackCall {
    ConversationInfo { channel: String },
    JoinConversation { channel: String },
    ConversationHistory { channel: String, latest_ts: String },
    ListConversations { cursor: Option<String> },
    PostMessage(RecordedPost),
    AddReaction { emoji: String, item: MessageRef },
    DeleteMessage { channel: String, ts: String },
    UserProfile { user: String },
    SearchMessages { query: String },
}

impl SlackCall {
    pub fn operation(&self) -> SlackOperation {
        match self {
            Self::ConversationInfo { .. } => SlackOperation::ConversationInfo,
            Self::JoinConversation { .. } => SlackOperation::JoinConversation,
            Self::ConversationHistory { .. } => SlackOperation::ConversationHistory,
            Self::ListConversations { .. } => SlackOperation::ListConversations,
            Self::PostMessage(_) => SlackOperation::PostMessage,
            Self::AddReaction { .. } => SlackOperation::AddReaction,
            Self::DeleteMessage { .. } => SlackOperation::DeleteMessage,
            Self::UserProfile { .. } => SlackOperation::UserProfile,
            Self::SearchMessages { .. } => SlackOperation::SearchMessages,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingSlackApi {
    channels: HashMap<String, ChannelInfo>,
    channel_pages: Vec<Vec<ChannelInfo>>,
    messages: HashMap<String, Vec<Message>>,
    profiles: HashMap<String, UserProfile>,
    activity: HashMap<String, u64>,
    failures: HashSet<SlackOperation>,
    calls: Mutex<Vec<SlackCall>>,
}

impl RecordingSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: &str, name: &str) -> Self {
        self.channels.insert(
            id.to_string(),
            ChannelInfo {
                id: id.to_string(),
                name: name.to_string(),
                name_normalized: name.to_string(),
            },
        );
        self
    }

    /// Pages served by `list_conversations`, in cursor order.
    pub fn with_channel_pages(mut self, pages: Vec<Vec<ChannelInfo>>) -> Self {
        self.channel_pages = pages;
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages
            .entry(message.channel.clone())
            .or_default()
            .push(message);
        self
    }

    pub fn with_user_timezone(mut self, user: &str, tz: &str) -> Self {
        self.profiles.insert(
            user.to_string(),
            UserProfile {
                id: user.to_string(),
                tz: Some(tz.to_string()),
            },
        );
        self
    }

    /// Total `search.messages` reports for queries mentioning `user`.
    pub fn with_activity(mut self, user: &str, total: u64) -> Self {
        self.activity.insert(user.to_string(), total);
        self
    }

    pub fn failing(mut self, operation: SlackOperation) -> Self {
        self.failures.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<SlackCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, operation: SlackOperation) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SlackCall::PostMessage(post) => Some(post),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<(String, MessageRef)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SlackCall::AddReaction { emoji, item } => Some((emoji, item)),
                _ => None,
            })
            .collect()
    }

    pub fn deletions(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SlackCall::DeleteMessage { channel, ts } => Some(MessageRef::new(channel, ts)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SlackCall) -> Result<(), SlackApiError> {
        let operation = call.operation();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.failures.contains(&operation) {
            return Err(api_error(operation, "mock_failure"));
        }
        Ok(())
    }
}

fn api_error(operation: SlackOperation, error: &str) -> SlackApiError {
    SlackApiError::Api {
        method: operation.method(),
        error: error.to_string(),
    }
}

fn ts_key(ts: &str) -> (u64, u64) {
    let (seconds, fraction) = ts.split_once('.').unwrap_or((ts, "0"));
    (
        seconds.parse().unwrap_or_default(),
        fraction.parse().unwrap_or_default(),
    )
}

#[async_trait]
impl SlackApi for RecordingSlackApi {
    async fn conversation_info(&self, channel: &str) -> Result<ChannelInfo, SlackApiError> {
        self.record(SlackCall::ConversationInfo {
            channel: channel.to_string(),
        })?;
        self.channels
            .get(channel)
            .cloned()
            .ok_or_else(|| api_error(SlackOperation::ConversationInfo, "channel_not_found"))
    }

    async fn join_conversation(&self, channel: &str) -> Result<(), SlackApiError> {
        self.record(SlackCall::JoinConversation {
            channel: channel.to_string(),
        })
    }

    // Mirrors `latest` + `inclusive` + `limit=1`: the newest message at or before `latest_ts`.
    async fn conversation_history(
        &self,
        channel: &str,
        latest_ts: &str,
    ) -> Result<Vec<Message>, SlackApiError> {
        self.record(SlackCall::ConversationHistory {
            channel: channel.to_string(),
            latest_ts: latest_ts.to_string(),
        })?;
        let latest = ts_key(latest_ts);
        Ok(self
            .messages
            .get(channel)
            .into_iter()
            .flatten()
            .filter(|message| ts_key(&message.ts) <= latest)
            .max_by_key(|message| ts_key(&message.ts))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn list_conversations(&self, cursor: Option<&str>) -> Result<ChannelPage, SlackApiError> {
        self.record(SlackCall::ListConversations {
            cursor: cursor.map(ToOwned::to_owned),
        })?;
        let index = cursor
            .and_then(|cursor| cursor.parse::<usize>().ok())
            .unwrap_or_default();
        let channels = self.channel_pages.get(index).cloned().unwrap_or_default();
        let next_cursor = (index + 1 < self.channel_pages.len()).then(|| (index + 1).to_string());
        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }

    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<PostedMessage, SlackApiError> {
        self.record(SlackCall::PostMessage(RecordedPost {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(ToOwned::to_owned),
            text: text.to_string(),
        }))?;
        Ok(PostedMessage {
            channel: channel.to_string(),
            ts: format!("1900000000.{:06}", self.count(SlackOperation::PostMessage)),
        })
    }

    async fn add_reaction(&self, emoji: &str, item: &MessageRef) -> Result<(), SlackApiError> {
        self.record(SlackCall::AddReaction {
            emoji: emoji.to_string(),
            item: item.clone(),
        })
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackApiError> {
        self.record(SlackCall::DeleteMessage {
            channel: channel.to_string(),
            ts: ts.to_string(),
        })
    }

    async fn user_profile(&self, user: &str) -> Result<UserProfile, SlackApiError> {
        self.record(SlackCall::UserProfile {
            user: user.to_string(),
        })?;
        self.profiles
            .get(user)
            .cloned()
            .ok_or_else(|| api_error(SlackOperation::UserProfile, "user_not_found"))
    }

    async fn search_messages(&self, query: &str) -> Result<SearchSummary, SlackApiError> {
        self.record(SlackCall::SearchMessages {
            query: query.to_string(),
        })?;
        let total = self
            .activity
            .iter()
            .find(|(user, _)| query.contains(&format!("<@{user}>")))
            .map(|(_, total)| *total)
            .unwrap_or_default();
        Ok(SearchSummary { total })
    }
}

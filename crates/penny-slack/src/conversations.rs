//! Resolving message references and replying in threads.

use thiserror::Error;

use crate::{Message, MessageRef, PostedMessage, SlackApi, SlackApiError};

#[derive(Debug, Error)]
pub enum ConversationError {
    /// History came back empty or returned a different message.
    #[error("message {channel}/{ts} not found")]
    NotFound { channel: String, ts: String },
    #[error(transparent)]
    Upstream(#[from] SlackApiError),
}

/// Fetches the message `reference` points at.
///
/// Joins the channel first since reports can come from channels the bot is
/// not a member of. History lookups anchored at a thread reply's timestamp
/// can return the nearest earlier top-level message instead, so anything but
/// an exact timestamp match is `NotFound`.
pub async fn resolve_message(
    api: &dyn SlackApi,
    reference: &MessageRef,
) -> Result<Message, ConversationError> {
    api.join_conversation(&reference.channel).await?;
    let messages = api
        .conversation_history(&reference.channel, &reference.ts)
        .await?;

    match messages.into_iter().next() {
        Some(message) if message.ts == reference.ts => Ok(message),
        Some(message) => {
            tracing::debug!(
                channel = %reference.channel,
                requested_ts = %reference.ts,
                returned_ts = %message.ts,
                "history returned a different message"
            );
            Err(ConversationError::NotFound {
                channel: reference.channel.clone(),
                ts: reference.ts.clone(),
            })
        }
        None => Err(ConversationError::NotFound {
            channel: reference.channel.clone(),
            ts: reference.ts.clone(),
        }),
    }
}

/// Posts `text` into the thread `message` belongs to, starting one if needed.
pub async fn reply_in_thread(
    api: &dyn SlackApi,
    message: &Message,
    text: &str,
) -> Result<PostedMessage, SlackApiError> {
    api.post_message(&message.channel, Some(message.thread_anchor()), text)
        .await
}

/// Users that reacted to `message` with `emoji`, in reaction order.
pub fn who_reacted<'a>(message: &'a Message, emoji: &str) -> Vec<&'a str> {
    message
        .reactions
        .iter()
        .filter(|reaction| reaction.name == emoji)
        .flat_map(|reaction| reaction.users.iter().map(String::as_str))
        .collect()
}

pub fn who_reacted_as_mentions(message: &Message, emoji: &str) -> Vec<String> {
    who_reacted(message, emoji)
        .into_iter()
        .map(|user| format!("<@{user}>"))
        .collect()
}

//! Slack Web API client backing [`SlackApi`] in production.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::slack_helpers::{
    is_retryable_slack_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use crate::{
    ChannelInfo, ChannelPage, Message, MessageRef, PostedMessage, Reaction, SearchSummary,
    SlackApi, SlackApiError, UserProfile,
};

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const RETRY_ATTEMPT_HEADER: &str = "x-penny-retry-attempt";
const CONVERSATIONS_PAGE_LIMIT: &str = "200";

#[derive(Debug, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

type IgnoredBody = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct ConversationInfoBody {
    #[serde(default)]
    channel: Option<ChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct ConversationHistoryBody {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    reactions: Vec<Reaction>,
}

#[derive(Debug, Deserialize)]
struct ConversationListBody {
    #[serde(default)]
    channels: Vec<ChannelInfo>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoBody {
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct SearchMessagesBody {
    #[serde(default)]
    messages: Option<SearchMessagesPage>,
}

#[derive(Debug, Deserialize)]
struct SearchMessagesPage {
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct AuthTestBody {
    #[serde(default)]
    user_id: Option<String>,
}

/// Connection settings for one Slack token.
#[derive(Debug, Clone)]
pub struct SlackApiClientConfig {
    pub api_base: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl SlackApiClientConfig {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            token: token.into(),
            request_timeout_ms: 10_000,
            retry_max_attempts: 1,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(config: SlackApiClientConfig) -> Result<Self, SlackApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("penny-moderation-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(SlackApiError::Build)?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.trim().to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    /// Looks up the user id the token belongs to via `auth.test`.
    pub async fn resolve_bot_user_id(&self) -> Result<String, SlackApiError> {
        let body: AuthTestBody = self.call("auth.test", || self.post("auth.test")).await?;
        body.user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or(SlackApiError::MissingField {
                method: "auth.test",
                field: "user_id",
            })
    }

    fn get(&self, method: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.token)
    }

    fn post(&self, method: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.token)
    }

    async fn call<T, F>(&self, method: &'static str, builder: F) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let envelope: SlackEnvelope<T> = self.request_json(method, builder).await?;
        if !envelope.ok {
            return Err(SlackApiError::Api {
                method,
                error: envelope
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(envelope.body)
    }

    async fn request_json<T, F>(&self, method: &'static str, mut builder: F) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .map_err(|source| SlackApiError::Decode { method, source });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_slack_status(status.as_u16())
                    {
                        tracing::debug!(method, attempt, status = status.as_u16(), "retrying slack api call");
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    return Err(SlackApiError::HttpStatus {
                        method,
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 800),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(SlackApiError::Http {
                        method,
                        source: error,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl SlackApi for SlackApiClient {
    async fn conversation_info(&self, channel: &str) -> Result<ChannelInfo, SlackApiError> {
        let body: ConversationInfoBody = self
            .call("conversations.info", || {
                self.get("conversations.info").query(&[("channel", channel)])
            })
            .await?;
        body.channel.ok_or(SlackApiError::MissingField {
            method: "conversations.info",
            field: "channel",
        })
    }

    async fn join_conversation(&self, channel: &str) -> Result<(), SlackApiError> {
        let payload = json!({ "channel": channel });
        let joined: Result<IgnoredBody, SlackApiError> = self
            .call("conversations.join", || {
                self.post("conversations.join").json(&payload)
            })
            .await;
        match joined {
            Ok(_) => Ok(()),
            Err(error) if error.api_error_code() == Some("already_in_channel") => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn conversation_history(
        &self,
        channel: &str,
        latest_ts: &str,
    ) -> Result<Vec<Message>, SlackApiError> {
        let body: ConversationHistoryBody = self
            .call("conversations.history", || {
                self.get("conversations.history").query(&[
                    ("channel", channel),
                    ("latest", latest_ts),
                    ("inclusive", "true"),
                    ("limit", "1"),
                ])
            })
            .await?;
        Ok(body
            .messages
            .into_iter()
            .map(|message| Message {
                channel: channel.to_string(),
                ts: message.ts,
                thread_ts: message.thread_ts,
                user: message.user,
                text: message.text,
                reactions: message.reactions,
            })
            .collect())
    }

    async fn list_conversations(&self, cursor: Option<&str>) -> Result<ChannelPage, SlackApiError> {
        let mut params = vec![
            ("exclude_archived", "true"),
            ("limit", CONVERSATIONS_PAGE_LIMIT),
            ("types", "public_channel,private_channel"),
        ];
        if let Some(cursor) = cursor.filter(|value| !value.is_empty()) {
            params.push(("cursor", cursor));
        }
        let body: ConversationListBody = self
            .call("conversations.list", || {
                self.get("conversations.list").query(&params)
            })
            .await?;
        Ok(ChannelPage {
            channels: body.channels,
            next_cursor: body
                .response_metadata
                .and_then(|metadata| metadata.next_cursor)
                .filter(|cursor| !cursor.trim().is_empty()),
        })
    }

    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<PostedMessage, SlackApiError> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let body: ChatMessageBody = self
            .call("chat.postMessage", || {
                self.post("chat.postMessage").json(&payload)
            })
            .await?;
        Ok(PostedMessage {
            channel: body.channel.unwrap_or_else(|| channel.to_string()),
            ts: body.ts.ok_or(SlackApiError::MissingField {
                method: "chat.postMessage",
                field: "ts",
            })?,
        })
    }

    async fn add_reaction(&self, emoji: &str, item: &MessageRef) -> Result<(), SlackApiError> {
        let payload = json!({
            "name": emoji,
            "channel": item.channel,
            "timestamp": item.ts,
        });
        let _: IgnoredBody = self
            .call("reactions.add", || self.post("reactions.add").json(&payload))
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackApiError> {
        let payload = json!({ "channel": channel, "ts": ts });
        let _: IgnoredBody = self
            .call("chat.delete", || self.post("chat.delete").json(&payload))
            .await?;
        Ok(())
    }

    async fn user_profile(&self, user: &str) -> Result<UserProfile, SlackApiError> {
        let body: UserInfoBody = self
            .call("users.info", || self.get("users.info").query(&[("user", user)]))
            .await?;
        body.user.ok_or(SlackApiError::MissingField {
            method: "users.info",
            field: "user",
        })
    }

    async fn search_messages(&self, query: &str) -> Result<SearchSummary, SlackApiError> {
        let body: SearchMessagesBody = self
            .call("search.messages", || {
                self.get("search.messages")
                    .query(&[("query", query), ("count", "1")])
            })
            .await?;
        Ok(SearchSummary {
            total: body.messages.map(|page| page.total).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{SlackApiClient, SlackApiClientConfig};
    use crate::{MessageRef, SlackApi, SlackApiError};

    fn client(server: &MockServer) -> SlackApiClient {
        SlackApiClient::new(SlackApiClientConfig::new(server.base_url(), "xoxb-test"))
            .expect("client")
    }

    #[tokio::test]
    async fn integration_slack_api_client_retries_rate_limits() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("x-penny-retry-attempt", "0");
            then.status(429).header("retry-after", "0").body("rate limited");
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("x-penny-retry-attempt", "1");
            then.status(200)
                .json_body(json!({"ok": true, "channel": "C1", "ts": "1.2"}));
        });

        let mut config = SlackApiClientConfig::new(server.base_url(), "xoxb-test");
        config.retry_max_attempts = 3;
        config.retry_base_delay_ms = 1;
        let client = SlackApiClient::new(config).expect("client");

        let posted = client
            .post_message("C1", None, "hello")
            .await
            .expect("post message eventually succeeds");
        assert_eq!(posted.channel, "C1");
        assert_eq!(posted.ts, "1.2");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn functional_default_client_does_not_retry() {
        let server = MockServer::start();
        let limited = server.mock(|when, then| {
            when.method(POST).path("/chat.delete");
            then.status(429).header("retry-after", "0").body("rate limited");
        });

        let error = client(&server)
            .delete_message("C1", "1.2")
            .await
            .expect_err("rate limit surfaces");
        assert!(matches!(error, SlackApiError::HttpStatus { status: 429, .. }));
        limited.assert_calls(1);
    }

    #[tokio::test]
    async fn functional_conversation_history_requests_single_inclusive_message() {
        let server = MockServer::start();
        let history = server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.history")
                .header("authorization", "Bearer xoxb-test")
                .query_param("channel", "C1")
                .query_param("latest", "1639843883.000100")
                .query_param("inclusive", "true")
                .query_param("limit", "1");
            then.status(200).json_body(json!({
                "ok": true,
                "messages": [{
                    "type": "message",
                    "user": "U1",
                    "text": "buy now",
                    "ts": "1639843883.000100",
                    "thread_ts": "1639843880.000700",
                    "reactions": [{"name": "no_good", "users": ["U2", "U3"], "count": 2}]
                }]
            }));
        });

        let messages = client(&server)
            .conversation_history("C1", "1639843883.000100")
            .await
            .expect("history");
        history.assert_calls(1);
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.channel, "C1");
        assert_eq!(message.user.as_deref(), Some("U1"));
        assert_eq!(message.thread_anchor(), "1639843880.000700");
        assert_eq!(message.reactions[0].users, vec!["U2", "U3"]);
    }

    #[tokio::test]
    async fn functional_api_errors_surface_slack_error_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users.info");
            then.status(200)
                .json_body(json!({"ok": false, "error": "user_not_found"}));
        });

        let error = client(&server)
            .user_profile("U404")
            .await
            .expect_err("api error");
        assert_eq!(error.api_error_code(), Some("user_not_found"));
        assert_eq!(error.to_string(), "slack users.info failed: user_not_found");
    }

    #[tokio::test]
    async fn regression_join_conversation_is_idempotent() {
        let server = MockServer::start();
        let join = server.mock(|when, then| {
            when.method(POST)
                .path("/conversations.join")
                .body_includes("\"channel\":\"C1\"");
            then.status(200).json_body(json!({
                "ok": true,
                "channel": {"id": "C1", "name": "general"},
                "warning": "already_in_channel",
                "response_metadata": {"warnings": ["already_in_channel"]}
            }));
        });

        let client = client(&server);
        client.join_conversation("C1").await.expect("first join");
        client.join_conversation("C1").await.expect("second join");
        join.assert_calls(2);
    }

    #[tokio::test]
    async fn functional_list_conversations_normalizes_empty_cursor() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.list")
                .query_param("types", "public_channel,private_channel")
                .query_param("exclude_archived", "true")
                .query_param_missing("cursor");
            then.status(200).json_body(json!({
                "ok": true,
                "channels": [{"id": "C1", "name": "general", "name_normalized": "general"}],
                "response_metadata": {"next_cursor": "page-2"}
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.list")
                .query_param("cursor", "page-2");
            then.status(200).json_body(json!({
                "ok": true,
                "channels": [{"id": "C9", "name": "spam-feed", "name_normalized": "spam-feed"}],
                "response_metadata": {"next_cursor": ""}
            }));
        });

        let client = client(&server);
        let page = client.list_conversations(None).await.expect("first page");
        assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
        let page = client
            .list_conversations(page.next_cursor.as_deref())
            .await
            .expect("second page");
        assert_eq!(page.channels[0].name_normalized, "spam-feed");
        assert_eq!(page.next_cursor, None);
        first.assert_calls(1);
        second.assert_calls(1);
    }

    #[tokio::test]
    async fn functional_search_and_profile_lookups_decode_fields() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/search.messages")
                .query_param("query", "after:2021/12/01 from:<@U1>");
            then.status(200)
                .json_body(json!({"ok": true, "messages": {"total": 7, "matches": []}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/users.info").query_param("user", "U1");
            then.status(200).json_body(
                json!({"ok": true, "user": {"id": "U1", "tz": "Asia/Tokyo", "name": "spammer"}}),
            );
        });

        let client = client(&server);
        let summary = client
            .search_messages("after:2021/12/01 from:<@U1>")
            .await
            .expect("search");
        assert_eq!(summary.total, 7);
        let profile = client.user_profile("U1").await.expect("profile");
        assert_eq!(profile.tz.as_deref(), Some("Asia/Tokyo"));
    }

    #[tokio::test]
    async fn functional_add_reaction_and_auth_test() {
        let server = MockServer::start();
        let reaction = server.mock(|when, then| {
            when.method(POST)
                .path("/reactions.add")
                .body_includes("\"name\":\"no_entry\"")
                .body_includes("\"timestamp\":\"1.1\"");
            then.status(200).json_body(json!({"ok": true}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/auth.test");
            then.status(200)
                .json_body(json!({"ok": true, "user_id": "UBOT"}));
        });

        let client = client(&server);
        client
            .add_reaction("no_entry", &MessageRef::new("C1", "1.1"))
            .await
            .expect("reaction");
        reaction.assert_calls(1);
        assert_eq!(client.resolve_bot_user_id().await.expect("auth"), "UBOT");
    }
}

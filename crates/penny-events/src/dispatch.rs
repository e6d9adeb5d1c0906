use std::sync::Arc;

use anyhow::{Context, Result};
use penny_changelog::{is_whats_new, reply_whats_new};
use penny_moderation::Moderator;
use penny_slack::SlackApi;

use crate::{
    current_unix_timestamp_ms, help_text, parse_inbound, verify_slack_signature, InboundPayload,
    SignatureError, HELP_COMMAND, SLACK_SIGNATURE_MAX_SKEW_SECONDS,
};

/// Synchronous body Slack expects back for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResponse {
    Challenge(String),
    Text(String),
    Empty,
}

impl DispatchResponse {
    pub fn body(&self) -> &str {
        match self {
            Self::Challenge(body) | Self::Text(body) => body,
            Self::Empty => "",
        }
    }
}

/// Raw request as delivered by Slack, with its signing headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestRequest {
    pub body: String,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Clone)]
pub struct EventDispatcher {
    moderator: Moderator,
    bot: Arc<dyn SlackApi>,
    bot_user_id: String,
    changelog: Arc<str>,
    signing_secret: Option<String>,
    max_skew_seconds: u64,
}

impl EventDispatcher {
    pub fn new(
        moderator: Moderator,
        bot: Arc<dyn SlackApi>,
        bot_user_id: impl Into<String>,
        changelog: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            moderator,
            bot,
            bot_user_id: bot_user_id.into(),
            changelog: changelog.into(),
            signing_secret: None,
            max_skew_seconds: SLACK_SIGNATURE_MAX_SKEW_SECONDS,
        }
    }

    pub fn with_signing_secret(mut self, signing_secret: Option<String>) -> Self {
        self.signing_secret = signing_secret.filter(|secret| !secret.trim().is_empty());
        self
    }

    pub fn with_max_skew_seconds(mut self, max_skew_seconds: u64) -> Self {
        self.max_skew_seconds = max_skew_seconds;
        self
    }

    /// Verifies the request signature when a signing secret is configured.
    pub fn verify(&self, request: &IngestRequest, now_unix_ms: u64) -> Result<(), SignatureError> {
        let Some(secret) = self.signing_secret.as_deref() else {
            tracing::debug!("no signing secret configured; skipping signature verification");
            return Ok(());
        };
        let signature = request
            .signature
            .as_deref()
            .ok_or(SignatureError::MissingSignature)?;
        let timestamp = request
            .timestamp
            .as_deref()
            .ok_or(SignatureError::MissingTimestamp)?;
        verify_slack_signature(
            &request.body,
            signature,
            timestamp,
            secret,
            now_unix_ms,
            self.max_skew_seconds,
        )
    }

    pub async fn ingest(&self, request: &IngestRequest) -> Result<DispatchResponse> {
        self.verify(request, current_unix_timestamp_ms())
            .context("rejected inbound slack request")?;
        let payload =
            parse_inbound(&request.body).context("failed to parse inbound slack payload")?;
        Ok(self.dispatch(payload).await)
    }

    pub async fn dispatch(&self, payload: InboundPayload) -> DispatchResponse {
        match payload {
            InboundPayload::UrlVerification { challenge } => DispatchResponse::Challenge(challenge),
            InboundPayload::Message(event) => {
                if event.user.as_deref() == Some(self.bot_user_id.as_str()) {
                    tracing::trace!(channel = %event.channel, ts = %event.ts, "skipping own message");
                    return DispatchResponse::Empty;
                }
                let outcome = self.moderator.handle_message(&event).await;
                tracing::debug!(channel = %event.channel, ts = %event.ts, outcome = ?outcome, "message handled");
                DispatchResponse::Empty
            }
            InboundPayload::AppMention(event) => {
                if !is_whats_new(&event.text) {
                    tracing::debug!(channel = %event.channel, "mention did not match a command");
                    return DispatchResponse::Empty;
                }
                if let Err(error) = reply_whats_new(self.bot.as_ref(), &event, &self.changelog).await
                {
                    tracing::warn!(
                        channel = %event.channel,
                        error = %error,
                        "failed to post what's new reply"
                    );
                }
                DispatchResponse::Empty
            }
            InboundPayload::SlashCommand(command) => {
                if command.command == HELP_COMMAND {
                    return DispatchResponse::Text(help_text(self.moderator.config()));
                }
                tracing::warn!(command = %command.command, "unknown slash command");
                DispatchResponse::Empty
            }
            InboundPayload::Unsupported { kind } => {
                tracing::debug!(kind = %kind, "ignoring unsupported payload");
                DispatchResponse::Empty
            }
        }
    }
}

//! Events API envelopes and slash-command forms.

use std::collections::HashMap;

use penny_slack::{AppMentionEvent, MessageEvent};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
}

/// A verified inbound request, reduced to what Penny acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    UrlVerification { challenge: String },
    Message(MessageEvent),
    AppMention(AppMentionEvent),
    SlashCommand(SlashCommand),
    Unsupported { kind: String },
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("inbound payload is empty")]
    Empty,
    #[error("failed to decode events api payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("slash command form is missing the '{0}' field")]
    MissingFormField(&'static str),
}

#[derive(Deserialize)]
struct UrlVerificationEnvelope {
    challenge: String,
}

#[derive(Deserialize)]
struct EventCallbackEnvelope {
    event: Value,
}

/// Parses a JSON Events API body or a form-encoded slash command.
pub fn parse_inbound(body: &str) -> Result<InboundPayload, EnvelopeError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(EnvelopeError::Empty);
    }
    if trimmed.starts_with('{') {
        parse_events_api(trimmed)
    } else {
        parse_form(trimmed)
    }
}

fn parse_events_api(body: &str) -> Result<InboundPayload, EnvelopeError> {
    let envelope: Value = serde_json::from_str(body)?;
    match type_of(&envelope) {
        "url_verification" => {
            let UrlVerificationEnvelope { challenge } = serde_json::from_value(envelope)?;
            Ok(InboundPayload::UrlVerification { challenge })
        }
        "event_callback" => {
            let EventCallbackEnvelope { event } = serde_json::from_value(envelope)?;
            parse_callback_event(event)
        }
        other => Ok(InboundPayload::Unsupported {
            kind: other.to_string(),
        }),
    }
}

fn parse_callback_event(event: Value) -> Result<InboundPayload, EnvelopeError> {
    match type_of(&event) {
        "message" => Ok(InboundPayload::Message(serde_json::from_value(event)?)),
        "app_mention" => Ok(InboundPayload::AppMention(serde_json::from_value(event)?)),
        other => Ok(InboundPayload::Unsupported {
            kind: format!("event_callback/{other}"),
        }),
    }
}

fn type_of(value: &Value) -> &str {
    value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn parse_form(body: &str) -> Result<InboundPayload, EnvelopeError> {
    let mut fields = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    if fields.contains_key("payload") {
        return Ok(InboundPayload::Unsupported {
            kind: "interactive".to_string(),
        });
    }
    let command = fields
        .remove("command")
        .filter(|command| !command.trim().is_empty())
        .ok_or(EnvelopeError::MissingFormField("command"))?;
    Ok(InboundPayload::SlashCommand(SlashCommand {
        command: command.trim().to_string(),
        text: fields.remove("text").unwrap_or_default(),
        channel_id: fields.remove("channel_id").unwrap_or_default(),
        user_id: fields.remove("user_id").unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{parse_inbound, EnvelopeError, InboundPayload, SlashCommand};

    #[test]
    fn unit_url_verification_returns_challenge() {
        let payload = parse_inbound(
            r#"{"token":"t","challenge":"3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P","type":"url_verification"}"#,
        )
        .expect("parsed");
        assert_eq!(
            payload,
            InboundPayload::UrlVerification {
                challenge: "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P".to_string()
            }
        );
    }

    #[test]
    fn functional_event_callback_message_is_normalized() {
        let payload = parse_inbound(
            r#"{
                "type": "event_callback",
                "team_id": "T1",
                "event": {
                    "type": "message",
                    "subtype": "bot_message",
                    "username": "Reacji Channeler",
                    "channel": "C_SPAM",
                    "ts": "1700000000.000100",
                    "text": "<https://acme.slack.com/archives/C_OP/p1639843883000100>"
                }
            }"#,
        )
        .expect("parsed");
        let InboundPayload::Message(event) = payload else {
            panic!("expected a message event");
        };
        assert_eq!(event.channel, "C_SPAM");
        assert_eq!(event.subtype.as_deref(), Some("bot_message"));
        assert_eq!(
            event.text,
            "<https://acme.slack.com/archives/C_OP/p1639843883000100>"
        );
    }

    #[test]
    fn functional_event_callback_app_mention_is_normalized() {
        let payload = parse_inbound(
            r#"{"type":"event_callback","event":{"type":"app_mention","channel":"C1","ts":"1.000200","user":"U1","text":"<@U_PENNY> what's new?"}}"#,
        )
        .expect("parsed");
        let InboundPayload::AppMention(event) = payload else {
            panic!("expected an app mention");
        };
        assert_eq!(event.user.as_deref(), Some("U1"));
        assert_eq!(event.text, "<@U_PENNY> what's new?");
    }

    #[test]
    fn unit_unknown_envelopes_and_events_are_unsupported() {
        assert_eq!(
            parse_inbound(r#"{"type":"app_rate_limited"}"#).expect("parsed"),
            InboundPayload::Unsupported {
                kind: "app_rate_limited".to_string()
            }
        );
        assert_eq!(
            parse_inbound(r#"{"type":"event_callback","event":{"type":"reaction_added"}}"#)
                .expect("parsed"),
            InboundPayload::Unsupported {
                kind: "event_callback/reaction_added".to_string()
            }
        );
    }

    #[test]
    fn functional_slash_command_form_is_decoded() {
        let payload = parse_inbound(
            "token=x&team_id=T1&channel_id=C42&user_id=U7&command=%2Fhelp&text=me+please",
        )
        .expect("parsed");
        assert_eq!(
            payload,
            InboundPayload::SlashCommand(SlashCommand {
                command: "/help".to_string(),
                text: "me please".to_string(),
                channel_id: "C42".to_string(),
                user_id: "U7".to_string(),
            })
        );
    }

    #[test]
    fn regression_malformed_payloads_are_rejected() {
        assert!(matches!(parse_inbound("  "), Err(EnvelopeError::Empty)));
        assert!(matches!(parse_inbound("{not json"), Err(EnvelopeError::Json(_))));
        assert!(matches!(
            parse_inbound("token=x&text=hi"),
            Err(EnvelopeError::MissingFormField("command"))
        ));
        assert!(matches!(
            parse_inbound(r#"{"type":"event_callback","event":{"type":"message"}}"#),
            Err(EnvelopeError::Json(_))
        ));
    }
}

//! Inbound Slack payload handling for Penny.
//!
//! Payloads are verified against the app signing secret, normalized into
//! [`InboundPayload`], and routed by [`EventDispatcher`] to moderation, the
//! "what's new" reply, or the `/help` command.

mod dispatch;
mod envelope;
mod help;
mod signature;

pub use dispatch::{DispatchResponse, EventDispatcher, IngestRequest};
pub use envelope::{parse_inbound, EnvelopeError, InboundPayload, SlashCommand};
pub use help::{help_text, HELP_COMMAND};
pub use signature::{
    current_unix_timestamp_ms, sign_slack_request, verify_slack_signature, SignatureError,
    SLACK_SIGNATURE_MAX_SKEW_SECONDS,
};

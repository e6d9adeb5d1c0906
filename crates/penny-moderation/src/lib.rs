//! Spam-feed moderation for Penny.
//!
//! A report forwarded into the spam-feed channel is resolved back to the
//! original post, scored against a few cheap heuristics, and either removed
//! or answered with a warning. [`Moderator`] drives one event end to end.

mod channel_join;
mod config;
mod moderator;
mod scoring;

pub use channel_join::join_spam_feed_channel;
pub use config::{non_empty, AnomalyWeights, ModerationConfig, ModerationTexts};
pub use moderator::{
    IgnoreReason, ModerationOutcome, ModerationReport, Moderator, BOT_MESSAGE_SUBTYPE,
    REACJI_CHANNELER_USERNAME,
};
pub use scoring::{AnomalyScore, AnomalyScorer, AnomalySignal, ModerationDecision, ScoringError};

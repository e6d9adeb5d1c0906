//! Spam-feed event orchestration.
//!
//! One forwarded report walks a fixed sequence of [`ModerationState`]s. Each
//! step either continues to its successor or finishes the run with a
//! terminal [`ModerationOutcome`]. Slack failures inside a step are logged
//! and the run moves on unless the step is marked terminal.

use std::sync::Arc;

use penny_slack::{
    parse_permalink, reply_in_thread, resolve_message, who_reacted_as_mentions, Message,
    MessageEvent, MessageRef, SlackApi,
};

use crate::{AnomalyScore, AnomalyScorer, ModerationConfig, ModerationDecision};

/// Subtype Slack assigns to messages posted by integrations.
pub const BOT_MESSAGE_SUBTYPE: &str = "bot_message";
/// Display name of the Reacji Channeler app that forwards reported posts.
pub const REACJI_CHANNELER_USERNAME: &str = "Reacji Channeler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not posted by an integration or the Reacji Channeler.
    NotForwardedReport,
    ChannelLookupFailed,
    /// Posted outside the configured spam-feed channel.
    OtherChannel,
    SpamFeedMessageUnresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationReport {
    pub decision: ModerationDecision,
    pub score: AnomalyScore,
    pub threshold: u32,
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    Ignored(IgnoreReason),
    MalformedPermalink,
    ThreadedReplyUnsupported,
    SelfReport,
    Moderated(ModerationReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModerationState {
    Filter,
    ChannelCheck,
    ResolveSpamFeed,
    ExtractReported,
    ResolveOriginal,
    AcknowledgeReporters,
    SelfReportGuard,
    Score,
    Decide,
    Feedback,
    DebugTrail,
}

impl ModerationState {
    const INITIAL: Self = Self::Filter;

    fn successor(self) -> Option<Self> {
        match self {
            Self::Filter => Some(Self::ChannelCheck),
            Self::ChannelCheck => Some(Self::ResolveSpamFeed),
            Self::ResolveSpamFeed => Some(Self::ExtractReported),
            Self::ExtractReported => Some(Self::ResolveOriginal),
            Self::ResolveOriginal => Some(Self::AcknowledgeReporters),
            Self::AcknowledgeReporters => Some(Self::SelfReportGuard),
            Self::SelfReportGuard => Some(Self::Score),
            Self::Score => Some(Self::Decide),
            Self::Decide => Some(Self::Feedback),
            Self::Feedback => Some(Self::DebugTrail),
            Self::DebugTrail => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::ChannelCheck => "channel_check",
            Self::ResolveSpamFeed => "resolve_spam_feed",
            Self::ExtractReported => "extract_reported",
            Self::ResolveOriginal => "resolve_original",
            Self::AcknowledgeReporters => "acknowledge_reporters",
            Self::SelfReportGuard => "self_report_guard",
            Self::Score => "score",
            Self::Decide => "decide",
            Self::Feedback => "feedback",
            Self::DebugTrail => "debug_trail",
        }
    }
}

enum Transition {
    Continue,
    Finish(ModerationOutcome),
}

/// Everything one event accumulates on its way through the states.
struct EventRun<'e> {
    event: &'e MessageEvent,
    spam_feed: Option<Message>,
    reported: Option<MessageRef>,
    original: Option<Message>,
    score: AnomalyScore,
    decision: ModerationDecision,
    removed: bool,
}

impl<'e> EventRun<'e> {
    fn new(event: &'e MessageEvent) -> Self {
        Self {
            event,
            spam_feed: None,
            reported: None,
            original: None,
            score: AnomalyScore::default(),
            decision: ModerationDecision::Warn,
            removed: false,
        }
    }

    fn spam_feed_ref(&self) -> MessageRef {
        MessageRef::new(self.event.channel.clone(), self.event.ts.clone())
    }

    fn into_report(self, threshold: u32) -> ModerationReport {
        ModerationReport {
            decision: self.decision,
            score: self.score,
            threshold,
            removed: self.removed,
        }
    }
}

/// Drives spam-feed events to an outcome.
///
/// `bot` reads channels and posts replies; `user` carries the user token
/// needed for message search and for deleting other people's posts.
#[derive(Clone)]
pub struct Moderator {
    config: Arc<ModerationConfig>,
    bot: Arc<dyn SlackApi>,
    user: Arc<dyn SlackApi>,
    bot_user_id: String,
}

impl Moderator {
    pub fn new(
        config: Arc<ModerationConfig>,
        bot: Arc<dyn SlackApi>,
        user: Arc<dyn SlackApi>,
        bot_user_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            bot,
            user,
            bot_user_id: bot_user_id.into(),
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub async fn handle_message(&self, event: &MessageEvent) -> ModerationOutcome {
        let mut run = EventRun::new(event);
        let mut state = ModerationState::INITIAL;
        loop {
            tracing::trace!(
                state = state.as_str(),
                channel = %event.channel,
                ts = %event.ts,
                "spam-feed step"
            );
            match self.step(state, &mut run).await {
                Transition::Finish(outcome) => {
                    tracing::debug!(
                        state = state.as_str(),
                        channel = %event.channel,
                        ts = %event.ts,
                        outcome = ?outcome,
                        "spam-feed event finished early"
                    );
                    return outcome;
                }
                Transition::Continue => match state.successor() {
                    Some(next) => state = next,
                    None => {
                        let report = run.into_report(self.config.max_anomaly_score);
                        tracing::info!(
                            channel = %event.channel,
                            ts = %event.ts,
                            score = report.score.total(),
                            threshold = report.threshold,
                            removed = report.removed,
                            "spam-feed report moderated"
                        );
                        return ModerationOutcome::Moderated(report);
                    }
                },
            }
        }
    }

    async fn step(&self, state: ModerationState, run: &mut EventRun<'_>) -> Transition {
        match state {
            ModerationState::Filter => self.filter(run.event),
            ModerationState::ChannelCheck => self.check_channel(run.event).await,
            ModerationState::ResolveSpamFeed => self.resolve_spam_feed(run).await,
            ModerationState::ExtractReported => self.extract_reported(run).await,
            ModerationState::ResolveOriginal => self.resolve_original(run).await,
            ModerationState::AcknowledgeReporters => self.acknowledge_reporters(run).await,
            ModerationState::SelfReportGuard => self.guard_self_report(run).await,
            ModerationState::Score => self.score(run).await,
            ModerationState::Decide => self.decide(run).await,
            ModerationState::Feedback => self.add_feedback(run).await,
            ModerationState::DebugTrail => self.post_debug_trail(run).await,
        }
    }

    fn filter(&self, event: &MessageEvent) -> Transition {
        let forwarded = event.subtype.as_deref() == Some(BOT_MESSAGE_SUBTYPE)
            || event.username.as_deref() == Some(REACJI_CHANNELER_USERNAME);
        if forwarded {
            Transition::Continue
        } else {
            Transition::Finish(ModerationOutcome::Ignored(IgnoreReason::NotForwardedReport))
        }
    }

    async fn check_channel(&self, event: &MessageEvent) -> Transition {
        let channel = match self.bot.conversation_info(&event.channel).await {
            Ok(channel) => channel,
            Err(error) => {
                tracing::warn!(channel = %event.channel, error = %error, "channel lookup failed");
                return Transition::Finish(ModerationOutcome::Ignored(
                    IgnoreReason::ChannelLookupFailed,
                ));
            }
        };
        if !channel
            .name_normalized
            .eq_ignore_ascii_case(&self.config.spam_feed_channel)
        {
            return Transition::Finish(ModerationOutcome::Ignored(IgnoreReason::OtherChannel));
        }
        Transition::Continue
    }

    async fn resolve_spam_feed(&self, run: &mut EventRun<'_>) -> Transition {
        match resolve_message(self.bot.as_ref(), &run.spam_feed_ref()).await {
            Ok(message) => {
                run.spam_feed = Some(message);
                Transition::Continue
            }
            Err(error) => {
                tracing::warn!(
                    channel = %run.event.channel,
                    ts = %run.event.ts,
                    error = %error,
                    "could not resolve the spam-feed message"
                );
                Transition::Finish(ModerationOutcome::Ignored(
                    IgnoreReason::SpamFeedMessageUnresolved,
                ))
            }
        }
    }

    async fn extract_reported(&self, run: &mut EventRun<'_>) -> Transition {
        let parsed = match parse_permalink(&run.event.text) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(channel = %run.event.channel, error = %error, "malformed permalink");
                self.reply_to_spam_feed(run, &self.config.texts.malformed_permalink)
                    .await;
                return Transition::Finish(ModerationOutcome::MalformedPermalink);
            }
        };
        if parsed.is_threaded_reply {
            self.reply_to_spam_feed(run, &self.config.texts.threaded_reply_unsupported)
                .await;
            return Transition::Finish(ModerationOutcome::ThreadedReplyUnsupported);
        }
        run.reported = Some(parsed.message);
        Transition::Continue
    }

    async fn resolve_original(&self, run: &mut EventRun<'_>) -> Transition {
        let Some(reported) = run.reported.as_ref() else {
            return Transition::Continue;
        };
        match resolve_message(self.bot.as_ref(), reported).await {
            Ok(message) => run.original = Some(message),
            Err(error) => {
                tracing::warn!(
                    channel = %reported.channel,
                    ts = %reported.ts,
                    error = %error,
                    "could not resolve the reported message"
                );
                self.reply_to_spam_feed(run, &self.config.texts.original_unavailable)
                    .await;
            }
        }
        Transition::Continue
    }

    async fn acknowledge_reporters(&self, run: &mut EventRun<'_>) -> Transition {
        let reporters = run
            .original
            .as_ref()
            .map(|message| who_reacted_as_mentions(message, &self.config.report_emoji))
            .unwrap_or_default();
        if let Some(text) = acknowledgement(&reporters, self.config.acknowledgement.as_deref()) {
            self.reply_to_spam_feed(run, &text).await;
        }
        Transition::Continue
    }

    async fn guard_self_report(&self, run: &mut EventRun<'_>) -> Transition {
        let poster = run
            .original
            .as_ref()
            .and_then(|message| message.user.as_deref());
        if self.bot_user_id.is_empty() || poster != Some(self.bot_user_id.as_str()) {
            return Transition::Continue;
        }
        self.reply_to_spam_feed(run, &self.config.texts.self_report).await;
        Transition::Finish(ModerationOutcome::SelfReport)
    }

    async fn score(&self, run: &mut EventRun<'_>) -> Transition {
        let Some(reported) = run.reported.as_ref() else {
            return Transition::Continue;
        };
        let scorer = AnomalyScorer::new(&self.config);
        run.score = match scorer
            .score(reported, self.bot.as_ref(), self.user.as_ref())
            .await
        {
            Ok(score) => score,
            Err(error) => {
                tracing::warn!(
                    channel = %reported.channel,
                    ts = %reported.ts,
                    error = %error,
                    "anomaly scoring stopped at the report baseline"
                );
                error.into_partial_score()
            }
        };
        Transition::Continue
    }

    async fn decide(&self, run: &mut EventRun<'_>) -> Transition {
        run.decision =
            ModerationDecision::from_score(run.score.total(), self.config.max_anomaly_score);
        match run.decision {
            ModerationDecision::Remove => {
                run.removed = true;
                let Some(original) = run.original.as_ref() else {
                    tracing::warn!(
                        channel = %run.event.channel,
                        score = run.score.total(),
                        "score reached the removal threshold but the reported message is unavailable"
                    );
                    return Transition::Continue;
                };
                self.reply(
                    original,
                    &self.config.removal_reply(),
                    "could not reply to the reported message",
                )
                .await;
                if let Err(error) = self
                    .user
                    .delete_message(&original.channel, &original.ts)
                    .await
                {
                    tracing::warn!(
                        channel = %original.channel,
                        ts = %original.ts,
                        error = %error,
                        "could not delete the reported message"
                    );
                }
            }
            ModerationDecision::Warn => {
                if let (Some(original), Some(warning)) =
                    (run.original.as_ref(), self.config.op_warning.as_deref())
                {
                    self.reply(original, warning, "could not warn the reported poster")
                        .await;
                }
            }
        }
        Transition::Continue
    }

    async fn add_feedback(&self, run: &mut EventRun<'_>) -> Transition {
        if let Some(emoji) = self.config.feedback_emoji(run.removed) {
            let spam_feed = run.spam_feed_ref();
            if let Err(error) = self.bot.add_reaction(emoji, &spam_feed).await {
                tracing::warn!(
                    channel = %spam_feed.channel,
                    ts = %spam_feed.ts,
                    emoji,
                    error = %error,
                    "could not add the feedback reaction"
                );
            }
        }
        Transition::Continue
    }

    async fn post_debug_trail(&self, run: &mut EventRun<'_>) -> Transition {
        if let Some(text) = debug_trail(&run.score, self.config.max_anomaly_score, run.removed) {
            self.reply_to_spam_feed(run, &text).await;
        }
        Transition::Continue
    }

    async fn reply_to_spam_feed(&self, run: &EventRun<'_>, text: &str) {
        if let Some(spam_feed) = run.spam_feed.as_ref() {
            self.reply(spam_feed, text, "could not reply to the spam-feed message")
                .await;
        }
    }

    async fn reply(&self, target: &Message, text: &str, failure: &str) {
        if let Err(error) = reply_in_thread(self.bot.as_ref(), target, text).await {
            tracing::warn!(
                channel = %target.channel,
                ts = %target.ts,
                error = %error,
                "{failure}"
            );
        }
    }
}

/// `Thanks <@U1>,<@U2>! ` followed by the configured template.
fn acknowledgement(reporters: &[String], template: Option<&str>) -> Option<String> {
    let mut text = String::new();
    if !reporters.is_empty() {
        text.push_str(&format!("Thanks {}! ", reporters.join(",")));
    }
    if let Some(template) = template {
        text.push_str(template);
    }
    (!text.is_empty()).then_some(text)
}

fn debug_trail(score: &AnomalyScore, threshold: u32, removed: bool) -> Option<String> {
    if score.signals().is_empty() {
        return None;
    }
    let mut text = String::from("This is what I found about the OP:\n");
    for reason in score.reasons() {
        text.push_str(&format!("- {reason}\n"));
    }
    let total = score.total();
    if removed {
        text.push_str(&format!(
            "I removed the OP since the final anomaly score ({total}/{threshold}) was suspect enough."
        ));
    } else {
        text.push_str(&format!(
            "The final anomaly score ({total}/{threshold}) didn't result in a removal."
        ));
    }
    Some(text)
}

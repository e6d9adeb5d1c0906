//! Heuristic anomaly scoring for reported posters.

use penny_slack::{resolve_message, ConversationError, MessageRef, SlackApi, SlackApiError};
use thiserror::Error;

use crate::ModerationConfig;

/// One scoring rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalySignal {
    pub reason: String,
    pub points: u32,
}

/// Running total plus the signals that contributed to it, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnomalyScore {
    total: u64,
    signals: Vec<AnomalySignal>,
}

impl AnomalyScore {
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn signals(&self) -> &[AnomalySignal] {
        &self.signals
    }

    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|signal| signal.reason.as_str())
    }

    /// Adds `points` with `reason`; zero-point signals leave no trace.
    fn add(&mut self, points: u32, reason: String) {
        if points == 0 {
            return;
        }
        self.total += u64::from(points);
        self.signals.push(AnomalySignal { reason, points });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    Warn,
    Remove,
}

impl ModerationDecision {
    pub fn from_score(total: u64, max_anomaly_score: u32) -> Self {
        if total >= u64::from(max_anomaly_score) {
            Self::Remove
        } else {
            Self::Warn
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    /// The reported post could not be fetched; only the report baseline applies.
    #[error("could not resolve the reported message: {source}")]
    PosterUnresolved {
        baseline: AnomalyScore,
        #[source]
        source: ConversationError,
    },
}

impl ScoringError {
    /// Score accumulated before scoring stopped.
    pub fn into_partial_score(self) -> AnomalyScore {
        match self {
            Self::PosterUnresolved { baseline, .. } => baseline,
        }
    }
}

pub struct AnomalyScorer<'a> {
    config: &'a ModerationConfig,
}

impl<'a> AnomalyScorer<'a> {
    pub fn new(config: &'a ModerationConfig) -> Self {
        Self { config }
    }

    /// Scores the poster of `reported`.
    ///
    /// `conversations` resolves the message and looks up the poster's profile;
    /// `activity` runs the public message search, which needs a user token.
    /// Lookup failures after the message is resolved count as no signal.
    pub async fn score(
        &self,
        reported: &MessageRef,
        conversations: &dyn SlackApi,
        activity: &dyn SlackApi,
    ) -> Result<AnomalyScore, ScoringError> {
        let weights = self.config.weights;
        let mut score = AnomalyScore::default();
        score.add(
            weights.reported,
            format!(
                "reported by the community as being spammy: {}",
                weights.reported
            ),
        );

        let message = match resolve_message(conversations, reported).await {
            Ok(message) => message,
            Err(source) => {
                return Err(ScoringError::PosterUnresolved {
                    baseline: score,
                    source,
                })
            }
        };
        let Some(poster) = message.user.as_deref() else {
            tracing::warn!(
                channel = %reported.channel,
                ts = %reported.ts,
                "reported message has no author; skipping poster lookups"
            );
            return Ok(score);
        };

        let activity_points = self
            .activity_points(poster, activity)
            .await
            .unwrap_or_else(|error| {
                tracing::warn!(user = poster, error = %error, "public activity lookup failed");
                0
            });
        score.add(
            activity_points,
            format!("below the public activity low watermark: {activity_points}"),
        );
        tracing::debug!(user = poster, anomaly_score = score.total(), "scored activity");

        let timezone_points = self
            .timezone_points(poster, conversations)
            .await
            .unwrap_or_else(|error| {
                tracing::warn!(user = poster, error = %error, "user timezone lookup failed");
                0
            });
        score.add(
            timezone_points,
            format!("outside of the community timezone: {timezone_points}"),
        );
        tracing::debug!(user = poster, anomaly_score = score.total(), "scored timezone");

        Ok(score)
    }

    async fn activity_points(&self, user: &str, api: &dyn SlackApi) -> Result<u32, SlackApiError> {
        let watermark = self.config.activity_low_watermark;
        if watermark == 0 {
            return Ok(0);
        }
        let query = format!(
            "after:{} from:<@{user}>",
            self.config.activity_search_after
        );
        let summary = api.search_messages(&query).await?;
        if summary.total < watermark {
            return Ok(self.config.weights.low_activity);
        }
        Ok(0)
    }

    async fn timezone_points(&self, user: &str, api: &dyn SlackApi) -> Result<u32, SlackApiError> {
        let Some(local) = self.config.local_timezone else {
            return Ok(0);
        };
        let profile = api.user_profile(user).await?;
        if profile.tz.as_deref() != Some(local.name()) {
            return Ok(self.config.weights.outside_timezone);
        }
        Ok(0)
    }
}

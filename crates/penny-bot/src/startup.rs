use std::sync::Arc;

use anyhow::{Context, Result};
use penny_cli::Cli;
use penny_moderation::{join_spam_feed_channel, non_empty, Moderator};
use penny_slack::{SlackApi, SlackApiClient};

use crate::event_ingest::run_event_ingest;

/// Clients and moderation state shared by every startup mode.
pub(crate) struct PennyRuntime {
    pub(crate) moderator: Moderator,
    pub(crate) bot: Arc<dyn SlackApi>,
    pub(crate) bot_user_id: String,
}

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let runtime = build_runtime(&cli).await?;

    if cli.spam_feed.spam_feed_auto_join {
        let channel_name = runtime.moderator.config().spam_feed_channel.clone();
        match join_spam_feed_channel(runtime.bot.as_ref(), &channel_name).await? {
            Some(channel) => {
                tracing::info!(channel = %channel.name, id = %channel.id, "joined spam feed channel")
            }
            None => tracing::info!("no spam feed channel configured; skipping auto-join"),
        }
    }

    match cli.event_ingest.slack_event_ingest_file.as_deref() {
        Some(path) => run_event_ingest(runtime, &cli.slack, &cli.event_ingest, path).await,
        None => {
            println!("{}", startup_summary(&runtime));
            Ok(())
        }
    }
}

async fn build_runtime(cli: &Cli) -> Result<PennyRuntime> {
    let config = Arc::new(cli.moderation_config()?);
    let bot_client = SlackApiClient::new(cli.bot_client_config()?)
        .context("failed to build slack bot client")?;
    let user_client = SlackApiClient::new(cli.user_client_config()?)
        .context("failed to build slack user client")?;

    let bot_user_id = match non_empty(cli.slack.slack_bot_user_id.as_deref()) {
        Some(id) => id,
        None => bot_client
            .resolve_bot_user_id()
            .await
            .context("failed to resolve bot user id with auth.test")?,
    };
    tracing::debug!(bot_user_id = %bot_user_id, "slack identity ready");

    let bot: Arc<dyn SlackApi> = Arc::new(bot_client);
    let user: Arc<dyn SlackApi> = Arc::new(user_client);
    let moderator = Moderator::new(config, bot.clone(), user, bot_user_id.clone());
    Ok(PennyRuntime {
        moderator,
        bot,
        bot_user_id,
    })
}

fn startup_summary(runtime: &PennyRuntime) -> String {
    let config = runtime.moderator.config();
    format!(
        "penny ready: bot_user_id={} spam_feed_channel={} report_emoji={} max_anomaly_score={}",
        runtime.bot_user_id,
        config.spam_feed_channel,
        config.report_emoji,
        config.max_anomaly_score
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use penny_moderation::{ModerationConfig, Moderator};
    use penny_slack::testing::RecordingSlackApi;

    use super::{startup_summary, PennyRuntime};

    #[test]
    fn unit_startup_summary_reports_effective_settings() {
        let bot = Arc::new(RecordingSlackApi::new());
        let config = ModerationConfig {
            report_emoji: "rotating_light".to_string(),
            ..ModerationConfig::default()
        };
        let runtime = PennyRuntime {
            moderator: Moderator::new(
                Arc::new(config),
                bot.clone(),
                Arc::new(RecordingSlackApi::new()),
                "U_PENNY",
            ),
            bot,
            bot_user_id: "U_PENNY".to_string(),
        };
        assert_eq!(
            startup_summary(&runtime),
            "penny ready: bot_user_id=U_PENNY spam_feed_channel=spam-feed report_emoji=rotating_light max_anomaly_score=5"
        );
    }
}

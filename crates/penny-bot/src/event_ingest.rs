use std::path::Path;

use anyhow::{Context, Result};
use penny_cli::{CliEventIngestFlags, CliSlackFlags};
use penny_events::{DispatchResponse, EventDispatcher, IngestRequest};

use crate::startup::PennyRuntime;
use crate::BUNDLED_CHANGELOG;

/// Verifies and dispatches one captured Slack request, printing the
/// synchronous response body Slack would receive.
pub(crate) async fn run_event_ingest(
    runtime: PennyRuntime,
    slack: &CliSlackFlags,
    flags: &CliEventIngestFlags,
    path: &Path,
) -> Result<()> {
    let dispatcher = build_dispatcher(runtime, slack, flags);
    let response = ingest_event_file(&dispatcher, flags, path).await?;
    let body = response.body();
    if !body.is_empty() {
        println!("{body}");
    }
    Ok(())
}

fn build_dispatcher(
    runtime: PennyRuntime,
    slack: &CliSlackFlags,
    flags: &CliEventIngestFlags,
) -> EventDispatcher {
    EventDispatcher::new(
        runtime.moderator,
        runtime.bot,
        runtime.bot_user_id,
        BUNDLED_CHANGELOG,
    )
    .with_signing_secret(slack.slack_signing_secret.clone())
    .with_max_skew_seconds(flags.slack_event_max_skew_seconds)
}

async fn ingest_event_file(
    dispatcher: &EventDispatcher,
    flags: &CliEventIngestFlags,
    path: &Path,
) -> Result<DispatchResponse> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read slack event payload {}", path.display()))?;
    let request = IngestRequest {
        body,
        signature: flags.slack_event_signature.clone(),
        timestamp: flags.slack_event_timestamp.clone(),
    };
    let response = dispatcher.ingest(&request).await?;
    tracing::info!(path = %path.display(), response_bytes = response.body().len(), "slack event ingested");
    Ok(response)
}

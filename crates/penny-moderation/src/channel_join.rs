use anyhow::{bail, Context, Result};
use penny_slack::{ChannelInfo, SlackApi};

/// Joins the spam-feed channel by name so its messages reach the bot.
///
/// Returns `Ok(None)` when no channel name is configured. Pages through
/// `conversations.list` until a channel's name or normalized name matches.
pub async fn join_spam_feed_channel(api: &dyn SlackApi, name: &str) -> Result<Option<ChannelInfo>> {
    let name = name.trim();
    if name.is_empty() {
        tracing::debug!("no spam-feed channel configured; skipping auto-join");
        return Ok(None);
    }

    let mut cursor: Option<String> = None;
    let mut pages = 0_usize;
    loop {
        let page = api
            .list_conversations(cursor.as_deref())
            .await
            .context("failed to list slack channels")?;
        pages += 1;
        if let Some(channel) = page
            .channels
            .into_iter()
            .find(|channel| channel.name == name || channel.name_normalized == name)
        {
            api.join_conversation(&channel.id)
                .await
                .with_context(|| format!("failed to join channel \"{name}\""))?;
            tracing::info!(channel = %channel.id, name, pages, "joined spam-feed channel");
            return Ok(Some(channel));
        }
        match page.next_cursor.filter(|next| !next.is_empty()) {
            Some(next) => cursor = Some(next),
            None => bail!("channel \"{name}\" not found"),
        }
    }
}

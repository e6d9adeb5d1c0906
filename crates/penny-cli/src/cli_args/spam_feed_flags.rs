use clap::{ArgAction, Args};

/// Spam-feed channel, report emoji, and the optional replies and reactions.
#[derive(Debug, Clone, Args)]
pub struct CliSpamFeedFlags {
    #[arg(
        long = "spam-feed-channel",
        env = "PENNY_SPAM_FEED_CHANNEL",
        default_value = "spam-feed",
        help = "Normalized name of the channel reported posts are forwarded into"
    )]
    pub spam_feed_channel: String,

    #[arg(
        long = "spam-feed-auto-join",
        env = "PENNY_SPAM_FEED_AUTO_JOIN",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Join the spam-feed channel at startup"
    )]
    pub spam_feed_auto_join: bool,

    #[arg(
        long = "spam-feed-emoji",
        env = "PENNY_SPAM_FEED_EMOJI",
        default_value = "no_good",
        help = "Reaction the community uses to report a post"
    )]
    pub spam_feed_emoji: String,

    #[arg(
        long = "spam-feed-reacji-response",
        env = "PENNY_SPAM_FEED_REACJI_RESPONSE",
        help = "Acknowledgement posted in the spam-feed thread after the reporter mentions"
    )]
    pub spam_feed_reacji_response: Option<String>,

    #[arg(
        long = "spam-feed-op-warning",
        env = "PENNY_SPAM_FEED_OP_WARNING",
        help = "Warning posted on reported posts that are not removed"
    )]
    pub spam_feed_op_warning: Option<String>,

    #[arg(
        long = "spam-feed-assistance-channel-id",
        env = "PENNY_SPAM_FEED_ASSISTANCE_CHANNEL_ID",
        help = "Channel id people are pointed at in removal notices and /help"
    )]
    pub spam_feed_assistance_channel_id: Option<String>,

    #[arg(
        long = "spam-feed-reaction-emoji-hit",
        env = "PENNY_SPAM_FEED_REACTION_EMOJI_HIT",
        help = "Reaction added to the spam-feed message when the post was removed"
    )]
    pub spam_feed_reaction_emoji_hit: Option<String>,

    #[arg(
        long = "spam-feed-reaction-emoji-miss",
        env = "PENNY_SPAM_FEED_REACTION_EMOJI_MISS",
        help = "Reaction added to the spam-feed message when the post was kept"
    )]
    pub spam_feed_reaction_emoji_miss: Option<String>,
}

use penny_moderation::ModerationConfig;

pub const HELP_COMMAND: &str = "/help";

/// Immediate response for the `/help` slash command.
pub fn help_text(config: &ModerationConfig) -> String {
    let mut text = format!(
        "*Penny* is a community moderation bot that monitors for the :{}: reaction to detect and remove spam messages.",
        config.report_emoji
    );
    if let Some(channel) = config.assistance_channel_id.as_deref() {
        text.push_str(&format!("\n\nNeed help or have questions? Visit <#{channel}>."));
    }
    text
}

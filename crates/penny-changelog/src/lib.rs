//! Keep-a-Changelog parsing and the "what's new" mention reply.

mod changelog;
mod whats_new;

pub use changelog::{
    format_section, format_section_markdown, Changelog, ChangelogError, Section,
    UNRELEASED_VERSION, UP_TO_DATE,
};
pub use whats_new::{format_whats_new, is_whats_new, reply_whats_new, CHANGELOG_UNAVAILABLE};

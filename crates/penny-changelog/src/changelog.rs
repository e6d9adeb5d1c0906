//! Keep-a-Changelog parsing with Slack mrkdwn and plain markdown renderers.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Version label of the pending, unreleased section.
pub const UNRELEASED_VERSION: &str = "Unreleased";
pub const UP_TO_DATE: &str = "You're up to date!";

// `## [version]` or `## [version] - date`
static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^## \[(.+?)\](?:\s*-\s*(.+))?").expect("section header pattern is valid")
});
static SUBHEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{3,6}\s+(.+?)\s*$").expect("subheading pattern is valid"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangelogError {
    #[error("changelog is empty")]
    Empty,
    #[error("version \"{0}\" not found in changelog")]
    UnknownVersion(String),
}

/// One `## [version]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub version: String,
    pub date: Option<String>,
    /// Raw markdown between this header and the next.
    pub body: String,
}

/// Changelog sections, newest first as they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    pub sections: Vec<Section>,
}

impl Changelog {
    /// Splits raw changelog text into sections. Text before the first
    /// section header is dropped.
    pub fn parse(raw: &str) -> Self {
        let mut sections = Vec::new();
        let mut current: Option<Section> = None;
        for line in raw.lines() {
            if let Some(captures) = SECTION_HEADER.captures(line) {
                sections.extend(current.take());
                current = Some(Section {
                    version: captures[1].to_string(),
                    date: captures
                        .get(2)
                        .map(|date| date.as_str().trim().to_string())
                        .filter(|date| !date.is_empty()),
                    body: String::new(),
                });
                continue;
            }
            if let Some(section) = current.as_mut() {
                section.body.push_str(line);
                section.body.push('\n');
            }
        }
        sections.extend(current);
        Self { sections }
    }

    /// Newest section as Slack mrkdwn.
    pub fn latest(&self) -> Result<String, ChangelogError> {
        self.render_latest(format_section)
    }

    /// Every section newer than `version` as Slack mrkdwn.
    pub fn since(&self, version: &str) -> Result<String, ChangelogError> {
        self.render_since(version, format_section)
    }

    pub fn latest_markdown(&self) -> Result<String, ChangelogError> {
        self.render_latest(format_section_markdown)
    }

    pub fn since_markdown(&self, version: &str) -> Result<String, ChangelogError> {
        self.render_since(version, format_section_markdown)
    }

    fn render_latest(&self, render: fn(&Section) -> String) -> Result<String, ChangelogError> {
        self.sections
            .first()
            .map(render)
            .ok_or(ChangelogError::Empty)
    }

    fn render_since(
        &self,
        version: &str,
        render: fn(&Section) -> String,
    ) -> Result<String, ChangelogError> {
        let index = self
            .sections
            .iter()
            .position(|section| section.version == version)
            .ok_or_else(|| ChangelogError::UnknownVersion(version.to_string()))?;
        if index == 0 {
            return Ok(UP_TO_DATE.to_string());
        }
        Ok(self.sections[..index]
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Renders a section as Slack mrkdwn: `*vX* (date)` header, `*Heading*`
/// subheadings, single-asterisk bold, and `<url|text>` links.
pub fn format_section(section: &Section) -> String {
    let body = section
        .body
        .lines()
        .map(slack_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n{}\n",
        section_header(section, "*"),
        body.trim_end_matches('\n')
    )
}

/// Renders a section as standard markdown for Slack's markdown block.
pub fn format_section_markdown(section: &Section) -> String {
    format!(
        "{}\n{}\n",
        section_header(section, "**"),
        section.body.trim_end_matches('\n')
    )
}

fn section_header(section: &Section, strong: &str) -> String {
    if section.version == UNRELEASED_VERSION {
        return format!("{strong}Latest Changes{strong}");
    }
    match &section.date {
        Some(date) => format!("{strong}v{}{strong} ({date})", section.version),
        None => format!("{strong}v{}{strong}", section.version),
    }
}

fn slack_line(line: &str) -> String {
    let line = LINK.replace_all(line, "<${2}|${1}>");
    let line = BOLD.replace_all(&line, "*${1}*");
    match SUBHEADING.captures(&line) {
        Some(captures) => format!("*{}*", &captures[1]),
        None => line.into_owned(),
    }
}

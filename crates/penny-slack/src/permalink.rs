//! Slack message permalink parsing.

use thiserror::Error;
use url::Url;

use crate::MessageRef;

/// Digits after the decimal point in a Slack timestamp.
const TS_FRACTION_DIGITS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPermalink {
    pub message: MessageRef,
    /// True when the link points at a reply inside someone else's thread.
    pub is_threaded_reply: bool,
}

/// A permalink that cannot be turned into a message reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermalinkError {
    #[error("permalink '{input}' is not a valid url: {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("permalink '{input}' is not an /archives/<channel>/p<ts> link")]
    UnexpectedPath { input: String },
    #[error("permalink timestamp segment '{segment}' is not a compact slack timestamp")]
    InvalidTimestamp { segment: String },
}

/// Parses `https://<team>.slack.com/archives/<channel>/p<digits>[?thread_ts=..]`.
///
/// Angle brackets and a trailing `|label` from Slack's link markup are
/// stripped first.
pub fn parse_permalink(text: &str) -> Result<ParsedPermalink, PermalinkError> {
    let trimmed = text.trim().trim_start_matches('<').trim_end_matches('>');
    let link = trimmed.split('|').next().unwrap_or_default().trim();

    let url = Url::parse(link).map_err(|error| PermalinkError::InvalidUrl {
        input: link.to_string(),
        reason: error.to_string(),
    })?;
    let unexpected_path = || PermalinkError::UnexpectedPath {
        input: link.to_string(),
    };

    let segments = url
        .path_segments()
        .map(|segments| segments.filter(|segment| !segment.is_empty()).collect::<Vec<_>>())
        .ok_or_else(unexpected_path)?;
    let [archives, channel, ts_segment, ..] = segments.as_slice() else {
        return Err(unexpected_path());
    };
    if *archives != "archives" || channel.is_empty() {
        return Err(unexpected_path());
    }

    let ts = permalink_path_ts(ts_segment)?;
    let is_threaded_reply = url
        .query_pairs()
        .find(|(key, _)| key == "thread_ts")
        .map(|(_, value)| value.trim().to_string())
        .filter(|thread_ts| !thread_ts.is_empty())
        .is_some_and(|thread_ts| thread_ts != ts);

    Ok(ParsedPermalink {
        message: MessageRef::new(*channel, ts),
        is_threaded_reply,
    })
}

/// Rebuilds `seconds.micros` from a permalink path segment such as `p1639843883000100`.
pub fn permalink_path_ts(segment: &str) -> Result<String, PermalinkError> {
    let digits = segment.strip_prefix('p').unwrap_or(segment);
    if digits.len() <= TS_FRACTION_DIGITS || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(PermalinkError::InvalidTimestamp {
            segment: segment.to_string(),
        });
    }
    let (seconds, fraction) = digits.split_at(digits.len() - TS_FRACTION_DIGITS);
    Ok(format!("{seconds}.{fraction}"))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{parse_permalink, permalink_path_ts, PermalinkError};
    use crate::MessageRef;

    #[test]
    fn unit_parse_permalink_top_level_post() {
        let parsed =
            parse_permalink("https://orgname.slack.com/archives/C02BZ36790B/p1639843883000100")
                .expect("parsed");
        assert_eq!(
            parsed.message,
            MessageRef::new("C02BZ36790B", "1639843883.000100")
        );
        assert!(!parsed.is_threaded_reply);
    }

    #[test]
    fn unit_parse_permalink_thread_root_is_not_a_reply() {
        let parsed = parse_permalink(
            "https://orgname.slack.com/archives/C02BZ36790B/p1639844350001200?thread_ts=1639844350.001200&amp;cid=C02BZ36790B",
        )
        .expect("parsed");
        assert_eq!(parsed.message.ts, "1639844350.001200");
        assert!(!parsed.is_threaded_reply);
    }

    #[test]
    fn unit_parse_permalink_reply_inside_thread() {
        let parsed = parse_permalink(
            "https://orgname.slack.com/archives/C02BZ36790B/p1639843883000800?thread_ts=1639843880.000700&amp;cid=C02BZ36790B",
        )
        .expect("parsed");
        assert_eq!(parsed.message.ts, "1639843883.000800");
        assert!(parsed.is_threaded_reply);
    }

    #[test]
    fn functional_parse_permalink_strips_slack_link_markup() {
        let parsed = parse_permalink(
            "<https://orgname.slack.com/archives/C1/p1639843883000100|original message>",
        )
        .expect("parsed");
        assert_eq!(parsed.message, MessageRef::new("C1", "1639843883.000100"));
    }

    #[test]
    fn regression_malformed_permalinks_are_errors_not_empty_refs() {
        assert!(matches!(
            parse_permalink("not a link"),
            Err(PermalinkError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_permalink("https://orgname.slack.com/"),
            Err(PermalinkError::UnexpectedPath { .. })
        ));
        assert!(matches!(
            parse_permalink("https://orgname.slack.com/team/U123/profile"),
            Err(PermalinkError::UnexpectedPath { .. })
        ));
        assert!(matches!(
            parse_permalink("https://orgname.slack.com/archives/C1/p12345"),
            Err(PermalinkError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn unit_permalink_path_ts_accepts_prefixed_and_bare_digits() {
        assert_eq!(
            permalink_path_ts("p1639843883000100").expect("prefixed"),
            "1639843883.000100"
        );
        assert_eq!(
            permalink_path_ts("1639843883000100").expect("bare"),
            "1639843883.000100"
        );
        assert!(permalink_path_ts("p16398x3883000100").is_err());
    }

    proptest! {
        #[test]
        fn property_plain_permalinks_round_trip(
            channel in "C[A-Z0-9]{8,10}",
            seconds in 1_000_000_000_u64..2_000_000_000,
            micros in 0_u32..1_000_000,
        ) {
            let link = format!("https://acme.slack.com/archives/{channel}/p{seconds}{micros:06}");
            let parsed = parse_permalink(&link).expect("parsed");
            prop_assert_eq!(parsed.message, MessageRef::new(channel, format!("{seconds}.{micros:06}")));
            prop_assert!(!parsed.is_threaded_reply);
        }

        #[test]
        fn property_thread_ts_equal_to_own_ts_is_thread_root(
            seconds in 1_000_000_000_u64..2_000_000_000,
            micros in 0_u32..1_000_000,
        ) {
            let link = format!(
                "https://acme.slack.com/archives/C1/p{seconds}{micros:06}?thread_ts={seconds}.{micros:06}&cid=C1"
            );
            prop_assert!(!parse_permalink(&link).expect("parsed").is_threaded_reply);
        }

        #[test]
        fn property_thread_ts_different_from_own_ts_is_reply(
            seconds in 1_000_000_000_u64..2_000_000_000,
            micros in 0_u32..1_000_000,
            offset in 1_u64..10_000,
        ) {
            let root = seconds - offset;
            let link = format!(
                "https://acme.slack.com/archives/C1/p{seconds}{micros:06}?thread_ts={root}.{micros:06}"
            );
            prop_assert!(parse_permalink(&link).expect("parsed").is_threaded_reply);
        }
    }
}

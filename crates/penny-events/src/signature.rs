//! Slack `v0` request signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Slack rejects requests older than five minutes; so do we.
pub const SLACK_SIGNATURE_MAX_SKEW_SECONDS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("slack request signature is required when a signing secret is configured")]
    MissingSignature,
    #[error("slack request timestamp is required when a signing secret is configured")]
    MissingTimestamp,
    #[error("slack request signature must use v0=<hex> format")]
    InvalidFormat,
    #[error("invalid signature digest: {0}")]
    InvalidDigest(String),
    #[error("invalid slack request timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("slack request timestamp skew {skew_seconds}s exceeds max {max_skew_seconds}s")]
    Stale {
        skew_seconds: u64,
        max_skew_seconds: u64,
    },
    #[error("failed to initialize request HMAC verifier")]
    InvalidKey,
    #[error("slack request signature verification failed")]
    Mismatch,
}

/// Checks `signature` against `v0=hex(HMAC-SHA256(secret, "v0:<timestamp>:<body>"))`.
///
/// A `max_skew_seconds` of 0 disables the timestamp freshness check.
pub fn verify_slack_signature(
    body: &str,
    signature: &str,
    timestamp: &str,
    secret: &str,
    now_unix_ms: u64,
    max_skew_seconds: u64,
) -> Result<(), SignatureError> {
    validate_timestamp_skew(timestamp, now_unix_ms, max_skew_seconds)?;
    let Some(digest_hex) = signature.trim().strip_prefix("v0=") else {
        return Err(SignatureError::InvalidFormat);
    };
    let signature_bytes = decode_hex(digest_hex)?;
    signing_mac(secret, timestamp.trim(), body)?
        .verify_slice(&signature_bytes)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produces the `X-Slack-Signature` value Slack would send for `body`.
pub fn sign_slack_request(
    secret: &str,
    timestamp: &str,
    body: &str,
) -> Result<String, SignatureError> {
    let digest = signing_mac(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!(
        "v0={}",
        digest
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>()
    ))
}

pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

fn signing_mac(secret: &str, timestamp: &str, body: &str) -> Result<Hmac<Sha256>, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(format!("v0:{timestamp}:{body}").as_bytes());
    Ok(mac)
}

fn decode_hex(value: &str) -> Result<Vec<u8>, SignatureError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SignatureError::InvalidDigest(
            "signature digest cannot be empty".to_string(),
        ));
    }
    if trimmed.len() % 2 != 0 {
        return Err(SignatureError::InvalidDigest(
            "signature digest must have an even number of hex characters".to_string(),
        ));
    }

    trimmed
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| {
                    SignatureError::InvalidDigest(format!(
                        "invalid hex byte '{}' in signature digest",
                        String::from_utf8_lossy(pair)
                    ))
                })
        })
        .collect()
}

fn validate_timestamp_skew(
    timestamp: &str,
    now_unix_ms: u64,
    max_skew_seconds: u64,
) -> Result<(), SignatureError> {
    let timestamp_seconds = timestamp
        .trim()
        .parse::<u64>()
        .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;
    if max_skew_seconds == 0 {
        return Ok(());
    }
    let skew_seconds = (now_unix_ms / 1_000).abs_diff(timestamp_seconds);
    if skew_seconds > max_skew_seconds {
        return Err(SignatureError::Stale {
            skew_seconds,
            max_skew_seconds,
        });
    }
    Ok(())
}

use std::sync::Arc;

use httpmock::prelude::*;
use penny_events::{
    current_unix_timestamp_ms, sign_slack_request, DispatchResponse, EventDispatcher,
    IngestRequest,
};
use penny_moderation::{ModerationConfig, Moderator};
use penny_slack::{SlackApiClient, SlackApiClientConfig};
use serde_json::json;

const SIGNING_SECRET: &str = "flow-signing-secret";
const CHANGELOG: &str = "## [Unreleased]\n\n### Added\n\n- Flow tests\n\n## [0.1.0] - 2026-06-20\n\n- Initial\n";
const REPORT_TEXT: &str = "<https://acme.slack.com/archives/C_OP/p1639843883000100>";

fn dispatcher(server: &MockServer, config: ModerationConfig) -> EventDispatcher {
    let bot = Arc::new(
        SlackApiClient::new(SlackApiClientConfig::new(server.base_url(), "xoxb-flow"))
            .expect("bot client"),
    );
    let user = Arc::new(
        SlackApiClient::new(SlackApiClientConfig::new(server.base_url(), "xoxp-flow"))
            .expect("user client"),
    );
    let moderator = Moderator::new(Arc::new(config), bot.clone(), user, "U_PENNY");
    EventDispatcher::new(moderator, bot, "U_PENNY", CHANGELOG)
        .with_signing_secret(Some(SIGNING_SECRET.to_string()))
}

fn signed(body: String) -> IngestRequest {
    let timestamp = (current_unix_timestamp_ms() / 1_000).to_string();
    IngestRequest {
        signature: Some(sign_slack_request(SIGNING_SECRET, &timestamp, &body).expect("sign")),
        timestamp: Some(timestamp),
        body,
    }
}

fn forwarded_report() -> IngestRequest {
    signed(
        json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "subtype": "bot_message",
                "username": "Reacji Channeler",
                "channel": "C_SPAM",
                "ts": "1700000000.000100",
                "text": REPORT_TEXT
            }
        })
        .to_string(),
    )
}

fn mock_conversations(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.info")
            .query_param("channel", "C_SPAM");
        then.status(200).json_body(json!({
            "ok": true,
            "channel": {"id": "C_SPAM", "name": "spam-feed", "name_normalized": "spam-feed"}
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/conversations.join");
        then.status(200)
            .json_body(json!({"ok": false, "error": "already_in_channel"}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.history")
            .query_param("channel", "C_SPAM")
            .query_param("latest", "1700000000.000100");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [{"ts": "1700000000.000100", "text": REPORT_TEXT}]
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.history")
            .query_param("channel", "C_OP")
            .query_param("latest", "1639843883.000100");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [{
                "ts": "1639843883.000100",
                "user": "U_SPAMMER",
                "text": "limited offer, click now",
                "reactions": [{"name": "no_good", "users": ["U_R1", "U_R2"], "count": 2}]
            }]
        }));
    });
}

fn mock_poster(server: &MockServer, tz: &str, public_messages: u64) {
    let tz = tz.to_string();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/users.info")
            .query_param("user", "U_SPAMMER");
        then.status(200).json_body(json!({
            "ok": true,
            "user": {"id": "U_SPAMMER", "tz": tz}
        }));
    });
    server.mock(move |when, then| {
        when.method(GET)
            .path("/search.messages")
            .header("authorization", "Bearer xoxp-flow")
            .query_param("query", "after:2021/12/01 from:<@U_SPAMMER>");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": {"total": public_messages}
        }));
    });
}

fn flow_config() -> ModerationConfig {
    ModerationConfig {
        acknowledgement: Some("A moderator will take a look.".to_string()),
        op_warning: Some("Your post was reported as spam.".to_string()),
        reaction_emoji_hit: Some("white_check_mark".to_string()),
        reaction_emoji_miss: Some("eyes".to_string()),
        activity_low_watermark: 5,
        local_timezone: Some(chrono_tz::America::New_York),
        ..ModerationConfig::default()
    }
}

#[tokio::test]
async fn integration_suspicious_report_is_removed_through_slack_web_api() {
    let server = MockServer::start();
    mock_conversations(&server);
    mock_poster(&server, "Asia/Tokyo", 1);
    let acknowledgement = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"thread_ts\":\"1700000000.000100\"")
            .body_includes("Thanks <@U_R1>,<@U_R2>! A moderator will take a look.");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C_SPAM", "ts": "1700000001.000100"}));
    });
    let removal_notice = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"channel\":\"C_OP\"")
            .body_includes("\"thread_ts\":\"1639843883.000100\"");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C_OP", "ts": "1700000002.000100"}));
    });
    let debug_trail = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("This is what I found about the OP")
            .body_includes("(5/5)");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C_SPAM", "ts": "1700000003.000100"}));
    });
    let delete = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.delete")
            .header("authorization", "Bearer xoxp-flow")
            .body_includes("\"ts\":\"1639843883.000100\"");
        then.status(200).json_body(json!({"ok": true}));
    });
    let hit = server.mock(|when, then| {
        when.method(POST)
            .path("/reactions.add")
            .body_includes("\"name\":\"white_check_mark\"")
            .body_includes("\"timestamp\":\"1700000000.000100\"");
        then.status(200).json_body(json!({"ok": true}));
    });

    let response = dispatcher(&server, flow_config())
        .ingest(&forwarded_report())
        .await
        .expect("ingest");
    assert_eq!(response, DispatchResponse::Empty);

    acknowledgement.assert_calls(1);
    removal_notice.assert_calls(1);
    debug_trail.assert_calls(1);
    delete.assert_calls(1);
    hit.assert_calls(1);
}

#[tokio::test]
async fn integration_local_active_poster_is_warned_not_removed() {
    let server = MockServer::start();
    mock_conversations(&server);
    mock_poster(&server, "America/New_York", 120);
    let posts = server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C_SPAM", "ts": "1700000001.000100"}));
    });
    let delete = server.mock(|when, then| {
        when.method(POST).path("/chat.delete");
        then.status(200).json_body(json!({"ok": true}));
    });
    let miss = server.mock(|when, then| {
        when.method(POST)
            .path("/reactions.add")
            .body_includes("\"name\":\"eyes\"");
        then.status(200).json_body(json!({"ok": true}));
    });

    dispatcher(&server, flow_config())
        .ingest(&forwarded_report())
        .await
        .expect("ingest");

    // acknowledgement, warning on the OP, debug trail
    posts.assert_calls(3);
    delete.assert_calls(0);
    miss.assert_calls(1);
}

#[tokio::test]
async fn integration_unknown_channel_is_ignored_without_side_effects() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/conversations.info");
        then.status(200).json_body(json!({
            "ok": true,
            "channel": {"id": "C_SPAM", "name": "random", "name_normalized": "random"}
        }));
    });
    let writes = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({"ok": true}));
    });

    dispatcher(&server, flow_config())
        .ingest(&forwarded_report())
        .await
        .expect("ingest");
    writes.assert_calls(0);
}

#[tokio::test]
async fn integration_whats_new_mention_replies_in_thread() {
    let server = MockServer::start();
    let reply = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .header("authorization", "Bearer xoxb-flow")
            .body_includes("\"thread_ts\":\"1700000000.000900\"")
            .body_includes("Latest Changes")
            .body_includes("Flow tests");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C_GENERAL", "ts": "1700000000.001000"}));
    });

    let body = json!({
        "type": "event_callback",
        "event": {
            "type": "app_mention",
            "channel": "C_GENERAL",
            "ts": "1700000000.000900",
            "user": "U_ASKER",
            "text": "<@U_PENNY> what's new?"
        }
    })
    .to_string();
    dispatcher(&server, ModerationConfig::default())
        .ingest(&signed(body))
        .await
        .expect("ingest");
    reply.assert_calls(1);
}

//! Channel-specific payload construction.
//!
//! Every channel renders the same [`NotificationContext`] into its own
//! JSON shape: a flat event object for generic webhooks, an embed for
//! Discord, block kit for Slack, and a MarkdownV2 message for Telegram.

use regex::Regex;
use serde_json::{json, Value};

use crate::models::NotificationContext;

/// Discord embed colors, decimal.
const COLOR_RED: u32 = 15158332;
const COLOR_BLUE: u32 = 3447003;

/// The flat event payload for generic webhooks.
pub fn generic_webhook(ctx: &NotificationContext) -> Value {
    json!({
        "event_type": "safe_transaction",
        "alert_type": ctx.alert_label(),
        "safe": {
            "address": ctx.safe_address,
            "network": ctx.network,
        },
        "transaction": {
            "hash": ctx.safe_tx_hash,
            "description": ctx.description,
            "nonce": ctx.nonce,
            "status": ctx.status,
            "execution_hash": ctx.execution_hash,
        },
        "links": ctx.links,
        "timestamp": ctx.timestamp.to_rfc3339(),
    })
}

fn title(ctx: &NotificationContext) -> String {
    if ctx.is_suspicious {
        format!("Suspicious Safe transaction on {}", ctx.network)
    } else {
        format!("Safe transaction on {}", ctx.network)
    }
}

fn links_line(ctx: &NotificationContext) -> String {
    let mut parts = vec![format!("[Safe App]({})", ctx.links.safe_app)];
    if let Some(monitor) = &ctx.links.safe_monitor {
        parts.push(format!("[Safe Monitor]({monitor})"));
    }
    if let Some(explorer) = &ctx.links.etherscan {
        parts.push(format!("[Explorer]({explorer})"));
    }
    parts.join(" | ")
}

/// Discord embed payload. Webhooks cannot carry interactive components, so
/// the links render as markdown in a trailing field.
pub fn discord(ctx: &NotificationContext) -> Value {
    let color = if ctx.is_suspicious { COLOR_RED } else { COLOR_BLUE };
    let mut fields = vec![
        json!({"name": "Network", "value": ctx.network, "inline": true}),
        json!({"name": "Nonce", "value": ctx.nonce.to_string(), "inline": true}),
        json!({"name": "Status", "value": ctx.status, "inline": true}),
        json!({"name": "Description", "value": ctx.description, "inline": false}),
        json!({"name": "Hash", "value": ctx.safe_tx_hash, "inline": false}),
    ];
    if !ctx.warnings.is_empty() {
        fields.push(json!({
            "name": "Warnings",
            "value": ctx.warnings.join("\n"),
            "inline": false,
        }));
    }
    fields.push(json!({"name": "Links", "value": links_line(ctx), "inline": false}));

    json!({
        "embeds": [{
            "title": title(ctx),
            "url": ctx.links.safe_app,
            "color": color,
            "fields": fields,
            "timestamp": ctx.timestamp.to_rfc3339(),
        }]
    })
}

/// Slack block-kit payload with action buttons for the links.
pub fn slack(ctx: &NotificationContext) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {"type": "plain_text", "text": title(ctx), "emoji": true}
        }),
        json!({
            "type": "section",
            "fields": [
                {"type": "mrkdwn", "text": format!("*Network:*\n{}", ctx.network)},
                {"type": "mrkdwn", "text": format!("*Nonce:*\n{}", ctx.nonce)},
                {"type": "mrkdwn", "text": format!("*Status:*\n{}", ctx.status)},
                {"type": "mrkdwn", "text": format!("*Risk:*\n{:?}", ctx.risk_level)},
            ]
        }),
        json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Description:* {}\n*Hash:* `{}`", ctx.description, ctx.safe_tx_hash)
            }
        }),
    ];
    if !ctx.warnings.is_empty() {
        blocks.push(json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": format!("*Warnings:*\n{}", ctx.warnings.join("\n"))}
        }));
    }

    let mut buttons = vec![json!({
        "type": "button",
        "text": {"type": "plain_text", "text": "Open in Safe App"},
        "url": ctx.links.safe_app,
    })];
    if let Some(monitor) = &ctx.links.safe_monitor {
        buttons.push(json!({
            "type": "button",
            "text": {"type": "plain_text", "text": "Open in Safe Monitor"},
            "url": monitor,
        }));
    }
    if let Some(explorer) = &ctx.links.etherscan {
        buttons.push(json!({
            "type": "button",
            "text": {"type": "plain_text", "text": "View on Explorer"},
            "url": explorer,
        }));
    }
    blocks.push(json!({"type": "actions", "elements": buttons}));

    json!({"blocks": blocks})
}

/// Telegram Bot API `sendMessage` payload with MarkdownV2 formatting.
pub fn telegram(chat_id: &str, disable_web_preview: bool, ctx: &NotificationContext) -> Value {
    let mut body = format!(
        "*Network:* {}\n*Description:* {}\n*Nonce:* {}\n*Status:* {}\n*Hash:* `{}`",
        ctx.network, ctx.description, ctx.nonce, ctx.status, ctx.safe_tx_hash
    );
    if !ctx.warnings.is_empty() {
        body.push_str(&format!("\n*Warnings:*\n{}", ctx.warnings.join("\n")));
    }
    body.push_str(&format!("\n[Open in Safe App]({})", ctx.links.safe_app));

    let text = format!(
        "*{}*\n\n{}",
        escape_markdown_v2(&title(ctx)),
        escape_markdown_v2(&body)
    );
    json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "MarkdownV2",
        "disable_web_page_preview": disable_web_preview,
    })
}

/// Escapes text for Telegram's MarkdownV2 format, preserving existing
/// markdown entities (`*bold*`, `` `code` ``, links) while escaping
/// special characters outside of them and within link URLs.
fn escape_markdown_v2(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
        '\\',
    ];

    let escape_into = |out: &mut String, chunk: &str| {
        for c in chunk.chars() {
            if SPECIAL.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
    };

    let re = Regex::new(
        r"(?s)```.*?```|`[^`]*`|\*[^*]*\*|_[^_]*_|~[^~]*~|\[([^\]]+)\]\(([^)]+)\)",
    )
    .expect("static regex must compile");

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let entity = caps.get(0).expect("capture 0 always present");
        escape_into(&mut out, &text[last..entity.start()]);

        if let (Some(label), Some(url)) = (caps.get(1), caps.get(2)) {
            out.push('[');
            escape_into(&mut out, label.as_str());
            out.push(']');
            out.push('(');
            escape_into(&mut out, url.as_str());
            out.push(')');
        } else {
            out.push_str(entity.as_str());
        }
        last = entity.end();
    }
    escape_into(&mut out, &text[last..]);

    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::analysis::RiskLevel;
    use crate::models::notification::NotificationLinks;

    fn context(suspicious: bool) -> NotificationContext {
        NotificationContext {
            safe_address: "0x5afe3855358e112b5647b952709e6165e1c1eeee".into(),
            network: "ethereum".into(),
            safe_tx_hash: "0xaaa".into(),
            description: "native transfer of 1 wei".into(),
            nonce: 3,
            status: "executed".into(),
            execution_hash: Some("0xfeed".into()),
            risk_level: if suspicious { RiskLevel::High } else { RiskLevel::Low },
            is_suspicious: suspicious,
            warnings: if suspicious { vec!["gas token attack risk".into()] } else { vec![] },
            links: NotificationLinks {
                safe_app: "https://app.safe.global/transactions/tx?safe=eth:0x5afe".into(),
                safe_monitor: Some("https://safewatch.example.org/tx/0xaaa".into()),
                etherscan: Some("https://etherscan.io/tx/0xfeed".into()),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn generic_webhook_has_the_documented_shape() {
        let payload = generic_webhook(&context(true));
        assert_eq!(payload["event_type"], "safe_transaction");
        assert_eq!(payload["alert_type"], "suspicious_transaction");
        assert_eq!(payload["safe"]["address"], "0x5afe3855358e112b5647b952709e6165e1c1eeee");
        assert_eq!(payload["safe"]["network"], "ethereum");
        assert_eq!(payload["transaction"]["hash"], "0xaaa");
        assert_eq!(payload["transaction"]["nonce"], 3);
        assert_eq!(payload["transaction"]["execution_hash"], "0xfeed");
        assert!(payload["links"]["safe_app"].as_str().is_some());
        assert!(payload["links"]["etherscan"].as_str().is_some());
        assert!(payload["timestamp"].as_str().is_some());

        let normal = generic_webhook(&context(false));
        assert_eq!(normal["alert_type"], "transaction");
    }

    #[test]
    fn discord_color_tracks_suspicion() {
        let suspicious = discord(&context(true));
        assert_eq!(suspicious["embeds"][0]["color"], 15158332);
        let normal = discord(&context(false));
        assert_eq!(normal["embeds"][0]["color"], 3447003);

        let fields = suspicious["embeds"][0]["fields"].as_array().unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
        for expected in ["Network", "Description", "Nonce", "Status", "Hash"] {
            assert!(names.contains(&expected), "missing field {expected}");
        }
    }

    #[test]
    fn slack_payload_carries_action_buttons() {
        let payload = slack(&context(true));
        let blocks = payload["blocks"].as_array().unwrap();
        let actions = blocks.iter().find(|b| b["type"] == "actions").unwrap();
        let buttons = actions["elements"].as_array().unwrap();
        assert_eq!(buttons.len(), 3);
        assert!(buttons.iter().all(|b| b["type"] == "button" && b["url"].as_str().is_some()));
    }

    #[test]
    fn telegram_payload_targets_the_chat_with_markdown_v2() {
        let payload = telegram("42", true, &context(false));
        assert_eq!(payload["chat_id"], "42");
        assert_eq!(payload["parse_mode"], "MarkdownV2");
        assert_eq!(payload["disable_web_page_preview"], true);
        let text = payload["text"].as_str().unwrap();
        assert!(text.contains("*Network:*"));
        assert!(text.contains("`0xaaa`"));
    }

    #[test]
    fn markdown_escaping_preserves_entities() {
        assert_eq!(escape_markdown_v2("Hello *world*!"), "Hello *world*\\!");
        assert_eq!(escape_markdown_v2("`code`"), "`code`");
        assert_eq!(
            escape_markdown_v2("[link](https://example.com/test.html)"),
            "[link](https://example\\.com/test\\.html)"
        );
        assert_eq!(escape_markdown_v2("a.b-c"), "a\\.b\\-c");
        assert_eq!(escape_markdown_v2(""), "");
    }
}

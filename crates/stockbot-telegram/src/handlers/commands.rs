use std::sync::Arc;

use chrono::Local;
use teloxide::prelude::*;
use tracing::{info, warn};

use stockbot_core::domain::ChatId;

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);
    let (cmd, _arg) = parse_command(text);

    match cmd.as_str() {
        "start" => {
            let reply = if msg.chat.is_private() {
                let username = msg.from().and_then(|u| u.username.clone());
                info!(chat_id = chat_id.0, username = ?username, "/start from user");
                state
                    .update_registry(|r| r.add_user(chat_id, username))
                    .await;
                "👋 Welcome to the stock monitor!\n\
I watch the shop inventory and will message you whenever it changes."
            } else {
                let title = msg.chat.title().map(str::to_string);
                info!(chat_id = chat_id.0, title = ?title, "/start in group");
                state
                    .update_registry(|r| r.add_group(chat_id, title))
                    .await;
                "✅ Stock monitor enabled for this chat.\n\
Inventory change notifications will be posted here."
            };
            send_reply(&state, chat_id, reply).await;
        }

        "status" => {
            let registry = state.registry.load();
            let cached = state.snapshot.load().len();
            let body = status_html(
                registry.user_count(),
                registry.group_count(),
                cached,
                &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            );
            send_reply(&state, chat_id, &body).await;
        }

        _ => {}
    }

    Ok(())
}

fn status_html(users: usize, groups: usize, cached_items: usize, now: &str) -> String {
    format!(
        "📊 <b>Bot status</b>\n\n\
👤 <b>Users:</b> {users}\n\
👥 <b>Groups:</b> {groups}\n\
📦 <b>Cached products:</b> {cached_items}\n\
⏰ <b>Updated:</b> {now}"
    )
}

async fn send_reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/Status@stock_bot now"),
            ("status".to_string(), "now".to_string())
        );
        assert_eq!(parse_command("/start"), ("start".to_string(), String::new()));
    }

    #[test]
    fn status_lists_counts() {
        let html = status_html(3, 2, 41, "2026-01-01 00:00:00");
        assert!(html.contains("<b>Users:</b> 3"));
        assert!(html.contains("<b>Groups:</b> 2"));
        assert!(html.contains("<b>Cached products:</b> 41"));
        assert!(html.ends_with("2026-01-01 00:00:00"));
    }
}

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use stockbot_core::domain::ChatId;

use crate::router::AppState;

/// Any plain private message registers its sender.
pub async fn handle_text(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);
    let username = msg.from().and_then(|u| u.username.clone());
    info!(chat_id = chat_id.0, username = ?username, "private message");
    state
        .update_registry(|r| r.add_user(chat_id, username))
        .await;

    Ok(())
}

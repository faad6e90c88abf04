//! Telegram update handlers.
//!
//! These are the only writers of the subscriber registry:
//! - `/start` and plain private messages register the chat
//! - bot membership changes add or forget groups
//! - `/status` reports registry and snapshot sizes

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ChatMemberUpdated, Message},
};

use crate::router::AppState;

mod commands;
mod membership;
mod text;

pub use membership::{classify_membership, MembershipChange, Presence};

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
        return text::handle_text(msg, state).await;
    }

    Ok(())
}

pub async fn handle_my_chat_member(
    upd: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    membership::handle_my_chat_member(upd, state).await
}

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ChatMemberUpdated},
};
use tracing::info;

use stockbot_core::domain::ChatId;

use crate::router::AppState;

/// Whether the bot is in the chat, reduced to what registration cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Present,
    Gone,
    Other,
}

impl From<&ChatMemberKind> for Presence {
    fn from(kind: &ChatMemberKind) -> Self {
        if kind.is_left() || kind.is_banned() {
            Presence::Gone
        } else if kind.is_present() {
            Presence::Present
        } else {
            Presence::Other
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Removed,
    Unchanged,
}

pub fn classify_membership(old: Presence, new: Presence) -> MembershipChange {
    match (old, new) {
        (Presence::Gone, Presence::Present) => MembershipChange::Joined,
        (Presence::Present, Presence::Gone) => MembershipChange::Removed,
        _ => MembershipChange::Unchanged,
    }
}

pub async fn handle_my_chat_member(
    upd: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let chat_id = ChatId(upd.chat.id.0);
    let title = upd.chat.title().map(str::to_string);
    let old = Presence::from(&upd.old_chat_member.kind);
    let new = Presence::from(&upd.new_chat_member.kind);

    match classify_membership(old, new) {
        MembershipChange::Joined => {
            info!(chat_id = chat_id.0, title = ?title, "bot added to chat");
            state
                .update_registry(|r| r.add_group(chat_id, title))
                .await;
        }
        MembershipChange::Removed => {
            info!(chat_id = chat_id.0, title = ?title, "bot removed from chat");
            state.update_registry(|r| r.remove_group(chat_id)).await;
        }
        MembershipChange::Unchanged => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave_transitions() {
        use Presence::*;
        assert_eq!(classify_membership(Gone, Present), MembershipChange::Joined);
        assert_eq!(classify_membership(Present, Gone), MembershipChange::Removed);
    }

    #[test]
    fn promotions_and_restrictions_are_ignored() {
        use Presence::*;
        assert_eq!(classify_membership(Present, Present), MembershipChange::Unchanged);
        assert_eq!(classify_membership(Gone, Gone), MembershipChange::Unchanged);
        assert_eq!(classify_membership(Other, Present), MembershipChange::Unchanged);
        assert_eq!(classify_membership(Present, Other), MembershipChange::Unchanged);
    }
}

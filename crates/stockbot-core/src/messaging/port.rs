use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::LinkKeyboard,
    Result,
};

/// Outbound messaging port.
///
/// Implementations map transport failures to `Error::Transport` so callers can
/// isolate a failing recipient.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_link_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: LinkKeyboard,
    ) -> Result<MessageRef>;
}

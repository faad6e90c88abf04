//! Telegram adapter (teloxide).
//!
//! This crate implements the `stockbot-core` MessagingPort over the Telegram
//! Bot API and runs the inbound update router that maintains the subscriber
//! registry.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

pub use teloxide::Bot;

use stockbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::LinkKeyboard,
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// One URL button per row.
pub fn link_markup(keyboard: LinkKeyboard) -> Result<InlineKeyboardMarkup> {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::with_capacity(keyboard.buttons.len());
    for b in keyboard.buttons {
        let url = reqwest::Url::parse(&b.url)
            .map_err(|e| Error::External(format!("invalid button url {}: {e}", b.url)))?;
        rows.push(vec![InlineKeyboardButton::url(b.label, url)]);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_link_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: LinkKeyboard,
    ) -> Result<MessageRef> {
        let markup = link_markup(keyboard)?;

        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup.clone())
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbot_core::messaging::types::LinkButton;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn markup_has_one_url_button_per_row() {
        let kb = LinkKeyboard::new(vec![
            LinkButton {
                label: "A | ¥1.00 | stock: 1".to_string(),
                url: "https://shop.example/buy/1".to_string(),
            },
            LinkButton {
                label: "B | ¥2.00 | stock: 2".to_string(),
                url: "https://shop.example/buy/2".to_string(),
            },
        ]);
        let markup = link_markup(kb).unwrap();
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert!(markup.inline_keyboard.iter().all(|row| row.len() == 1));
        match &markup.inline_keyboard[1][0].kind {
            InlineKeyboardButtonKind::Url(u) => assert_eq!(u.as_str(), "https://shop.example/buy/2"),
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn invalid_url_is_rejected() {
        let kb = LinkKeyboard::new(vec![LinkButton {
            label: "x".to_string(),
            url: "not a url".to_string(),
        }]);
        assert!(link_markup(kb).is_err());
    }
}

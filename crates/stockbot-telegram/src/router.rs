use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::sync::Mutex;
use tracing::{info, warn};

use stockbot_core::{
    messaging::port::MessagingPort, registry::SubscriberRegistry, snapshot::Snapshot,
    store::Store,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub messenger: Arc<dyn MessagingPort>,
    pub registry: Arc<dyn Store<SubscriberRegistry>>,
    pub snapshot: Arc<dyn Store<Snapshot>>,
    /// Serializes read-modify-write cycles on the registry file.
    pub registry_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        registry: Arc<dyn Store<SubscriberRegistry>>,
        snapshot: Arc<dyn Store<Snapshot>>,
    ) -> Self {
        Self {
            messenger,
            registry,
            snapshot,
            registry_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Apply `change` to the registry and persist it if it reports a modification.
    pub async fn update_registry(&self, change: impl FnOnce(&mut SubscriberRegistry) -> bool) {
        let _guard = self.registry_lock.lock().await;
        let mut registry = self.registry.load();
        if !change(&mut registry) {
            return;
        }
        if let Err(e) = self.registry.save(&registry) {
            warn!(error = %e, "failed to save subscriber registry");
        }
    }
}

/// Run the inbound update loop until Ctrl-C.
pub async fn run_polling(
    bot: Bot,
    registry: Arc<dyn Store<SubscriberRegistry>>,
    snapshot: Arc<dyn Store<Snapshot>>,
) -> anyhow::Result<()> {
    if let Ok(me) = bot.get_me().await {
        info!(username = %me.username(), "telegram bot started");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(messenger, registry, snapshot));

    let handler = dptree::entry()
        .branch(Update::filter_my_chat_member().endpoint(handlers::handle_my_chat_member))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbot_core::{
        domain::{ChatId, MessageId, MessageRef},
        messaging::types::LinkKeyboard,
        store::MemoryStore,
        Result,
    };

    struct NullMessenger;

    #[async_trait::async_trait]
    impl MessagingPort for NullMessenger {
        async fn send_html(&self, chat_id: ChatId, _html: &str) -> Result<MessageRef> {
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn send_link_keyboard(
            &self,
            chat_id: ChatId,
            html: &str,
            _keyboard: LinkKeyboard,
        ) -> Result<MessageRef> {
            self.send_html(chat_id, html).await
        }
    }

    #[tokio::test]
    async fn update_registry_persists_only_real_changes() {
        let registry = Arc::new(MemoryStore::<SubscriberRegistry>::default());
        registry.set_fail_saves(true);
        let state = AppState::new(
            Arc::new(NullMessenger),
            registry.clone(),
            Arc::new(MemoryStore::<Snapshot>::default()),
        );

        // A failed write is logged and leaves the stored registry as it was.
        state
            .update_registry(|r| r.add_user(ChatId(7), Some("amy".to_string())))
            .await;
        assert!(registry.get().unwrap().recipients().is_empty());

        state.update_registry(|_| false).await;

        registry.set_fail_saves(false);
        state
            .update_registry(|r| r.add_user(ChatId(7), Some("amy".to_string())))
            .await;
        assert_eq!(registry.get().unwrap().recipients(), vec![ChatId(7)]);
    }
}

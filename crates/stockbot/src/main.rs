use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use stockbot_core::{
    config::Config,
    dispatch::NotificationDispatcher,
    messaging::port::MessagingPort,
    poll::PollLoop,
    registry::SubscriberRegistry,
    snapshot::Snapshot,
    source::SourceConnector,
    store::{JsonFileStore, Store},
};
use stockbot_mysql::MySqlInventorySource;
use stockbot_telegram::{router, Bot, TelegramMessenger};

#[tokio::main]
async fn main() -> Result<(), stockbot_core::Error> {
    stockbot_core::logging::init("stockbot");

    let cfg = Config::load()?;
    info!(
        subscribers = %cfg.subscribers_file.display(),
        snapshot = %cfg.snapshot_file.display(),
        interval_secs = cfg.poll_interval.as_secs(),
        "stock monitor starting"
    );

    let registry: Arc<dyn Store<SubscriberRegistry>> =
        Arc::new(JsonFileStore::new(cfg.subscribers_file.clone()));
    let snapshot: Arc<dyn Store<Snapshot>> =
        Arc::new(JsonFileStore::new(cfg.snapshot_file.clone()));

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let source = MySqlInventorySource::new(&cfg.database_url, cfg.db_connect_timeout)?;
    let poll = PollLoop::new(
        SourceConnector::new(source, cfg.retry_policy()),
        snapshot.clone(),
        NotificationDispatcher::new(messenger, registry.clone(), cfg.dispatch_settings()),
        cfg.poll_interval,
    );

    let cancel = CancellationToken::new();
    let poll_task = tokio::spawn(poll.run(cancel.clone()));

    let result = router::run_polling(bot, registry, snapshot).await;

    info!("shutting down, waiting for the current poll cycle");
    cancel.cancel();
    if let Err(e) = poll_task.await {
        error!(error = %e, "poll loop task ended abnormally");
    }

    result.map_err(|e| stockbot_core::Error::External(format!("telegram bot failed: {e}")))?;
    info!("stock monitor stopped");
    Ok(())
}

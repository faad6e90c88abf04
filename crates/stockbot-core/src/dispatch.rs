//! Paginated fan-out of the current inventory to every subscriber.
//!
//! Each send is independent: a failure for one recipient is logged and skipped,
//! and the remaining recipients and pages are still delivered. Pacing between
//! sends is a fixed delay, not adaptive.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::Local;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    detect::Classification,
    domain::{ChatId, InventoryItem},
    formatting::{page_payload_len, render_keyboard, render_page_text, PageInfo},
    messaging::port::MessagingPort,
    registry::SubscriberRegistry,
    store::Store,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone, Debug)]
pub struct DispatchSettings {
    /// Maximum purchase buttons per message.
    pub page_size: usize,
    /// Pause between consecutive sends within a page.
    pub send_delay: Duration,
    /// Pause between pages.
    pub page_delay: Duration,
    /// Page size (text plus button labels, in UTF-16 units) above which a
    /// warning is logged. Nothing is truncated.
    pub safe_text_limit: usize,
    pub buy_url_template: String,
    pub channel_tag: Option<String>,
    pub currency_symbol: String,
}

impl DispatchSettings {
    pub fn new(buy_url_template: impl Into<String>) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            send_delay: Duration::from_millis(50),
            page_delay: Duration::from_millis(100),
            safe_text_limit: 4000,
            buy_url_template: buy_url_template.into(),
            channel_tag: None,
            currency_symbol: "¥".to_string(),
        }
    }
}

/// Outcome of one dispatch, for logging and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub pages: usize,
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
    pub failed_recipients: BTreeSet<ChatId>,
}

/// Split `items` into consecutive chunks of at most `page_size`, keeping order.
pub fn paginate(items: &[InventoryItem], page_size: usize) -> Vec<&[InventoryItem]> {
    items.chunks(page_size.max(1)).collect()
}

pub struct NotificationDispatcher {
    messenger: Arc<dyn MessagingPort>,
    registry: Arc<dyn Store<SubscriberRegistry>>,
    settings: DispatchSettings,
}

impl NotificationDispatcher {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        registry: Arc<dyn Store<SubscriberRegistry>>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            messenger,
            registry,
            settings,
        }
    }

    pub async fn dispatch(
        &self,
        items: &[InventoryItem],
        classification: Classification,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        if items.is_empty() {
            info!("no items to notify about");
            return report;
        }

        // Reloaded on every dispatch so registrations made since the last cycle count.
        let recipients = self.registry.load().recipients();
        if recipients.is_empty() {
            info!("no subscribers registered, skipping notification");
            return report;
        }

        let pages = paginate(items, self.settings.page_size);
        report.pages = pages.len();
        report.recipients = recipients.len();
        info!(
            recipients = recipients.len(),
            pages = pages.len(),
            classification = classification.as_str(),
            "sending notifications"
        );

        for (idx, page) in pages.iter().enumerate() {
            if idx > 0 {
                sleep(self.settings.page_delay).await;
            }

            let page_info = PageInfo {
                number: idx + 1,
                total: pages.len(),
                items_on_page: page.len(),
            };
            let text = render_page_text(
                classification,
                items.len(),
                page_info,
                self.settings.channel_tag.as_deref(),
                Local::now(),
            );
            let keyboard = render_keyboard(
                page,
                &self.settings.buy_url_template,
                &self.settings.currency_symbol,
            );
            let payload_len = page_payload_len(&text, &keyboard);
            if payload_len > self.settings.safe_text_limit {
                warn!(
                    page = page_info.number,
                    len = payload_len,
                    limit = self.settings.safe_text_limit,
                    "notification page exceeds safe limit"
                );
            }

            for (n, chat_id) in recipients.iter().enumerate() {
                if n > 0 {
                    sleep(self.settings.send_delay).await;
                }
                match self
                    .messenger
                    .send_link_keyboard(*chat_id, &text, keyboard.clone())
                    .await
                {
                    Ok(_) => {
                        report.delivered += 1;
                        debug!(chat_id = chat_id.0, page = page_info.number, "notification sent");
                    }
                    Err(e) => {
                        report.failed += 1;
                        report.failed_recipients.insert(*chat_id);
                        warn!(chat_id = chat_id.0, page = page_info.number, error = %e, "notification failed");
                    }
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            "notification round finished"
        );
        report
    }
}

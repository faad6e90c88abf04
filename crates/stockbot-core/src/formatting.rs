//! Telegram HTML rendering for inventory notifications.

use chrono::{DateTime, Local};

use crate::{
    detect::Classification,
    domain::InventoryItem,
    messaging::types::{LinkButton, LinkKeyboard},
};

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn classification_title(classification: Classification) -> &'static str {
    match classification {
        Classification::New => "🆕 <b>New products available</b>",
        Classification::Delete => "❌ <b>Products removed</b>",
        Classification::Update => "📦 <b>Stock update</b>",
    }
}

/// Position of a page within one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    /// 1-based page number.
    pub number: usize,
    pub total: usize,
    pub items_on_page: usize,
}

/// Message text for one page: header, totals, page marker, call to action.
pub fn render_page_text(
    classification: Classification,
    total_items: usize,
    page: PageInfo,
    channel_tag: Option<&str>,
    now: DateTime<Local>,
) -> String {
    let mut out = String::new();
    out.push_str(classification_title(classification));
    out.push('\n');
    if let Some(tag) = channel_tag {
        out.push_str(&format!("Notification channel {}\n", escape_html(tag)));
    }
    out.push_str(&format!("Time: {}\n\n", now.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Products in stock: <b>{total_items}</b>\n"));
    out.push_str(&format!(
        "<b>Page {}/{} ({} products)</b>\n",
        page.number, page.total, page.items_on_page
    ));
    out.push_str("\n<b>Tap a button below to buy:</b>\n");
    out
}

/// Button label: `<name> | <currency><price> | stock: <n>`.
pub fn button_label(item: &InventoryItem, currency_symbol: &str) -> String {
    format!(
        "{} | {}{:.2} | stock: {}",
        item.name, currency_symbol, item.price, item.stock
    )
}

pub fn purchase_url(template: &str, item_id: i64) -> String {
    template.replace("{id}", &item_id.to_string())
}

/// Length as Telegram counts it: UTF-16 code units.
pub fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Rendered size of a page: message text plus every button label.
///
/// Labels carry the item names, so this is the part of a page that grows
/// when names get long; pagination only bounds the button count.
pub fn page_payload_len(text: &str, keyboard: &LinkKeyboard) -> usize {
    telegram_len(text)
        + keyboard
            .buttons
            .iter()
            .map(|b| telegram_len(&b.label))
            .sum::<usize>()
}

/// One purchase button per item, in item order.
pub fn render_keyboard(
    items: &[InventoryItem],
    url_template: &str,
    currency_symbol: &str,
) -> LinkKeyboard {
    LinkKeyboard::new(
        items
            .iter()
            .map(|item| LinkButton {
                label: button_label(item, currency_symbol),
                url: purchase_url(url_template, item.id),
            })
            .collect(),
    )
}

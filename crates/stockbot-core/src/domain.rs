/// Telegram chat id (numeric). Users and groups share this namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One catalog item that currently has sellable stock.
///
/// Produced fresh on every poll and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

impl InventoryItem {
    /// Id in the string form used as the snapshot key.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberKind {
    User,
    Group,
}

/// A registered notification recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscriber {
    pub chat_id: ChatId,
    pub kind: SubscriberKind,
    pub display_name: String,
    pub added_at: String,
}

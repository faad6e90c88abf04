//! Diff the freshly fetched inventory against the snapshot baseline.

use std::collections::BTreeSet;

use tracing::info;

use crate::{domain::InventoryItem, snapshot::Snapshot};

/// Dominant kind of change in a poll cycle. Only drives message framing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Classification {
    New,
    Delete,
    #[default]
    Update,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::New => "new",
            Classification::Delete => "delete",
            Classification::Update => "update",
        }
    }
}

/// Attribute-level difference for an item present in both sets.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldChange {
    Name { id: String, old: String, new: String },
    Price { id: String, old: f64, new: f64 },
    Stock { id: String, old: u32, new: u32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeResult {
    pub detected: bool,
    pub classification: Classification,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub field_changes: Vec<FieldChange>,
}

/// Classify the change between `previous` and `current`.
///
/// Additions are checked first, then removals: a cycle with both is classified
/// as `Delete`. Field changes mark the cycle as changed but never alter the
/// classification, which stays at its `Update` default when no id was added
/// or removed.
pub fn detect(current: &[InventoryItem], previous: &Snapshot) -> ChangeResult {
    let previous_ids = previous.ids();
    let current_ids: BTreeSet<String> = current.iter().map(InventoryItem::key).collect();

    let mut result = ChangeResult::default();

    let added: Vec<String> = current_ids
        .iter()
        .filter(|id| !previous_ids.contains(id.as_str()))
        .cloned()
        .collect();
    if !added.is_empty() {
        info!(ids = ?added, "new items detected");
        result.detected = true;
        result.classification = Classification::New;
    }

    let removed: Vec<String> = previous_ids
        .iter()
        .filter(|id| !current_ids.contains(**id))
        .map(|id| id.to_string())
        .collect();
    if !removed.is_empty() {
        info!(ids = ?removed, "removed items detected");
        result.detected = true;
        result.classification = Classification::Delete;
    }

    for item in current {
        let id = item.key();
        let Some(old) = previous.get(&id) else {
            continue;
        };

        if old.name != item.name {
            info!(id = %id, old = %old.name, new = %item.name, "name changed");
            result.field_changes.push(FieldChange::Name {
                id: id.clone(),
                old: old.name.clone(),
                new: item.name.clone(),
            });
        }
        if old.price != item.price {
            info!(id = %id, old = old.price, new = item.price, "price changed");
            result.field_changes.push(FieldChange::Price {
                id: id.clone(),
                old: old.price,
                new: item.price,
            });
        }
        if old.stock != item.stock {
            info!(id = %id, old = old.stock, new = item.stock, "stock changed");
            result.field_changes.push(FieldChange::Stock {
                id,
                old: old.stock,
                new: item.stock,
            });
        }
    }
    if !result.field_changes.is_empty() {
        result.detected = true;
    }

    result.added = added;
    result.removed = removed;
    result
}

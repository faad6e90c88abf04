use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::InventoryItem;

/// Last fetched view of an item, as persisted in the snapshot file.
///
/// Field names match the cache files written by earlier releases.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "gd_name", default)]
    pub name: String,
    #[serde(rename = "actual_price", default)]
    pub price: f64,
    #[serde(rename = "in_stock", default)]
    pub stock: u32,
}

/// Change-detection baseline: string item id -> last fetched attributes.
///
/// Always reflects the most recent fetched state, not the last notified one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn from_items(items: &[InventoryItem]) -> Self {
        let entries = items
            .iter()
            .map(|item| {
                (
                    item.key(),
                    SnapshotEntry {
                        name: item.name.clone(),
                        price: item.price,
                        stock: item.stock,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&SnapshotEntry> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> BTreeSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_legacy_cache_format() {
        let raw = r#"{
  "3": { "gd_name": "Netflix 月卡", "actual_price": 12.5, "in_stock": 4 },
  "7": { "gd_name": "Spotify", "actual_price": 9.0 }
}"#;
        let snap: Snapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get("3").unwrap().name, "Netflix 月卡");
        assert_eq!(snap.get("7").unwrap().stock, 0);
        assert_eq!(snap.ids().into_iter().collect::<Vec<_>>(), vec!["3", "7"]);
    }

    #[test]
    fn from_items_keys_by_stringified_id() {
        let items = vec![InventoryItem {
            id: 42,
            name: "VPN".to_string(),
            price: 3.0,
            stock: 1,
        }];
        let snap = Snapshot::from_items(&items);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["42"]["gd_name"], "VPN");
        assert_eq!(json["42"]["actual_price"], 3.0);
        assert_eq!(json["42"]["in_stock"], 1);
    }
}

//! Subscriber registry: users and groups eligible for notifications.
//!
//! The inbound update handlers are the only writers; the dispatcher reloads the
//! whole registry on every dispatch so changes are picked up without locking.

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, Subscriber, SubscriberKind};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub added_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub added_at: String,
}

/// Persisted form: `{users: {<id>: {...}}, groups: {<id>: {...}}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberRegistry {
    #[serde(default)]
    pub users: BTreeMap<String, UserEntry>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupEntry>,
}

impl SubscriberRegistry {
    /// Register a private-chat user. Returns `false` if already present.
    pub fn add_user(&mut self, chat_id: ChatId, username: Option<String>) -> bool {
        let key = chat_id.0.to_string();
        if self.users.contains_key(&key) {
            return false;
        }
        self.users.insert(
            key,
            UserEntry {
                username,
                added_at: now_iso(),
            },
        );
        true
    }

    /// Register a group or channel. Returns `false` if already present.
    pub fn add_group(&mut self, chat_id: ChatId, group_name: Option<String>) -> bool {
        let key = chat_id.0.to_string();
        if self.groups.contains_key(&key) {
            return false;
        }
        self.groups.insert(
            key,
            GroupEntry {
                group_name,
                added_at: now_iso(),
            },
        );
        true
    }

    /// Forget a group after the bot was removed from it.
    pub fn remove_group(&mut self, chat_id: ChatId) -> bool {
        self.groups.remove(&chat_id.0.to_string()).is_some()
    }

    /// All recipient chat ids, users first. Keys that are not integers are skipped.
    pub fn recipients(&self) -> Vec<ChatId> {
        self.users
            .keys()
            .chain(self.groups.keys())
            .filter_map(|k| k.trim().parse::<i64>().ok())
            .map(ChatId)
            .collect()
    }

    pub fn subscribers(&self) -> Vec<Subscriber> {
        let users = self.users.iter().filter_map(|(k, u)| {
            let id = k.trim().parse::<i64>().ok()?;
            Some(Subscriber {
                chat_id: ChatId(id),
                kind: SubscriberKind::User,
                display_name: u.username.clone().unwrap_or_default(),
                added_at: u.added_at.clone(),
            })
        });
        let groups = self.groups.iter().filter_map(|(k, g)| {
            let id = k.trim().parse::<i64>().ok()?;
            Some(Subscriber {
                chat_id: ChatId(id),
                kind: SubscriberKind::Group,
                display_name: g.group_name.clone().unwrap_or_default(),
                added_at: g.added_at.clone(),
            })
        });
        users.chain(groups).collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_and_keeps_first_timestamp() {
        let mut reg = SubscriberRegistry::default();
        assert!(reg.add_user(ChatId(10), Some("alice".to_string())));
        let first = reg.users["10"].added_at.clone();
        assert!(!reg.add_user(ChatId(10), Some("renamed".to_string())));
        assert_eq!(reg.users["10"].added_at, first);
        assert_eq!(reg.users["10"].username.as_deref(), Some("alice"));
    }

    #[test]
    fn recipients_list_users_then_groups_and_skip_bad_keys() {
        let mut reg = SubscriberRegistry::default();
        reg.add_user(ChatId(5), None);
        reg.add_group(ChatId(-100123), Some("Deals".to_string()));
        reg.users.insert("not-a-number".to_string(), UserEntry::default());

        assert_eq!(reg.recipients(), vec![ChatId(5), ChatId(-100123)]);
        let subs = reg.subscribers();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].kind, SubscriberKind::Group);
        assert_eq!(subs[1].display_name, "Deals");
    }

    #[test]
    fn remove_group_only_touches_groups() {
        let mut reg = SubscriberRegistry::default();
        reg.add_user(ChatId(-1), None);
        reg.add_group(ChatId(-1), None);
        assert!(reg.remove_group(ChatId(-1)));
        assert!(!reg.remove_group(ChatId(-1)));
        assert_eq!(reg.user_count(), 1);
        assert_eq!(reg.group_count(), 0);
    }

    #[test]
    fn persisted_shape_matches_registry_file() {
        let raw = r#"{
  "users": { "123": { "username": "bob", "added_at": "2025-01-02T03:04:05.000000" } },
  "groups": { "-1001": { "group_name": null, "added_at": "2025-01-02T03:04:05.000000" } }
}"#;
        let reg: SubscriberRegistry = serde_json::from_str(raw).unwrap();
        assert_eq!(reg.recipients(), vec![ChatId(123), ChatId(-1001)]);

        let back = serde_json::to_value(&reg).unwrap();
        assert_eq!(back["users"]["123"]["username"], "bob");
        assert!(back["groups"]["-1001"]["group_name"].is_null());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let reg: SubscriberRegistry = serde_json::from_str("{}").unwrap();
        assert!(reg.recipients().is_empty());
    }
}

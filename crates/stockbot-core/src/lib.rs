//! Core of the inventory stock notifier.
//!
//! Polls an inventory source, diffs it against the last snapshot, and fans out
//! paginated purchase-link messages to every registered subscriber. This crate
//! is framework-agnostic: the database and Telegram live behind ports (traits)
//! implemented in adapter crates.

pub mod config;
pub mod detect;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod poll;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod store;

pub use errors::{Error, Result};

//! Inventory source connector.
//!
//! Wraps an [`InventorySource`] port with bounded connection retries. Failures
//! never escape [`SourceConnector::fetch`]: an unreachable or failing source
//! yields an empty item list and the poll loop retries on its next interval.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{domain::InventoryItem, errors::Error, Result};

const PREVIEW_ITEMS: usize = 10;

/// Port for the relational data source.
///
/// A `Connection` is released when dropped, so every path out of a fetch
/// (success, query error, cancellation) gives it back.
#[async_trait]
pub trait InventorySource: Send + Sync {
    type Connection: Send;

    async fn connect(&self) -> Result<Self::Connection>;

    /// Items with in-stock count > 0, ordered ascending by id.
    async fn query_in_stock(&self, conn: &mut Self::Connection) -> Result<Vec<InventoryItem>>;
}

/// Fixed-delay retry budget for connection acquisition.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

pub struct SourceConnector<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: InventorySource> SourceConnector<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch the current in-stock inventory, or an empty list on any failure.
    pub async fn fetch(&self) -> Vec<InventoryItem> {
        match self.try_fetch().await {
            Ok(items) => {
                log_preview(&items);
                items
            }
            Err(e @ Error::SourceUnavailable { .. }) => {
                warn!(error = %e, "inventory source unavailable, skipping this poll");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "inventory query failed, skipping this poll");
                Vec::new()
            }
        }
    }

    /// Fetch with typed errors (`SourceUnavailable` or `Query`).
    pub async fn try_fetch(&self) -> Result<Vec<InventoryItem>> {
        let mut conn = self.acquire().await?;
        let mut items = self
            .source
            .query_in_stock(&mut conn)
            .await
            .map_err(|e| match e {
                Error::Query(_) => e,
                other => Error::Query(other.to_string()),
            })?;
        drop(conn);

        items.retain(|item| item.stock > 0);
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn acquire(&self) -> Result<S::Connection> {
        let attempts = self.policy.attempts.max(1);
        let mut last_err = String::new();

        for attempt in 1..=attempts {
            match self.source.connect().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "inventory source connection failed");
                    last_err = e.to_string();
                    if attempt < attempts {
                        sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(Error::SourceUnavailable {
            attempts,
            reason: last_err,
        })
    }
}

fn log_preview(items: &[InventoryItem]) {
    info!(count = items.len(), "fetched in-stock items");
    for item in items.iter().take(PREVIEW_ITEMS) {
        info!(
            id = item.id,
            name = %item.name,
            price = item.price,
            stock = item.stock,
            "  item"
        );
    }
    if items.len() > PREVIEW_ITEMS {
        info!("  ... and {} more", items.len() - PREVIEW_ITEMS);
    }
}

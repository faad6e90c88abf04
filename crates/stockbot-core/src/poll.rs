//! The polling core: fetch -> detect -> (notify) -> persist, then sleep.
//!
//! The loop owns the snapshot (it is the only writer) and the `first_run`
//! flag. A failing or panicking cycle is logged and treated as a no-op; the loop only ends
//! when its cancellation token fires, which is checked at the top of each
//! iteration, after the fetch, and during the inter-cycle sleep. A dispatch
//! that has started always runs to completion.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    detect::{detect, Classification},
    dispatch::{DispatchReport, NotificationDispatcher},
    snapshot::Snapshot,
    source::{InventorySource, SourceConnector},
    store::Store,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was fetched; snapshot and `first_run` are left untouched.
    Empty,
    /// Stop was requested after the fetch; nothing was sent or persisted.
    Cancelled,
    Unchanged,
    Notified {
        classification: Classification,
        report: DispatchReport,
    },
}

pub struct PollLoop<S> {
    connector: SourceConnector<S>,
    snapshot: Arc<dyn Store<Snapshot>>,
    dispatcher: NotificationDispatcher,
    interval: Duration,
    first_run: bool,
}

impl<S: InventorySource> PollLoop<S> {
    pub fn new(
        connector: SourceConnector<S>,
        snapshot: Arc<dyn Store<Snapshot>>,
        dispatcher: NotificationDispatcher,
        interval: Duration,
    ) -> Self {
        Self {
            connector,
            snapshot,
            dispatcher,
            interval,
            first_run: true,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "inventory poll loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match AssertUnwindSafe(self.run_cycle(&cancel)).catch_unwind().await {
                Ok(Ok(outcome)) => debug!(?outcome, "poll cycle finished"),
                Ok(Err(e)) => error!(error = %e, "poll cycle failed"),
                Err(panic) => error!(panic = %panic_message(&*panic), "poll cycle panicked"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("inventory poll loop stopped");
    }

    /// One dispatch cycle.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        let items = self.connector.fetch().await;
        if items.is_empty() {
            warn!("no inventory data fetched");
            return Ok(CycleOutcome::Empty);
        }
        if cancel.is_cancelled() {
            return Ok(CycleOutcome::Cancelled);
        }

        let previous = self.snapshot.load();
        let change = detect(&items, &previous);

        let outcome = if self.first_run {
            info!("first run, sending the full catalog to all subscribers");
            self.first_run = false;
            let report = self.dispatcher.dispatch(&items, Classification::Update).await;
            CycleOutcome::Notified {
                classification: Classification::Update,
                report,
            }
        } else if change.detected {
            info!(
                classification = change.classification.as_str(),
                "inventory changed, notifying"
            );
            let report = self
                .dispatcher
                .dispatch(&items, change.classification)
                .await;
            CycleOutcome::Notified {
                classification: change.classification,
                report,
            }
        } else {
            CycleOutcome::Unchanged
        };

        // Persist on every non-empty fetch so attribute drift is tracked.
        self.snapshot.save(&Snapshot::from_items(&items))?;
        Ok(outcome)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Background balance polling.
//!
//! Re-reads the authoritative points balance and the wallet's native balance
//! on a fixed interval. Polls race freely with actions; whichever read lands
//! last wins.
//!
//! Stopping clears future polls only. A read already in flight is left to
//! finish and its result is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::controller::ReconciliationController;

pub struct BalancePoller {
    observing: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl BalancePoller {
    /// Start polling on the current tokio runtime. The first poll fires
    /// immediately.
    pub fn spawn(controller: ReconciliationController, interval: Duration) -> Self {
        let observing = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&observing);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !flag.load(Ordering::Acquire) {
                    break;
                }
                poll_once(&controller, &flag).await;
            }
            debug!("balance poller stopped");
        });
        Self {
            observing,
            handle: Some(handle),
        }
    }

    /// Stop scheduling polls.
    pub fn stop(&self) {
        self.observing.store(false, Ordering::Release);
    }

    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::Acquire)
    }

    /// Stop and wait for the polling task to wind down.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "balance poller task ended abnormally");
            }
        }
    }
}

impl Drop for BalancePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One poll. Results are applied only while still observing.
pub async fn poll_once(controller: &ReconciliationController, observing: &AtomicBool) {
    match controller.fetch_balance().await {
        Ok(Some(points)) if observing.load(Ordering::Acquire) => {
            controller.apply_balance(points);
            debug!(points, "polled balance");
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "balance poll failed"),
    }

    match controller.fetch_native_balance().await {
        Ok(Some(lamports)) if observing.load(Ordering::Acquire) => {
            controller.apply_native_balance(lamports);
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "native balance poll failed"),
    }
}

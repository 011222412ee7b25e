//! Broadcast-based shutdown signal.
//!
//! # Responsibilities
//! - Fan a single trigger out to every waiting task
//! - Expose a synchronous flag so tasks that start after the trigger
//!   still observe it

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// One-shot, many-listener shutdown signal. Triggering is idempotent.
pub struct Shutdown {
    notify: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            triggered: AtomicBool::new(false),
        }
    }

    /// A receiver that resolves once shutdown is triggered.
    ///
    /// Subscribe before checking `is_triggered` to avoid missing a trigger
    /// that lands in between.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown triggered");
            // Fails only when no receiver exists, which is fine.
            let _ = self.notify.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

//! Process-wide exclusive access to the browser.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Serialises scraping across concurrent runs.
///
/// Cloning shares the same gate. Only one permit exists, it is held for the
/// duration of a single scrape operation.
#[derive(Clone)]
pub struct BrowserGate {
    permits: Arc<Semaphore>,
}

impl Default for BrowserGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait for exclusive use of the browser.
    ///
    /// Returns `None` only if the gate has been closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }

    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

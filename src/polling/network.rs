/*!
 * Shared network-availability flag.
 */

use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Online/offline signal shared by the HTTP client and retry loops.
///
/// Starts online. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    online: Arc<AtomicBool>,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkMonitor {
    pub fn new() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn mark_online(&self) {
        if !self.online.swap(true, Ordering::SeqCst) {
            info!("Network connection restored");
        }
    }

    pub fn mark_offline(&self) {
        if self.online.swap(false, Ordering::SeqCst) {
            warn!("Network connection lost");
        }
    }
}

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ShipyardDb;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProfile {
    pub logical_cores: usize,
    pub worker_threads: usize,
    pub strict_durability: bool, // true = fsync per write, false = OS buffer (faster)
}

impl SystemProfile {
    pub fn detect() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::for_cores(cores)
    }

    pub fn for_cores(cores: usize) -> Self {
        // Single core: fsync stalls would starve the only worker.
        if cores <= 1 {
            warn!(cores, "CPU constraint detected, disabling fsync per write");

            Self {
                logical_cores: cores,
                worker_threads: 2, // 1 Compute + 1 I/O
                strict_durability: false,
            }
        } else {
            Self {
                logical_cores: cores,
                worker_threads: cores,
                strict_durability: true,
            }
        }
    }
}

/// Starts the background compaction thread. `every` of zero disables it.
pub fn start_compaction_thread(db: Arc<ShipyardDb>, every: Duration) -> Option<thread::JoinHandle<()>> {
    if every.is_zero() {
        info!("Background compaction disabled");
        return None;
    }

    let handle = thread::spawn(move || {
        info!(interval_secs = every.as_secs(), "Background compaction thread started");
        loop {
            thread::sleep(every);

            if let Err(e) = db.compact() {
                error!(error = %e, "Compaction failed");
            }
        }
    });
    Some(handle)
}

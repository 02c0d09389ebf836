//! Deferred teardown of replaced generations.
//!
//! Dropping a large generation (hundreds of thousands of nodes and
//! records) is expensive, so the old triple is handed to a background
//! thread and the builder returns to idle without blocking on teardown.
//! At most one retirement runs at a time: a rebuild that publishes while
//! the previous retirement is still running waits for it before starting
//! its own (not before its own build).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::generation::Generation;

/// Hands replaced generations to a background teardown thread.
#[derive(Default)]
pub struct RetirementQueue {
    handle: Mutex<Option<JoinHandle<()>>>,
    retiring: Arc<AtomicBool>,
}

impl RetirementQueue {
    /// Create an idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a retirement task is currently running.
    pub fn is_retiring(&self) -> bool {
        self.retiring.load(Ordering::Acquire)
    }

    /// Retire `generation` on a background thread.
    ///
    /// Waits for the previous retirement to finish first, keeping at most
    /// one teardown in flight. Readers still holding the generation keep
    /// it alive; the actual teardown happens when the last reference
    /// drops, which is this thread in the common case.
    pub fn retire(&self, generation: Arc<Generation>) {
        let mut handle = self.handle.lock();
        if let Some(previous) = handle.take() {
            if previous.join().is_err() {
                warn!("previous retirement thread panicked");
            }
        }

        let retiring = Arc::clone(&self.retiring);
        retiring.store(true, Ordering::Release);
        let spawned = std::thread::Builder::new()
            .name("modlayer-retire".to_string())
            .spawn(move || {
                let files = generation.files().count();
                drop(generation);
                debug!(files, "generation retired");
                retiring.store(false, Ordering::Release);
            });

        match spawned {
            Ok(join) => *handle = Some(join),
            Err(e) => {
                // Tear down inline rather than leak the generation.
                warn!(error = %e, "failed to spawn retirement thread, dropping inline");
                self.retiring.store(false, Ordering::Release);
            }
        }
    }

    /// Block until any in-flight retirement completes.
    pub fn wait_idle(&self) {
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("retirement thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for RetirementQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetirementQueue")
            .field("retiring", &self.is_retiring())
            .finish()
    }
}

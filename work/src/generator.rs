//! Proof-of-work generation (multi-threaded CPU).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::{Difficulty, WorkError};
use lattice_types::Root;

/// Batch size per thread before checking the stop flags.
const BATCH_SIZE: u64 = 4096;

/// Searches for work values that clear a threshold, using all CPU cores.
#[derive(Clone, Debug, Default)]
pub struct WorkGenerator {
    cancelled: Arc<AtomicBool>,
}

impl WorkGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort every running and future `generate` call.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Find a work value whose difficulty for `root` is at least `threshold`.
    ///
    /// Splits the nonce space across rayon's threads; the first thread to
    /// succeed signals the others to stop.
    pub fn generate(
        &self,
        difficulty: &dyn Difficulty,
        root: &Root,
        threshold: u64,
    ) -> Result<u64, WorkError> {
        if threshold == 0 {
            return Ok(0);
        }

        let found = AtomicU64::new(u64::MAX);
        let done = AtomicBool::new(false);
        let num_threads = rayon::current_num_threads().max(1);

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let stride = num_threads as u64;
            let mut nonce = thread_id as u64;
            loop {
                if done.load(Ordering::Relaxed) || self.cancelled.load(Ordering::Relaxed) {
                    return;
                }
                for _ in 0..BATCH_SIZE {
                    if difficulty.get_difficulty(root, nonce) >= threshold {
                        found.store(nonce, Ordering::Relaxed);
                        done.store(true, Ordering::Relaxed);
                        return;
                    }
                    nonce = nonce.wrapping_add(stride);
                }
            }
        });

        if done.load(Ordering::Relaxed) {
            Ok(found.load(Ordering::Relaxed))
        } else {
            Err(WorkError::Cancelled)
        }
    }
}

//! Active-model hand-off
//!
//! The single point where the loader path and the real-time path meet.
//! The audio thread reads one pointer per block and never blocks,
//! allocates, or takes a lock; the loader swaps that pointer and then
//! waits — bounded-interval polling, never a lock shared with audio — for
//! the audio thread to vacate the superseded instance before freeing it.

use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::time::Duration;

use super::network::DynamicModel;

/// How long the loader sleeps between in-use polls
const RECLAIM_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Shared slot holding the currently active model
///
/// Publication may come from any control thread: `publish` hands each
/// superseded pointer to exactly one writer through the atomic swap, so
/// concurrent publishes stay sound. The real-time side is single-reader
/// by claim: `process_active` takes `in_use` for the duration of the
/// call, and a second concurrent caller backs off as a no-op instead of
/// aliasing the model. Publication happens only after full construction
/// and priming, so the reader can never observe a partially built model.
///
/// All atomics use `SeqCst`: the reader claims `in_use` *before* loading
/// the handle, and the writer checks `in_use` *after* swapping it, so the
/// total order guarantees the writer cannot miss a reader that picked up
/// the old instance.
#[derive(Debug)]
pub struct ModelSlot {
    active: AtomicPtr<DynamicModel>,
    in_use: AtomicBool,
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSlot {
    pub fn new() -> Self {
        Self {
            active: AtomicPtr::new(std::ptr::null_mut()),
            in_use: AtomicBool::new(false),
        }
    }

    /// Whether a model is currently published
    pub fn has_active(&self) -> bool {
        !self.active.load(Ordering::SeqCst).is_null()
    }

    /// Real-time side: run the active model over the block, if any
    ///
    /// Claims the slot for the duration of the call; if another thread is
    /// already inside, the block is left dry rather than raced. The claim
    /// is also the synchronization point the loader polls before
    /// reclaiming a superseded model.
    pub fn process_active(&self, buffer: &mut [f32]) {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return;
        }

        let ptr = self.active.load(Ordering::SeqCst);
        if !ptr.is_null() {
            // SAFETY: the claim above is exclusive, the loader never
            // dereferences a pointer after publishing it, and reclamation
            // waits for the claim to clear. No other &mut can exist.
            let model = unsafe { &mut *ptr };
            model.apply(buffer);
        }

        self.in_use.store(false, Ordering::SeqCst);
    }

    /// Reset the active model's recurrent state to its zero baseline
    ///
    /// Called on activation, under the same claim discipline as
    /// [`process_active`](Self::process_active).
    pub fn reset_active(&self) {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return;
        }

        let ptr = self.active.load(Ordering::SeqCst);
        if !ptr.is_null() {
            // SAFETY: see process_active.
            let model = unsafe { &mut *ptr };
            model.reset();
        }

        self.in_use.store(false, Ordering::SeqCst);
    }

    /// Loader side: publish a fully constructed model as active
    ///
    /// The superseded instance stays valid until the audio thread reports
    /// it is not mid-block, then is freed here — the audio thread never
    /// waits, the loader eats the worst-case few-millisecond delay.
    pub(crate) fn publish(&self, model: Box<DynamicModel>) {
        let old = self.active.swap(Box::into_raw(model), Ordering::SeqCst);
        if old.is_null() {
            return;
        }

        // If processing, wait for the in-flight block to complete.
        while self.in_use.load(Ordering::SeqCst) {
            std::thread::sleep(RECLAIM_POLL_INTERVAL);
        }

        // SAFETY: the pointer came out of Box::into_raw in a previous
        // publish, was swapped out exactly once, and the audio thread has
        // quiesced since the swap, so it holds no reference to it.
        unsafe { drop(Box::from_raw(old)) };
    }
}

impl Drop for ModelSlot {
    fn drop(&mut self) {
        let ptr = *self.active.get_mut();
        if !ptr.is_null() {
            // SAFETY: exclusive access in drop; the pointer is the last
            // published Box.
            unsafe { drop(Box::from_raw(ptr)) };
        }
    }
}

//! Single-shot asynchronous initialization latch.
//!
//! States move `Uninitialized -> InProgress -> Ready`. The first caller
//! starts the initializer; callers arriving while it runs await the same
//! attempt and observe the same outcome. Success is cached for the life of
//! the latch. Failure returns the latch to `Uninitialized`, so the next
//! call starts a fresh attempt.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Uninitialized,
    InProgress,
    Ready,
}

enum Slot<T, E> {
    Uninitialized,
    InProgress(Shared<BoxFuture<'static, Result<T, E>>>),
    Ready(T),
}

pub struct InitLatch<T, E> {
    slot: Mutex<Slot<T, E>>,
}

impl<T, E> Default for InitLatch<T, E> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Slot::Uninitialized),
        }
    }
}

impl<T, E> InitLatch<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LatchState {
        match &*self.slot.lock() {
            Slot::Uninitialized => LatchState::Uninitialized,
            Slot::InProgress(_) => LatchState::InProgress,
            Slot::Ready(_) => LatchState::Ready,
        }
    }

    /// Cached value, if initialization has completed.
    pub fn get(&self) -> Option<T> {
        match &*self.slot.lock() {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Return the cached value, joining or starting an initialization
    /// attempt when there is none. `init` is only called when this caller
    /// starts a new attempt.
    pub async fn get_or_try_init<F>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, E>>,
    {
        let attempt = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::InProgress(attempt) => attempt.clone(),
                Slot::Uninitialized => {
                    let attempt = init().shared();
                    *slot = Slot::InProgress(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = attempt.clone().await;

        {
            let mut slot = self.slot.lock();
            // Only the attempt that is still current may settle the slot.
            let current = matches!(&*slot, Slot::InProgress(pending) if pending.ptr_eq(&attempt));
            if current {
                *slot = match &outcome {
                    Ok(value) => Slot::Ready(value.clone()),
                    Err(_) => Slot::Uninitialized,
                };
            }
        }

        outcome
    }
}

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Lifecycle of a memoized decode
enum DecodeState<T> {
    NotStarted,
    InProgress,
    Done(Arc<T>),
}

/// Memo slot for a decode result.
///
/// The first caller runs the decode while later callers wait for it, so at
/// most one pass is ever in flight. A successful result is stored for good;
/// a failed pass resets the slot so a later call can try again.
///
/// Waiters block the calling thread. A pass must never run on a rayon pool
/// whose workers can end up waiting on the same slot.
pub struct DecodeSlot<T> {
    state: Mutex<DecodeState<T>>,
    ready: Condvar,
    passes: AtomicUsize,
}

impl<T> Default for DecodeSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DecodeSlot<T> {
    pub fn new() -> Self {
        DecodeSlot {
            state: Mutex::new(DecodeState::NotStarted),
            ready: Condvar::new(),
            passes: AtomicUsize::new(0),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            DecodeState::Done(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    // Number of times the decode closure has been entered
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    pub fn get_or_try_init<E, F>(&self, decode: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut state = self.state.lock();
        loop {
            if let DecodeState::Done(value) = &*state {
                return Ok(Arc::clone(value));
            }
            if matches!(*state, DecodeState::InProgress) {
                self.ready.wait(&mut state);
                continue;
            }
            break;
        }
        *state = DecodeState::InProgress;
        drop(state);

        self.passes.fetch_add(1, Ordering::SeqCst);
        let mut reset = ResetOnUnwind { slot: self, armed: true };
        let result = decode();
        reset.armed = false;

        let mut state = self.state.lock();
        let outcome = match result {
            Ok(value) => {
                let value = Arc::new(value);
                *state = DecodeState::Done(Arc::clone(&value));
                Ok(value)
            }
            Err(err) => {
                *state = DecodeState::NotStarted;
                Err(err)
            }
        };
        self.ready.notify_all();
        outcome
    }
}

// Puts the slot back to NotStarted if the decode closure panics, so waiters
// are not left blocked on a pass that will never finish.
struct ResetOnUnwind<'a, T> {
    slot: &'a DecodeSlot<T>,
    armed: bool,
}

impl<T> Drop for ResetOnUnwind<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            *self.slot.state.lock() = DecodeState::NotStarted;
            self.slot.ready.notify_all();
        }
    }
}

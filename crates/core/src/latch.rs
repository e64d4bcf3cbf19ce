use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LatchError {
    #[error("latch was cancelled before reaching zero")]
    Cancelled,
}

#[derive(Debug)]
struct LatchState {
    remaining: usize,
    cancelled: bool,
}

/// One-shot countdown barrier.
///
/// Waiters are released when the count reaches zero. Cancelling releases them
/// with [`LatchError::Cancelled`] instead, unless zero was already reached.
#[derive(Debug)]
pub struct CountDownLatch {
    state: Mutex<LatchState>,
    released: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(LatchState {
                remaining: count,
                cancelled: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Decrements the count; a no-op once it is zero.
    pub fn count_down(&self) {
        let mut state = self.state.lock();
        if state.remaining == 0 {
            return;
        }
        state.remaining -= 1;
        if state.remaining == 0 {
            self.released.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        self.state.lock().remaining
    }

    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.released.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Blocks until the count is zero.
    pub fn wait(&self) -> Result<(), LatchError> {
        let mut state = self.state.lock();
        loop {
            if state.remaining == 0 {
                return Ok(());
            }
            if state.cancelled {
                return Err(LatchError::Cancelled);
            }
            self.released.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`. Returns
    /// `Ok(false)` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, LatchError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.remaining == 0 {
                return Ok(true);
            }
            if state.cancelled {
                return Err(LatchError::Cancelled);
            }
            if self.released.wait_until(&mut state, deadline).timed_out() {
                return Ok(state.remaining == 0);
            }
        }
    }
}

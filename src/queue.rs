//! Bounded blocking queue shared by producers and consumers.
//!
//! One `Mutex` guards the backing store; two `Condvar`s park threads on the
//! two conditions they care about, "not full" for producers and "not empty"
//! for consumers. Every wait re-checks its condition in a loop (`wait_while`),
//! so spurious wakeups are harmless.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{QueueError, Rejected};

/// What travels through a serving line: real work, or the sentinel telling one
/// consumer to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    Work(T),
    Done,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; such a queue could never accept an item.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a bounded queue needs a capacity of at least 1");
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots. Advisory: stale as soon as the lock is released.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free slots at the moment of the call. Advisory, for progress reporting.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    // The store is only touched by operations that cannot panic mid-update,
    // so a poisoned lock still guards a consistent queue.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_full(&self, state: &State<T>) -> bool {
        state.items.len() >= self.capacity
    }

    // =========================================================================
    // Producer side
    // =========================================================================

    /// Blocks until there is room, then appends `item`.
    ///
    /// Fails only when the queue is closed, before or while waiting.
    pub fn put(&self, item: T) -> Result<(), Rejected<T>> {
        let state = self.lock();
        let mut state = self
            .not_full
            .wait_while(state, |s| !s.closed && self.is_full(s))
            .unwrap_or_else(PoisonError::into_inner);
        self.push_locked(&mut state, item)
    }

    /// Like [`put`](Self::put) but gives up after `timeout`.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), Rejected<T>> {
        let state = self.lock();
        let (mut state, waited) = self
            .not_full
            .wait_timeout_while(state, timeout, |s| !s.closed && self.is_full(s))
            .unwrap_or_else(PoisonError::into_inner);
        if waited.timed_out() {
            return Err(Rejected::new(item, QueueError::Timeout(timeout)));
        }
        self.push_locked(&mut state, item)
    }

    /// Appends `item` only if there is room right now.
    pub fn try_put(&self, item: T) -> Result<(), Rejected<T>> {
        let mut state = self.lock();
        if !state.closed && self.is_full(&state) {
            return Err(Rejected::new(
                item,
                QueueError::Full {
                    capacity: self.capacity,
                },
            ));
        }
        self.push_locked(&mut state, item)
    }

    fn push_locked(&self, state: &mut State<T>, item: T) -> Result<(), Rejected<T>> {
        if state.closed {
            return Err(Rejected::new(item, QueueError::Closed));
        }
        debug_assert!(state.items.len() < self.capacity);
        state.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    // =========================================================================
    // Consumer side
    // =========================================================================

    /// Blocks until an item is available and removes it.
    ///
    /// After [`close`](Self::close) the remaining items are still handed out;
    /// once drained, every call returns [`QueueError::Closed`].
    pub fn get(&self) -> Result<T, QueueError> {
        let state = self.lock();
        let mut state = self
            .not_empty
            .wait_while(state, |s| !s.closed && s.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        self.pop_locked(&mut state).ok_or(QueueError::Closed)
    }

    /// Like [`get`](Self::get) but gives up after `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        let state = self.lock();
        let (mut state, waited) = self
            .not_empty
            .wait_timeout_while(state, timeout, |s| !s.closed && s.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        if waited.timed_out() {
            return Err(QueueError::Timeout(timeout));
        }
        self.pop_locked(&mut state).ok_or(QueueError::Closed)
    }

    /// Removes the head item only if one is available right now.
    pub fn try_get(&self) -> Result<T, QueueError> {
        let mut state = self.lock();
        match self.pop_locked(&mut state) {
            Some(item) => Ok(item),
            None if state.closed => Err(QueueError::Closed),
            None => Err(QueueError::Empty),
        }
    }

    fn pop_locked(&self, state: &mut State<T>) -> Option<T> {
        let item = state.items.pop_front()?;
        self.not_full.notify_one();
        Some(item)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops accepting items and wakes every blocked caller.
    ///
    /// Items already queued stay available to `get`. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

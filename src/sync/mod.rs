//! Read/write lock primitive used around the shared index and result maps
//!
//! `ReadWriteLock<T>` allows any number of concurrent readers or a single
//! exclusive writer, never both. Waiting writers get priority over new
//! readers so writers cannot starve, but a thread that already holds the
//! read lock may always acquire it again (re-entrant reads), so a reader
//! never deadlocks against itself while a writer is queued.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

/// Bookkeeping for the current lock holders.
#[derive(Debug, Default)]
struct LockState {
    /// Per-thread read acquisition counts (re-entrant reads).
    readers: HashMap<ThreadId, usize>,

    /// The thread currently holding the write lock, if any.
    writer: Option<ThreadId>,

    /// Number of threads blocked waiting for the write lock.
    waiting_writers: usize,
}

/// A re-entrant multi-reader / single-writer lock owning its data.
///
/// Unlike `std::sync::RwLock`, read acquisition is re-entrant: a thread
/// holding a `ReadGuard` may call `read()` again even while writers wait.
/// Write acquisition is exclusive and not recursive; attempting to acquire
/// the write lock on a thread that already holds any guard deadlocks, as
/// with the standard lock.
#[derive(Debug)]
pub struct ReadWriteLock<T> {
    state: Mutex<LockState>,
    released: Condvar,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is mediated by the reader/writer protocol above;
// a `&T` is only reachable while readers hold the lock and a `&mut T` only
// while the single writer does.
unsafe impl<T: Send> Send for ReadWriteLock<T> {}
unsafe impl<T: Send + Sync> Sync for ReadWriteLock<T> {}

/// RAII guard for shared read access.
///
/// Reader bookkeeping is keyed by thread id, so a guard must be dropped on
/// the thread that acquired it; the phantom raw pointer makes the guard
/// `!Send`, as with `std::sync::RwLockReadGuard`.
///
/// ```compile_fail
/// let lock = spindex::ReadWriteLock::new(0);
/// std::thread::scope(|s| {
///     let guard = lock.read();
///     s.spawn(move || drop(guard));
/// });
/// ```
pub struct ReadGuard<'a, T> {
    lock: &'a ReadWriteLock<T>,
    _not_send: PhantomData<*const ()>,
}

/// RAII guard for exclusive write access. `!Send` for the same reason as
/// [`ReadGuard`].
pub struct WriteGuard<'a, T> {
    lock: &'a ReadWriteLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> ReadWriteLock<T> {
    /// Creates a new unlocked lock owning `data`.
    pub fn new(data: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the read lock, blocking while a writer holds it.
    ///
    /// Threads that already hold the read lock are admitted immediately,
    /// even if writers are waiting.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap();
        loop {
            let reentrant = state.readers.contains_key(&me);
            if state.writer.is_none() && (reentrant || state.waiting_writers == 0) {
                break;
            }
            state = self.released.wait(state).unwrap();
        }
        *state.readers.entry(me).or_insert(0) += 1;
        ReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquires the write lock, blocking while any reader or another writer
    /// holds it.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap();
        state.waiting_writers += 1;
        while !state.readers.is_empty() || state.writer.is_some() {
            state = self.released.wait(state).unwrap();
        }
        state.waiting_writers -= 1;
        state.writer = Some(me);
        WriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Consumes the lock and returns the owned data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for ReadWriteLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: read holders exclude any writer.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        let me = thread::current().id();
        let mut state = self.lock.state.lock().unwrap();
        if let Some(count) = state.readers.get_mut(&me) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&me);
            }
        }
        if state.readers.is_empty() {
            self.lock.released.notify_all();
        }
    }
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the single writer excludes all readers.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the single writer excludes all readers.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock().unwrap();
        state.writer = None;
        self.lock.released.notify_all();
    }
}

//! Bounded cache of reusable HTTP client handles for one URL.
//!
//! The pool is an optimization only: `acquire` never blocks and builds a new
//! handle when none is idle, and `release` drops handles beyond capacity so
//! racing workers cannot grow the cache without bound.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::http::{HttpClient, TransferOptions};

type Connect<C> = Box<dyn Fn() -> C + Send + Sync>;

/// Connection cache with capacity usually equal to the worker count.
pub struct ConnectionPool<C = HttpClient> {
    idle: Mutex<VecDeque<C>>,
    capacity: usize,
    connect: Connect<C>,
    created: AtomicUsize,
}

impl ConnectionPool<HttpClient> {
    /// Pool of curl handles bound to `url`.
    pub fn for_url(url: &str, capacity: usize, opts: TransferOptions) -> Self {
        let url = url.to_string();
        Self::new(capacity, move || HttpClient::new(&url, opts))
    }
}

impl<C> ConnectionPool<C> {
    pub fn new(capacity: usize, connect: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self {
            idle: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            connect: Box::new(connect),
            created: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<C>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take an idle handle or construct a new one. The guard returns the
    /// handle to the pool when dropped, on every exit path.
    pub fn acquire(&self) -> PooledConnection<'_, C> {
        let cached = self.lock().pop_front();
        let conn = match cached {
            Some(c) => c,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                (self.connect)()
            }
        };
        PooledConnection {
            pool: self,
            conn: Some(conn),
        }
    }

    /// Return a handle. Kept only while below capacity; returns whether it was kept.
    pub fn release(&self, conn: C) -> bool {
        let mut idle = self.lock();
        if idle.len() < self.capacity {
            idle.push_back(conn);
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of handles constructed over the pool's lifetime.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// Scoped borrow of a pooled handle.
pub struct PooledConnection<'a, C> {
    pool: &'a ConnectionPool<C>,
    conn: Option<C>,
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

//! Bounded connection pool over one DuckDB database
//!
//! DuckDB hands out extra connections to an open database through
//! `Connection::try_clone`, so the pool keeps the root connection and clones
//! from it on demand. A semaphore caps how many connections are checked out
//! at once; returned connections are parked until they age past
//! `max_lifetime`.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use duckdb::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::DatabaseConfig;
use crate::domain::result::{Error, Result};

struct IdleConnection {
    conn: Connection,
    opened_at: Instant,
}

struct PoolInner {
    root: Mutex<Connection>,
    idle: Mutex<Vec<IdleConnection>>,
    permits: Arc<Semaphore>,
    max_idle: usize,
    max_lifetime: Duration,
    acquire_timeout: Duration,
}

impl PoolInner {
    fn take_idle(&self) -> Option<IdleConnection> {
        let mut idle = self.idle.lock().ok()?;
        while let Some(candidate) = idle.pop() {
            if candidate.opened_at.elapsed() < self.max_lifetime {
                return Some(candidate);
            }
        }
        None
    }

    fn open(&self) -> Result<Connection> {
        let root = self
            .root
            .lock()
            .map_err(|_| Error::database("connection pool lock poisoned"))?;
        root.try_clone()
            .map_err(|e| Error::database(format!("failed to open pooled connection: {e}")))
    }

    fn release(&self, conn: Connection, opened_at: Instant) {
        if opened_at.elapsed() >= self.max_lifetime {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(IdleConnection { conn, opened_at });
            }
        }
    }
}

/// Shared, bounded set of connections to one database
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(root: Connection, settings: &DatabaseConfig) -> Self {
        let max_open = settings.max_open_conns.max(1);
        Self {
            inner: Arc::new(PoolInner {
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
                permits: Arc::new(Semaphore::new(max_open)),
                max_idle: settings.max_idle_conns.min(max_open),
                max_lifetime: settings.max_lifetime,
                acquire_timeout: settings.acquire_timeout,
            }),
        }
    }

    /// Check out a connection, waiting at most `acquire_timeout` for a free slot
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let timeout = self.inner.acquire_timeout;
        let permit = tokio::time::timeout(timeout, Arc::clone(&self.inner.permits).acquire_owned())
            .await
            .map_err(|_| Error::PoolExhausted(timeout))?
            .map_err(|_| Error::database("connection pool closed"))?;

        let (conn, opened_at) = match self.inner.take_idle() {
            Some(idle) => (idle.conn, idle.opened_at),
            None => (self.inner.open()?, Instant::now()),
        };

        Ok(PooledConnection {
            conn: Some(conn),
            opened_at,
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Run `f` on the root connection, outside the permit accounting.
    /// Meant for startup work such as schema provisioning.
    pub fn with_root<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let root = self
            .inner
            .root
            .lock()
            .map_err(|_| Error::database("connection pool lock poisoned"))?;
        f(&root)
    }

    /// Number of parked connections
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Number of connections that can still be checked out right now
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }
}

/// A checked-out connection; goes back to the pool on drop
pub struct PooledConnection {
    conn: Option<Connection>,
    opened_at: Instant,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        // The permit field drops after this, so the slot frees up only once
        // the connection is parked.
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.opened_at);
        }
    }
}

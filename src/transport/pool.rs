//! Bounded pool of reusable HTTP sessions for one upstream service.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use url::Url;

use crate::error::TransportError;
use crate::wallet::Chain;

/// Response surface the engine cares about. Status mapping happens in the
/// safety gate, not here.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: String,
    pub latency: Duration,
}

/// One reusable session. Exclusively owned by a single in-flight request
/// while checked out.
struct PoolConnection {
    id: u64,
    client: reqwest::Client,
}

struct PoolInner {
    service: Chain,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<PoolConnection>>,
    closed: AtomicBool,
    next_id: AtomicU64,
    open: AtomicUsize,
    acquired_total: AtomicU64,
    discarded_total: AtomicU64,
    connect_timeout: Duration,
    request_timeout: Duration,
}

/// Connection pool for a single balance service.
pub struct TransportPool {
    inner: Arc<PoolInner>,
    acquire_timeout: Duration,
}

impl TransportPool {
    pub fn new(
        service: Chain,
        pool_size: usize,
        acquire_timeout: Duration,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                service,
                permits: Arc::new(Semaphore::new(pool_size)),
                idle: Mutex::new(Vec::with_capacity(pool_size)),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                open: AtomicUsize::new(0),
                acquired_total: AtomicU64::new(0),
                discarded_total: AtomicU64::new(0),
                connect_timeout,
                request_timeout,
            }),
            acquire_timeout,
        }
    }

    /// Send a single idempotent GET through a pooled connection.
    pub async fn send(&self, url: Url) -> Result<ServiceResponse, TransportError> {
        let mut handle = self.acquire().await?;
        match handle.request(url).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // Never silently reuse a connection after a hard failure.
                handle.discard();
                Err(e)
            }
        }
    }

    async fn acquire(&self) -> Result<PooledHandle, TransportError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let permit = match timeout(
            self.acquire_timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        {
            Err(_) => {
                return Err(TransportError::PoolExhausted {
                    waited_ms: self.acquire_timeout.as_millis() as u64,
                })
            }
            Ok(Err(_)) => return Err(TransportError::Closed),
            Ok(Ok(permit)) => permit,
        };
        self.inner.acquired_total.fetch_add(1, Ordering::SeqCst);

        let reused = {
            let mut idle = self.inner.idle.lock().expect("pool mutex poisoned");
            idle.pop()
        };
        let conn = match reused {
            Some(conn) => conn,
            None => self.open_connection()?,
        };
        tracing::trace!(service = %self.inner.service, conn_id = conn.id, "Connection acquired");

        Ok(PooledHandle {
            conn: Some(conn),
            _permit: permit,
            inner: Arc::clone(&self.inner),
        })
    }

    fn open_connection(&self) -> Result<PoolConnection, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.inner.connect_timeout)
            .timeout(self.inner.request_timeout)
            .pool_max_idle_per_host(1)
            .user_agent(concat!("chain-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.open.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(service = %self.inner.service, conn_id = id, "Opened connection");
        Ok(PoolConnection { id, client })
    }

    /// Close the pool: fail pending and future acquires and drop every
    /// idle session. In-flight handles drop their connections on return.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.permits.close();
        let drained = {
            let mut idle = self.inner.idle.lock().expect("pool mutex poisoned");
            idle.drain(..).count()
        };
        self.inner.open.fetch_sub(drained, Ordering::SeqCst);
        tracing::debug!(service = %self.inner.service, drained, "Pool closed");
    }

    /// Connections currently open (idle + checked out).
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().expect("pool mutex poisoned").len()
    }

    /// Connections currently checked out by in-flight requests.
    pub fn in_use(&self) -> usize {
        self.open_connections().saturating_sub(self.idle_count())
    }

    pub fn acquired_total(&self) -> u64 {
        self.inner.acquired_total.load(Ordering::SeqCst)
    }

    pub fn discarded_total(&self) -> u64 {
        self.inner.discarded_total.load(Ordering::SeqCst)
    }
}

/// A checked-out connection. Returns to the pool on drop unless discarded
/// or the pool has closed.
struct PooledHandle {
    conn: Option<PoolConnection>,
    _permit: OwnedSemaphorePermit,
    inner: Arc<PoolInner>,
}

impl PooledHandle {
    async fn request(&mut self, url: Url) -> Result<ServiceResponse, TransportError> {
        let conn = match self.conn.as_ref() {
            Some(conn) => conn,
            None => return Err(TransportError::Closed),
        };
        let started = Instant::now();
        let response = conn.client.get(url).send().await.map_err(map_reqwest)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest)?;
        Ok(ServiceResponse {
            status,
            body,
            latency: started.elapsed(),
        })
    }

    fn discard(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.inner.open.fetch_sub(1, Ordering::SeqCst);
            self.inner.discarded_total.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                service = %self.inner.service,
                conn_id = conn.id,
                "Discarded connection after transport failure"
            );
        }
    }
}

impl Drop for PooledHandle {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            // The flag is read under the idle lock: close() sets it before
            // draining, so a connection is either drained or dropped here,
            // never parked in a closed pool.
            let mut idle = self.inner.idle.lock().expect("pool mutex poisoned");
            if self.inner.closed.load(Ordering::SeqCst) {
                drop(idle);
                self.inner.open.fetch_sub(1, Ordering::SeqCst);
                drop(conn);
            } else {
                idle.push(conn);
            }
        }
    }
}

fn map_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connect(e)
    }
}

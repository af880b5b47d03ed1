//! Bounded connection pool over sqlx's `Any` driver.
//!
//! Every store operation checks out one [`StoreConn`] and drops it when the
//! statement finishes; dropping hands the connection back to the pool whether
//! the statement succeeded or not.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::StudentsError;

/// Which SQL dialect sits behind the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MySql,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, StudentsError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Backend::MySql),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(StudentsError::Config(format!(
                "unsupported database scheme `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Waiters allowed beyond `max_connections`; 0 = unbounded.
    pub queue_limit: usize,
    pub acquire_timeout: Duration,
}

impl From<&Config> for PoolSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            max_connections: cfg.db_pool_size.max(1),
            queue_limit: cfg.db_queue_limit,
            acquire_timeout: cfg.acquire_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct StorePool {
    pool: AnyPool,
    backend: Backend,
    admission: Option<Arc<Semaphore>>,
}

impl StorePool {
    /// Build the pool without touching the network. Connections are opened
    /// on first use, so an unreachable store only fails the requests that
    /// need it.
    pub fn open(database_url: &str, settings: PoolSettings) -> Result<Self, StudentsError> {
        install_default_drivers();
        let backend = Backend::from_url(database_url)?;

        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy(database_url)?;

        let admission = match settings.queue_limit {
            0 => None,
            limit => Some(Arc::new(Semaphore::new(
                settings.max_connections as usize + limit,
            ))),
        };

        debug!(
            ?backend,
            max_connections = settings.max_connections,
            queue_limit = settings.queue_limit,
            "store pool created"
        );
        Ok(Self {
            pool,
            backend,
            admission,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Check out a connection for exactly one statement.
    pub async fn acquire(&self) -> Result<StoreConn, StudentsError> {
        let permit = match &self.admission {
            Some(sem) => match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!("store pool queue is full; rejecting request");
                    return Err(StudentsError::PoolSaturated);
                }
            },
            None => None,
        };

        let conn = self.pool.acquire().await?;
        Ok(StoreConn {
            conn,
            _permit: permit,
        })
    }

    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    /// Wait for checked-out connections to come back, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// A checked-out connection plus its queue slot. Both are released on drop.
pub struct StoreConn {
    conn: PoolConnection<Any>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Deref for StoreConn {
    type Target = AnyConnection;

    fn deref(&self) -> &AnyConnection {
        &self.conn
    }
}

impl DerefMut for StoreConn {
    fn deref_mut(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }
}

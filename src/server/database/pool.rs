use crate::server::database::connection::Connection;
use anyhow::{Context, Error};
use log::{error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;
use tokio_postgres::Client;

pub(crate) struct CommonPool<C> {
    /// pool name, used in logs
    name: String,
    /// idle connections, handed out in a FIFO manner
    connections: Mutex<VecDeque<C>>,
    /// one permit per idle connection
    permits: Semaphore,
}

/// Fixed-size pool of database clients.
///
/// A [`Connection`] borrowed from the pool goes back to it when dropped.
pub(crate) struct Pool<C>(Arc<CommonPool<C>>);

impl<C> Clone for Pool<C> {
    fn clone(&self) -> Pool<C> {
        Pool(self.0.clone())
    }
}

impl<C: Send + 'static> Pool<C> {
    pub const DEFAULT_SIZE: usize = 10;

    /// create an empty pool, clients are added with [`Pool::put`]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(CommonPool {
            name: name.into(),
            connections: Mutex::new(VecDeque::with_capacity(Self::DEFAULT_SIZE)),
            permits: Semaphore::new(0),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    fn idle_connections(&self) -> MutexGuard<'_, VecDeque<C>> {
        // the queue stays consistent even if a holder panicked
        self.0.connections.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// number of connections currently sitting in the pool
    pub fn idle(&self) -> usize {
        self.idle_connections().len()
    }

    /// hand a client to the pool
    pub fn put(&self, client: C) {
        self.idle_connections().push_back(client);
        self.0.permits.add_permits(1);
    }

    /// acquire a connection, waiting at most `timeout` for one to be released.
    pub async fn acquire(&self, timeout: Duration) -> Option<Connection<C>> {
        match time::timeout(timeout, self.0.permits.acquire()).await {
            Ok(Ok(permit)) => {
                // the permit is given back by `put` on release
                permit.forget();
                match self.idle_connections().pop_front() {
                    Some(client) => Some(Connection::new(client, self.clone())),
                    None => {
                        error!("pool {} handed out a permit without an idle connection", self.name());
                        None
                    }
                }
            }
            Ok(Err(e)) => {
                error!("pool {} is closed, {}", self.name(), e);
                None
            }
            Err(_) => {
                warn!("timed out to acquire a connection from pool {} after {:?}", self.name(), timeout);
                None
            }
        }
    }

    pub fn release(&self, client: C) {
        self.put(client);
    }
}

pub(crate) mod connect_util {
    use anyhow::{Context, Error};
    use log::error;
    use tokio_postgres::{Client, NoTls};

    pub async fn connect(conn_str: &str) -> Result<Client, Error> {
        let (client, conn) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .context("failed to create connection")?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("connection returned error and aborted, {}", e);
            }
        });
        Ok(client)
    }
}

impl Pool<Client> {
    /// open `size` connections concurrently and fill a new pool with them
    pub async fn connect(name: &str, conn_str: &str, size: usize) -> Result<Self, Error> {
        let pool = Self::new(name);
        let mut set = JoinSet::new();
        for _ in 0..size {
            let conn_str = conn_str.to_string();
            set.spawn(async move { connect_util::connect(conn_str.as_str()).await });
        }
        while let Some(res) = set.join_next().await {
            let client = res.context("connect task panicked")??;
            pool.put(client);
        }
        info!("pool {} created with {} connections", name, pool.idle());
        Ok(pool)
    }
}

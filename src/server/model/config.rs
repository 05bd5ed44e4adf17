use std::net::SocketAddrV4;
use std::str::FromStr;
use std::time::Duration;
use derive_more::Display;

/// Where the server keeps its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum StoreBackend {
    #[display("postgres")]
    Postgres,
    /// process-local tables, lost on restart
    #[display("memory")]
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            s => Err(format!("Invalid STORE_BACKEND: {s}")),
        }
    }
}

/// Server configs
#[derive(Debug)]
pub(crate) struct ServerConfig {
    pub addr: SocketAddrV4,
    pub db_read_conn_str: String,
    pub db_write_conn_str: String,
    pub db_pool_size: usize,
    pub db_timeout: Duration,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl ServerConfig {
    pub fn new(
        addr: SocketAddrV4,
        db_read_conn_str: String,
        db_write_conn_str: String,
        jwt_secret: String,
    ) -> Self {
        Self {
            addr,
            db_read_conn_str,
            db_write_conn_str,
            db_pool_size: 10,
            db_timeout: Duration::from_secs(5),
            store_backend: StoreBackend::Postgres,
            jwt_secret,
            token_ttl: chrono::Duration::hours(8),
        }
    }

    pub fn with_pool(mut self, size: usize, timeout: Duration) -> Self {
        self.db_pool_size = size;
        self.db_timeout = timeout;
        self
    }

    pub fn with_store_backend(mut self, backend: StoreBackend) -> Self {
        self.store_backend = backend;
        self
    }

    pub fn with_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use super::ResultSets;

/// Driver-level SQL failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlError {
    /// The session is unusable; the connection will be re-established.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A named constraint rejected the statement.
    #[error("constraint [{name}] violated: {message}")]
    Constraint {
        /// Constraint name as reported by the driver.
        name: String,
        /// Full driver message.
        message: String,
    },

    /// Any other statement failure.
    #[error("query failed: {0}")]
    Query(String),
}

/// A boxed future returned by SQL drivers.
pub type SqlFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SqlError>> + Send + 'a>>;

/// An open database session.
pub trait SqlSession: Send + Sync {
    /// Run `sql` with positional `args`.
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> SqlFuture<'a, ResultSets>;
}

/// Opens sessions for one database.
pub trait SqlConnector: Send + Sync {
    /// Driver name, for logs.
    fn driver(&self) -> &'static str;

    /// Open a new session.
    fn connect(&self) -> SqlFuture<'_, Arc<dyn SqlSession>>;
}

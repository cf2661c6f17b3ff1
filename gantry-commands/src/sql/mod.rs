//! The SQL contract.
//!
//! A driver opens [`SqlSession`]s through an [`SqlConnector`]; a session
//! runs one statement with positional arguments and yields [`ResultSets`].
//! [`SqlConnection`] wraps a connector with its declared queries and keeps a
//! single lease, reconnecting when the driver reports the connection lost.
//! [`Connections`] is the named registry shared by all in-flight requests.

mod connection;
mod driver;
mod memory;
mod query;
mod result;
mod sqlite;

pub use connection::{Connections, DEFAULT_MAX_RECONNECTS, SqlConnection};
pub use driver::{SqlConnector, SqlError, SqlFuture, SqlSession};
pub use memory::MemoryDriver;
pub use query::{Expect, FailureMapping, QueryDefinition, QueryReturn, ResultSetSpec};
pub use result::{ResultSet, ResultSets, Row};
pub use sqlite::SqliteConnector;

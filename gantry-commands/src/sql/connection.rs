use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{QueryDefinition, ResultSets, SqlConnector, SqlError, SqlSession};

/// Reconnect attempts per query before a lost connection is reported.
pub const DEFAULT_MAX_RECONNECTS: u32 = 3;

/// A named database with its declared queries and a single session lease.
pub struct SqlConnection {
    name: String,
    connector: Arc<dyn SqlConnector>,
    queries: HashMap<String, QueryDefinition>,
    lease: Mutex<Option<Arc<dyn SqlSession>>>,
    max_reconnects: u32,
}

impl fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConnection")
            .field("name", &self.name)
            .field("driver", &self.connector.driver())
            .field("queries", &self.queries.len())
            .finish()
    }
}

impl SqlConnection {
    /// Create a connection. No session is opened until the first query.
    pub fn new(
        name: impl Into<String>,
        connector: Arc<dyn SqlConnector>,
        queries: HashMap<String, QueryDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            connector,
            queries,
            lease: Mutex::new(None),
            max_reconnects: DEFAULT_MAX_RECONNECTS,
        }
    }

    /// Override the reconnect limit.
    pub fn with_max_reconnects(mut self, max_reconnects: u32) -> Self {
        self.max_reconnects = max_reconnects;
        self
    }

    /// Connection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A declared query by id.
    pub fn get_query(&self, id: &str) -> Option<&QueryDefinition> {
        self.queries.get(id)
    }

    async fn session(&self) -> Result<Arc<dyn SqlSession>, SqlError> {
        let leased = self.lease.lock().clone();
        if let Some(session) = leased {
            return Ok(session);
        }
        debug!(connection = %self.name, driver = self.connector.driver(), "opening sql session");
        let session = self.connector.connect().await?;
        *self.lease.lock() = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Drop the lease if it still holds `session`.
    fn release(&self, session: &Arc<dyn SqlSession>) {
        let mut lease = self.lease.lock();
        if lease.as_ref().is_some_and(|current| Arc::ptr_eq(current, session)) {
            lease.take();
        }
    }

    /// Run a statement, re-opening the session when the driver reports it
    /// lost.
    pub async fn query(&self, sql: &str, args: &[Value]) -> Result<ResultSets, SqlError> {
        let mut attempt = 0;
        loop {
            let session = self.session().await?;
            match session.query(sql, args).await {
                Err(SqlError::ConnectionLost(reason)) if attempt < self.max_reconnects => {
                    attempt += 1;
                    warn!(connection = %self.name, attempt, %reason, "sql connection lost, reconnecting");
                    self.release(&session);
                }
                outcome => return outcome,
            }
        }
    }
}

/// Registry of named connections, shared across requests.
#[derive(Clone, Default)]
pub struct Connections {
    connections: HashMap<String, Arc<SqlConnection>>,
}

impl fmt::Debug for Connections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.connections.keys()).finish()
    }
}

impl Connections {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, replacing any with the same name.
    pub fn insert(&mut self, connection: SqlConnection) {
        self.connections
            .insert(connection.name().to_string(), Arc::new(connection));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, connection: SqlConnection) -> Self {
        self.insert(connection);
        self
    }

    /// A connection by name.
    pub fn get(&self, name: &str) -> Option<&Arc<SqlConnection>> {
        self.connections.get(name)
    }

    /// Registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::MemoryDriver;
    use serde_json::json;

    fn connection(driver: &MemoryDriver) -> SqlConnection {
        SqlConnection::new("main", Arc::new(driver.clone()), HashMap::new())
    }

    #[tokio::test]
    async fn reuses_the_lease() {
        let driver = MemoryDriver::new();
        let connection = connection(&driver);
        connection.query("select 1", &[]).await.unwrap();
        connection.query("select 2", &[json!(1)]).await.unwrap();
        assert_eq!(driver.connect_count(), 1);
        assert_eq!(driver.executed()[1], ("select 2".to_string(), vec![json!(1)]));
    }

    #[tokio::test]
    async fn reconnects_on_drop() {
        let driver = MemoryDriver::new()
            .respond(Err(SqlError::ConnectionLost("terminating connection".into())))
            .respond(Ok(ResultSets::rows(vec![])));
        let connection = connection(&driver);
        connection.query("select 1", &[]).await.unwrap();
        assert_eq!(driver.connect_count(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_reconnects() {
        let driver = MemoryDriver::new();
        for _ in 0..3 {
            driver.push_response(Err(SqlError::ConnectionLost("gone".into())));
        }
        let connection = connection(&driver).with_max_reconnects(2);
        let err = connection.query("select 1", &[]).await.unwrap_err();
        assert!(matches!(err, SqlError::ConnectionLost(_)));
        assert_eq!(driver.connect_count(), 3);
    }

    #[tokio::test]
    async fn stale_session_keeps_newer_lease() {
        let driver = MemoryDriver::new();
        let connection = connection(&driver);
        let stale = connection.session().await.unwrap();
        connection.release(&stale);
        let fresh = connection.session().await.unwrap();

        connection.release(&stale);
        let leased = connection.lease.lock().clone().unwrap();
        assert!(Arc::ptr_eq(&leased, &fresh));
        assert_eq!(driver.connect_count(), 2);

        connection.release(&fresh);
        assert!(connection.lease.lock().is_none());
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let driver = MemoryDriver::new().respond(Err(SqlError::Query("syntax".into())));
        let connection = connection(&driver);
        assert!(connection.query("selec", &[]).await.is_err());
        assert_eq!(driver.connect_count(), 1);
    }
}

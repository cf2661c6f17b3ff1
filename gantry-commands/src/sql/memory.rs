use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ResultSets, SqlConnector, SqlError, SqlFuture, SqlSession};

#[derive(Default)]
struct MemoryState {
    responses: Mutex<VecDeque<Result<ResultSets, SqlError>>>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
    connects: AtomicUsize,
}

/// Scripted in-memory driver.
///
/// Each statement pops the next scripted response (an empty result when the
/// script is exhausted) and is recorded with its arguments. Clones share
/// the same script.
///
/// # Example
///
/// ```
/// use gantry_commands::sql::{MemoryDriver, ResultSets, SqlConnection};
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// # tokio_test_block(async {
/// let driver = MemoryDriver::new().respond(Ok(ResultSets::rows(vec![])));
/// let connection = SqlConnection::new("main", Arc::new(driver.clone()), HashMap::new());
/// connection.query("select 1", &[]).await.unwrap();
/// assert_eq!(driver.executed().len(), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryDriver {
    state: Arc<MemoryState>,
}

impl MemoryDriver {
    /// A driver with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scripted response.
    pub fn respond(self, response: Result<ResultSets, SqlError>) -> Self {
        self.push_response(response);
        self
    }

    /// Append a scripted response through a shared handle.
    pub fn push_response(&self, response: Result<ResultSets, SqlError>) {
        self.state.responses.lock().push_back(response);
    }

    /// Statements executed so far, with their arguments.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state.executed.lock().clone()
    }

    /// Number of sessions opened.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }
}

struct MemorySession {
    state: Arc<MemoryState>,
}

impl SqlSession for MemorySession {
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> SqlFuture<'a, ResultSets> {
        self.state
            .executed
            .lock()
            .push((sql.to_string(), args.to_vec()));
        let response = self
            .state
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ResultSets::default()));
        Box::pin(async move { response })
    }
}

impl SqlConnector for MemoryDriver {
    fn driver(&self) -> &'static str {
        "memory"
    }

    fn connect(&self) -> SqlFuture<'_, Arc<dyn SqlSession>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let session: Arc<dyn SqlSession> = Arc::new(MemorySession {
            state: Arc::clone(&self.state),
        });
        Box::pin(async move { Ok(session) })
    }
}

//! HTTP transport adapter.
//!
//! Binds the executor to HTTP/1.1 with hyper: builds a [`Request`] from each
//! incoming request, runs it, and renders the [`Response`] (JSON body,
//! redirect, cookies, no-cache and CORS headers). Event-stream endpoints are
//! re-run on a fixed interval until the client goes away.
//!
//! [`Request`]: gantry_core::request::Request
//! [`Response`]: gantry_core::response::Response

mod handler;
mod response;
mod server;

pub use handler::{ServerState, handle};
pub use response::Body;
pub use server::{EngineServer, ServerConfig};

//! Gantry Executor - runs pipelines for HTTP requests.
//!
//! This crate provides the runtime side of the engine:
//! - Condition evaluation for step guards
//! - The [`Executor`] that selects an endpoint and runs its pipeline
//! - Engine configuration loading ([`loader`])
//! - The hyper-based HTTP transport adapter ([`server`])
//! - Logging setup ([`observability`])
//!
//! # Example
//!
//! ```
//! use gantry_core::prelude::*;
//! use gantry_executor::Executor;
//! use serde_json::json;
//!
//! let api = ApiDefinition::from_yaml(r#"
//! paths:
//!   /hello:
//!     get:
//!       x-backend-engine:
//!         points:
//!           - selector: true
//!             exec-pipe-id: hello
//! "#).unwrap();
//! let pipelines = EpDefinition::from_yaml(r#"
//! pipelines:
//!   hello:
//!     steps:
//!       - type: args
//!         args: { greeting: hello }
//!         graft: "."
//! "#).unwrap();
//!
//! let executor = Executor::new(api, pipelines);
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let mut request = Request::new(HttpMethod::Get, "/hello");
//! let response = runtime.block_on(executor.do_request(&mut request)).unwrap();
//! assert_eq!(response.body().as_value(), &json!({"greeting": "hello"}));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conditions;
pub mod executor;
pub mod loader;
pub mod observability;
pub mod server;

pub use executor::{Executor, log_exception};
pub use loader::{Engine, EngineConfig};
pub use server::{EngineServer, ServerConfig};

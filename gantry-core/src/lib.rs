//! Gantry Core Library
//!
//! Foundational types for the Gantry request-processing engine.
//!
//! # Overview
//!
//! Gantry serves HTTP endpoints without per-endpoint code: an API-shape
//! definition routes each request to a named pipeline, and the pipeline's
//! steps invoke pluggable commands whose arguments are templates resolved
//! against the request.
//!
//! # Key Components
//!
//! - **Exceptions**: status-coded, partially public errors ([`error`])
//! - **JsonValue**: dotted-path JSON documents ([`value`])
//! - **Request / Response**: the transport contract ([`request`], [`response`])
//! - **Definitions**: API shape and pipeline library ([`definition`])
//! - **Inputs**: the `{type.path}` expression evaluator ([`inputs`])
//!
//! # Example
//!
//! ```
//! use gantry_core::prelude::*;
//! use serde_json::json;
//!
//! let request = Request::new(HttpMethod::Get, "/users/{id}").with_path_parameter("id", "42");
//! let inputs = Inputs::default();
//! let args = inputs
//!     .expand_args(&json!({"args": ["{path.id}"]}), Scope::request(&request))
//!     .unwrap();
//! assert_eq!(args, json!({"args": ["42"]}));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod definition;
pub mod error;
pub mod inputs;
pub mod prelude;
pub mod request;
pub mod response;
pub mod testing;
pub mod value;

pub use error::{Exception, ExceptionKind, Result};
pub use inputs::{Inputs, InputsConfig, Scope};
pub use request::{HttpMethod, Request};
pub use response::{Cookie, Response, Uri};
pub use value::JsonValue;

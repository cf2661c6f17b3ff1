//! Prelude for convenient imports.
//!
//! ```ignore
//! use gantry_core::prelude::*;
//! ```

// Error handling
pub use crate::error::{Exception, ExceptionKind, Result, ResultExt};

// Documents
pub use crate::value::JsonValue;

// Transport contract
pub use crate::request::{HttpMethod, Request, StopHandle};
pub use crate::response::{Cookie, CookieOptions, Response, Uri};

// Definitions
pub use crate::definition::{ApiDefinition, ApiPoint, Condition, EpDefinition, Pipeline, Selector, Step};

// Inputs
pub use crate::inputs::{InputSource, Inputs, InputsConfig, Reference, Scope};

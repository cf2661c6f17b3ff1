//! Logging setup for engine binaries.
//!
//! The log format is controlled via `GANTRY_LOG_FORMAT`:
//! - `json` - structured JSON output
//! - `pretty` - human-readable multi-line output
//! - `compact` - single-line output
//!
//! The filter comes from `GANTRY_LOG_LEVEL`, then `RUST_LOG`, then `info`.
//!
//! # Example
//!
//! ```ignore
//! use gantry_executor::observability::{TracingConfig, init_tracing};
//!
//! let config = TracingConfig::builder()
//!     .json_format(true)
//!     .log_filter("info,gantry_executor=debug")
//!     .build();
//! let _guard = init_tracing(config)?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};

/// Span for one pipeline run.
#[macro_export]
macro_rules! pipeline_span {
    ($pipeline_id:expr, $method:expr, $path:expr) => {
        tracing::info_span!(
            "pipeline",
            pipeline_id = %$pipeline_id,
            method = %$method,
            path = %$path,
        )
    };
}

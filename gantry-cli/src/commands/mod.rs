//! CLI command implementations.

pub mod run;
pub mod serve;
pub mod validate;

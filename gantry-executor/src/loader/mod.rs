#![allow(clippy::module_inception)]

//! Engine configuration loading.
//!
//! One YAML (or JSON) file names the API-shape definition, the pipeline
//! library, transport settings, credentials and SQL connections. Loading it
//! yields a fully wired [`Engine`].
//!
//! # Example
//!
//! ```ignore
//! use gantry_executor::loader::EngineConfig;
//!
//! let engine = EngineConfig::load("config/gantry.yaml")?;
//! engine.into_server().run().await?;
//! ```

mod config;
mod loader;

pub use config::{CredentialsConfig, DriverConfig, EngineConfig, SqlConnectionConfig};
pub use loader::Engine;

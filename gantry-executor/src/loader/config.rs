//! Engine configuration document.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use gantry_commands::sql::{DEFAULT_MAX_RECONNECTS, QueryDefinition};
use gantry_core::inputs::sources::hmac_token::DEFAULT_HEADER;

use crate::server::ServerConfig;

/// The engine configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// API-shape definition, relative to the configuration file.
    pub api: PathBuf,
    /// Pipeline library, relative to the configuration file.
    pub pipelines: PathBuf,
    /// Transport settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Development fallback for `env.*` references.
    #[serde(default)]
    pub env_dev: HashMap<String, String>,
    /// Credential verification settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// SQL connections by name.
    #[serde(default)]
    pub sql: IndexMap<String, SqlConnectionConfig>,
}

/// Signed-claim and HMAC token settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Base64 Ed25519 verifying key.
    pub claim_public_key: Option<String>,
    /// Cookie holding `{"access_token": ...}`.
    pub claim_cookie: Option<String>,
    /// Accepted claim `type` values; empty accepts any.
    pub claim_types: Vec<String>,
    /// HMAC shared secret.
    pub hmac_secret: Option<String>,
    /// Header carrying HMAC tokens.
    pub hmac_header: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            claim_public_key: None,
            claim_cookie: None,
            claim_types: Vec::new(),
            hmac_secret: None,
            hmac_header: DEFAULT_HEADER.to_string(),
        }
    }
}

/// One named SQL connection.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlConnectionConfig {
    /// Driver and its settings.
    #[serde(flatten)]
    pub driver: DriverConfig,
    /// Declared queries by id.
    #[serde(default)]
    pub queries: HashMap<String, QueryDefinition>,
    /// Reconnect attempts before a lost connection is reported.
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,
}

fn default_max_reconnects() -> u32 {
    DEFAULT_MAX_RECONNECTS
}

/// Supported SQL drivers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DriverConfig {
    /// SQLite database file; `:memory:` opens a private in-memory database.
    Sqlite {
        /// Database file, relative to the configuration file.
        path: PathBuf,
    },
    /// Scripted in-memory driver with no responses queued.
    Memory,
}

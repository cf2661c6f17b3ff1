//! Builds an [`Engine`] from an [`EngineConfig`].

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use gantry_commands::CommandFactory;
use gantry_commands::sql::{
    Connections, MemoryDriver, SqlConnection, SqlConnector, SqliteConnector,
};
use gantry_core::definition::{ApiDefinition, EpDefinition, parse_document};
use gantry_core::error::{Exception, Result, ResultExt};
use gantry_core::inputs::sources::{ClaimSettings, HmacSettings};
use gantry_core::inputs::{Inputs, InputsConfig, Scope};
use gantry_core::testing::{EnvProvider, RealEnv};

use super::config::{DriverConfig, EngineConfig, SqlConnectionConfig};
use crate::executor::Executor;
use crate::server::{EngineServer, ServerConfig};

const SQLITE_MEMORY: &str = ":memory:";

/// Subtrees whose strings may reference `env.*` at load time.
const EXPANDED_SECTIONS: [&str; 2] = ["credentials", "sql"];

/// A fully wired engine: executor plus transport settings.
#[derive(Debug, Clone)]
pub struct Engine {
    /// Runs pipelines.
    pub executor: Executor,
    /// Transport settings.
    pub server: ServerConfig,
}

impl Engine {
    /// Replace the command factory, e.g. to register custom providers.
    pub fn with_commands(mut self, commands: CommandFactory) -> Self {
        self.executor = self.executor.with_commands(commands);
        self
    }

    /// Wrap the engine in an HTTP server.
    pub fn into_server(self) -> EngineServer {
        EngineServer::new(self.server, self.executor)
    }
}

impl EngineConfig {
    /// Load the configuration at `path` against the process environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Engine> {
        Self::load_with_env(path, Arc::new(RealEnv))
    }

    /// Load the configuration at `path`, reading `env.*` from `env`.
    pub fn load_with_env(path: impl AsRef<Path>, env: Arc<dyn EnvProvider>) -> Result<Engine> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .or_exception(|| Exception::config(format!("failed to read '{}'", path.display())))?;
        let config = Self::parse(&text, &path.display().to_string(), Arc::clone(&env))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.build(base, env)
    }

    /// Parse a configuration document, expanding `env.*` references in the
    /// credential and SQL sections.
    pub fn parse(text: &str, origin: &str, env: Arc<dyn EnvProvider>) -> Result<Self> {
        let mut raw: Map<String, Value> = parse_document(text, origin)?;
        let bootstrap = Inputs::new(
            InputsConfig::default()
                .with_env(env)
                .with_env_dev(env_dev(&raw)),
        );
        for section in EXPANDED_SECTIONS {
            if let Some(template) = raw.get(section) {
                let expanded = bootstrap
                    .expand_args(template, Scope::empty())
                    .map_err(|e| {
                        Exception::config(format!("failed to expand '{section}' in '{origin}'"))
                            .wrap_exception(e)
                    })?;
                raw.insert(section.to_string(), expanded);
            }
        }
        serde_json::from_value(Value::Object(raw))
            .or_exception(|| Exception::config(format!("invalid configuration '{origin}'")))
    }

    /// Build the engine. Relative paths resolve against `base`.
    pub fn build(self, base: &Path, env: Arc<dyn EnvProvider>) -> Result<Engine> {
        let api = ApiDefinition::from_file(&resolve(base, &self.api))?;
        let pipelines = EpDefinition::from_file(&resolve(base, &self.pipelines))?;
        pipelines.validate(&api)?;

        let credentials = &self.credentials;
        let claims = ClaimSettings {
            verifying_key: credentials
                .claim_public_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .map(ClaimSettings::decode_key)
                .transpose()?,
            cookie: credentials.claim_cookie.clone(),
            token_types: credentials.claim_types.clone(),
        };
        let hmac = HmacSettings {
            secret: credentials
                .hmac_secret
                .as_ref()
                .filter(|secret| !secret.is_empty())
                .map(|secret| secret.as_bytes().to_vec()),
            header: credentials.hmac_header.to_ascii_lowercase(),
        };
        let inputs = Inputs::new(
            InputsConfig::default()
                .with_env(env)
                .with_env_dev(self.env_dev)
                .with_claims(claims)
                .with_hmac(hmac),
        );

        let mut connections = Connections::new();
        for (name, connection) in self.sql {
            debug!(connection = %name, "registering sql connection");
            connections.insert(open(base, name, connection));
        }

        info!(
            paths = api.templates().count(),
            pipelines = pipelines.ids().count(),
            connections = connections.len(),
            "engine configuration loaded"
        );
        let executor = Executor::new(api, pipelines)
            .with_inputs(inputs)
            .with_connections(connections);
        Ok(Engine {
            executor,
            server: self.server,
        })
    }
}

fn open(base: &Path, name: String, config: SqlConnectionConfig) -> SqlConnection {
    let connector: Arc<dyn SqlConnector> = match config.driver {
        DriverConfig::Sqlite { path } if path.as_os_str() == SQLITE_MEMORY => {
            Arc::new(SqliteConnector::new(path))
        }
        DriverConfig::Sqlite { path } => Arc::new(SqliteConnector::new(resolve(base, &path))),
        DriverConfig::Memory => Arc::new(MemoryDriver::new()),
    };
    SqlConnection::new(name, connector, config.queries).with_max_reconnects(config.max_reconnects)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn env_dev(raw: &Map<String, Value>) -> HashMap<String, String> {
    raw.get("env_dev")
        .and_then(Value::as_object)
        .map(|table| {
            table
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

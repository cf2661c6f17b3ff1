//! Command dispatch by step type.

use std::sync::Arc;
use tracing::trace;

use gantry_core::error::{Exception, Result};

use crate::builtin::{
    ApiCallCommand, ArgsCommand, AuthorizationCommand, RedirectionCommand, ScrapeCommand,
    SqlQueryCommand, TestCommand,
};
use crate::command::{Command, CommandConfig};

/// Supplies command types the engine does not ship.
///
/// Providers are consulted in registration order after the built-in types,
/// and the first one returning `Some` wins.
pub trait CommandProvider: Send + Sync {
    /// Build a command for `kind`, or `None` when this provider does not
    /// know it.
    fn create<'a>(&self, kind: &str, config: CommandConfig<'a>) -> Option<Box<dyn Command + 'a>>;
}

/// Resolves a step `type` to a runnable command.
#[derive(Clone)]
pub struct CommandFactory {
    providers: Vec<Arc<dyn CommandProvider>>,
    http: reqwest::Client,
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandFactory")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl CommandFactory {
    /// A factory with only the built-in types.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client for `api-call` and `scrape`.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Register a provider for custom step types.
    pub fn with_provider(mut self, provider: Arc<dyn CommandProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build the command for `kind`.
    pub fn get<'a>(&self, kind: &str, config: CommandConfig<'a>) -> Result<Box<dyn Command + 'a>> {
        trace!(command = kind, "resolving command");
        let command: Box<dyn Command + 'a> = match kind {
            "api-call" => Box::new(ApiCallCommand::new(self.http.clone())),
            "redirection" => Box::new(RedirectionCommand),
            "sql-query" => Box::new(SqlQueryCommand::new(config.connections)),
            "authorization-control" => Box::new(AuthorizationCommand::new(config.inputs, config.scope)),
            "args" => Box::new(ArgsCommand),
            "test" => Box::new(TestCommand),
            "scrape" => Box::new(ScrapeCommand::new(self.http.clone())),
            _ => {
                return self
                    .providers
                    .iter()
                    .find_map(|provider| provider.create(kind, config))
                    .ok_or_else(|| {
                        Exception::ep_definition(format!("unknown command type [{kind}]"))
                    });
            }
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Connections;
    use gantry_core::error::ExceptionKind;
    use gantry_core::inputs::{Inputs, Scope};

    #[test]
    fn resolves_builtins() {
        let connections = Connections::new();
        let inputs = Inputs::default();
        let config = CommandConfig {
            connections: &connections,
            inputs: &inputs,
            scope: Scope::empty(),
        };
        let factory = CommandFactory::new();
        for kind in [
            "api-call",
            "redirection",
            "sql-query",
            "authorization-control",
            "args",
            "test",
            "scrape",
        ] {
            assert_eq!(factory.get(kind, config).unwrap().name(), kind);
        }
        let err = factory.get("teleport", config).err().unwrap();
        assert_eq!(err.kind(), ExceptionKind::EpDefinition);
    }
}

//! The command contract.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use gantry_core::error::{Exception, Result};
use gantry_core::inputs::{Inputs, Scope};
use gantry_core::response::{Cookie, Uri};

use crate::sql::Connections;

/// Effects a command asks the executor to apply to the response.
///
/// Commands never touch the response themselves; they describe what should
/// change and the executor applies it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReturn {
    /// Data grafted into the body when the step declares a graft path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Cookies to set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,
    /// Redirect target; stops the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Uri>,
    /// Headers to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Server-sent events to buffer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_sent_events: Option<Vec<String>>,
}

impl CommandReturn {
    /// No effects.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Only `data`.
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Only a redirect.
    pub fn with_redirect(uri: Uri) -> Self {
        Self {
            redirect: Some(uri),
            ..Self::default()
        }
    }
}

/// A boxed future for async command execution.
pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandReturn>> + Send + 'a>>;

/// The unit of work behind a pipeline step.
///
/// # Example
///
/// ```
/// use gantry_commands::{Command, CommandFuture, CommandReturn};
/// use serde_json::Value;
///
/// struct Echo;
///
/// impl Command for Echo {
///     fn name(&self) -> &'static str {
///         "echo"
///     }
///
///     fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
///         Box::pin(async move { Ok(CommandReturn::with_data(args)) })
///     }
/// }
/// ```
pub trait Command: Send + Sync {
    /// Command type name.
    fn name(&self) -> &'static str;

    /// Run with fully expanded arguments.
    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a>;
}

/// What a command may reach while it runs.
#[derive(Debug, Clone, Copy)]
pub struct CommandConfig<'a> {
    /// SQL connection registry.
    pub connections: &'a Connections,
    /// The expression evaluator, for commands resolving further references.
    pub inputs: &'a Inputs,
    /// Request and response in scope.
    pub scope: Scope<'a>,
}

/// Deserialize command arguments, reporting the command on failure.
pub fn parse_args<T: DeserializeOwned>(command: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| {
        Exception::ep_definition(format!("invalid arguments for command [{command}]")).wrap(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_fields() {
        let result: CommandReturn = serde_json::from_value(json!({
            "data": {"ok": true},
            "serverSentEvents": ["ping"],
            "headers": {"x-trace": "1"},
            "cookies": [{"name": "a", "value": "1"}]
        }))
        .unwrap();
        assert_eq!(result.data, Some(json!({"ok": true})));
        assert_eq!(result.server_sent_events, Some(vec!["ping".to_string()]));
        assert_eq!(result.cookies.unwrap()[0].name, "a");
        assert!(result.redirect.is_none());
    }

    #[test]
    fn parse_args_reports_command() {
        #[derive(Debug, Deserialize)]
        struct Args {
            #[allow(dead_code)]
            url: String,
        }
        let err = parse_args::<Args>("redirection", json!({})).unwrap_err();
        assert!(err.details()[0].contains("redirection"));
    }
}

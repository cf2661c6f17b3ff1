use serde::Deserialize;
use serde_json::{Map, Value};

use gantry_core::response::Uri;

use crate::command::{Command, CommandFuture, CommandReturn, parse_args};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedirectionArgs {
    url: String,
    #[serde(default)]
    query_parameters: Map<String, Value>,
}

/// `redirection`: ends the pipeline with a redirect.
pub struct RedirectionCommand;

impl Command for RedirectionCommand {
    fn name(&self) -> &'static str {
        "redirection"
    }

    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
        Box::pin(async move {
            let args: RedirectionArgs = parse_args(self.name(), args)?;
            Ok(CommandReturn::with_redirect(Uri {
                url: args.url,
                query_parameters: args.query_parameters,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn builds_uri() {
        let result = RedirectionCommand
            .run(json!({"url": "https://example.com/done", "queryParameters": {"ok": true}}))
            .await
            .unwrap();
        let uri = result.redirect.unwrap();
        assert_eq!(uri.full(), "https://example.com/done?ok=true");
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn url_is_required() {
        assert!(RedirectionCommand.run(json!({})).await.is_err());
    }
}

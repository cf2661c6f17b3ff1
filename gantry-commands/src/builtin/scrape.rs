use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use gantry_core::error::{Exception, Result};

use crate::command::{Command, CommandFuture, CommandReturn, parse_args};

#[derive(Debug, Deserialize)]
struct ScrapeArgs {
    url: String,
    #[serde(default)]
    patterns: IndexMap<String, String>,
}

/// `scrape`: fetch a page and pick values out of it with regexes.
///
/// Best effort: a page that cannot be fetched yields `null` for every
/// pattern.
pub struct ScrapeCommand {
    http: reqwest::Client,
}

impl ScrapeCommand {
    /// Create the command on a shared client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let outcome = match self.http.get(url).send().await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };
        outcome
            .inspect_err(|e| warn!(%url, error = %e, "scrape fetch failed"))
            .ok()
    }
}

fn compile(patterns: &IndexMap<String, String>) -> Result<Vec<(&str, Regex)>> {
    patterns
        .iter()
        .map(|(name, pattern)| {
            Regex::new(pattern)
                .map(|regex| (name.as_str(), regex))
                .map_err(|e| Exception::ep_definition(format!("invalid scrape pattern [{name}]")).wrap(e))
        })
        .collect()
}

fn extract(page: &str, regex: &Regex) -> Value {
    regex
        .captures(page)
        .and_then(|captures| captures.get(1).or_else(|| captures.get(0)))
        .map(|m| Value::String(m.as_str().to_string()))
        .unwrap_or(Value::Null)
}

impl Command for ScrapeCommand {
    fn name(&self) -> &'static str {
        "scrape"
    }

    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
        Box::pin(async move {
            let args: ScrapeArgs = parse_args(self.name(), args)?;
            let patterns = compile(&args.patterns)?;
            let page = self.fetch(&args.url).await;

            let data: Map<String, Value> = patterns
                .iter()
                .map(|(name, regex)| {
                    let value = page.as_deref().map_or(Value::Null, |p| extract(p, regex));
                    (name.to_string(), value)
                })
                .collect();
            Ok(CommandReturn::with_data(Value::Object(data)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_group_or_whole_match() {
        let page = "<title>Gantry</title> v1.2";
        assert_eq!(extract(page, &Regex::new("<title>(.*?)</title>").unwrap()), json!("Gantry"));
        assert_eq!(extract(page, &Regex::new(r"v\d+\.\d+").unwrap()), json!("v1.2"));
        assert_eq!(extract(page, &Regex::new("absent").unwrap()), Value::Null);
    }

    #[tokio::test]
    async fn invalid_pattern_is_definition_error() {
        let err = ScrapeCommand::new(reqwest::Client::new())
            .run(json!({"url": "http://127.0.0.1:9", "patterns": {"bad": "("}}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), gantry_core::ExceptionKind::EpDefinition);
    }
}

//! Run command - execute one request offline against a configuration.

use anyhow::{Context, Result};
use gantry_core::request::{HttpMethod, Request};
use gantry_executor::EngineConfig;
use serde_json::Value;
use std::path::Path;

/// Request described on the command line.
pub struct RunOptions<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// URL path with optional query string.
    pub path: &'a str,
    /// JSON body.
    pub body: Option<&'a str>,
    /// `name: value` header lines.
    pub headers: &'a [String],
}

/// Run the run command.
pub async fn run(config: &Path, options: RunOptions<'_>) -> Result<()> {
    let engine = EngineConfig::load(config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    let executor = &engine.executor;

    let mut request = build_request(executor.api(), &options)?;
    tracing::info!(method = %request.method(), path = %request.path(), "running request");

    let mut response = match executor.do_request(&mut request).await {
        Ok(response) => response,
        Err(e) => {
            println!("Status: {}", e.http_status());
            println!();
            println!("{}", serde_json::to_string_pretty(&e.to_public_json())?);
            println!();
            println!("Details:");
            for detail in e.details() {
                println!("  - {}", detail);
            }
            anyhow::bail!("request failed with {}", e.code());
        }
    };

    match response.redirection() {
        Some(uri) => println!("Status: 302 -> {}", uri.full()),
        None => println!("Status: {}", response.status_code()),
    }
    if !response.headers().is_empty() {
        println!();
        println!("Headers:");
        for (name, value) in response.headers() {
            println!("  {}: {}", name, value);
        }
    }
    if !response.cookies().is_empty() {
        println!();
        println!("Cookies:");
        for cookie in response.cookies() {
            println!("  {}", cookie.to_header_value());
        }
    }
    let events = response.drain_server_sent_events();
    if request.is_event_source() {
        println!();
        println!("Events (first cycle):");
        for event in &events {
            println!("  {}", event);
        }
    }
    println!();
    println!("{}", serde_json::to_string_pretty(response.body().as_value())?);
    Ok(())
}

fn build_request(
    api: &gantry_core::definition::ApiDefinition,
    options: &RunOptions<'_>,
) -> Result<Request> {
    let method: HttpMethod = options
        .method
        .parse()
        .with_context(|| format!("unsupported method {}", options.method))?;
    let (path, query) = options.path.split_once('?').unwrap_or((options.path, ""));
    let (template, parameters) = api
        .match_path(path)
        .with_context(|| format!("no path matches {}", path))?;

    let mut request = Request::new(method, template).with_path_parameters(parameters);
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query).context("invalid query string")?;
    for (name, value) in pairs {
        request = request.with_query(name, value);
    }
    for header in options.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header must look like 'name: value', got {header}"))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(body) = options.body {
        let body: Value = serde_json::from_str(body).context("body is not valid JSON")?;
        request = request.with_body(body);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::definition::ApiDefinition;
    use serde_json::json;

    fn api() -> ApiDefinition {
        ApiDefinition::from_yaml(
            r#"
paths:
  /users/{id}:
    post: {}
"#,
        )
        .unwrap()
    }

    #[test]
    fn builds_request_from_arguments() {
        let headers = vec!["X-Trace: abc".to_string()];
        let options = RunOptions {
            method: "post",
            path: "/users/42?debug=1&name=a+b",
            body: Some(r#"{"ok": true}"#),
            headers: &headers,
        };
        let request = build_request(&api(), &options).unwrap();

        assert_eq!(request.method(), HttpMethod::Post);
        assert_eq!(request.path(), "/users/{id}");
        assert_eq!(request.path_parameter("id"), Some("42"));
        assert_eq!(request.query_parameter("name"), Some("a b"));
        assert_eq!(request.header("x-trace"), Some("abc"));
        assert_eq!(request.body(), &json!({"ok": true}));
    }

    #[test]
    fn rejects_malformed_arguments() {
        let bad_header = vec!["no-colon".to_string()];
        let options = RunOptions {
            method: "post",
            path: "/users/1",
            body: None,
            headers: &bad_header,
        };
        assert!(build_request(&api(), &options).is_err());

        let options = RunOptions {
            method: "brew",
            path: "/users/1",
            body: None,
            headers: &[],
        };
        assert!(build_request(&api(), &options).is_err());
    }
}

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use gantry_core::error::{Exception, Result};
use gantry_core::value::to_text;

use crate::command::{Command, CommandFuture, CommandReturn, parse_args};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCallArgs {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    query_parameters: Map<String, Value>,
    #[serde(default)]
    json_body: Option<Value>,
    #[serde(default)]
    form_urlencoded: Option<Map<String, Value>>,
}

fn pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), to_text(v))).collect()
}

/// `api-call`: one outbound HTTP request.
///
/// Remote status codes are not interpreted; a JSON response body becomes
/// `data`, anything else yields `null`.
pub struct ApiCallCommand {
    http: reqwest::Client,
}

impl ApiCallCommand {
    /// Create the command on a shared client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn call(&self, args: ApiCallArgs) -> Result<Value> {
        let method_name = args.method.as_deref().unwrap_or("GET").to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|e| {
            Exception::ep_definition(format!("invalid api-call method [{method_name}]")).wrap(e)
        })?;

        let mut request = self.http.request(method, &args.url);
        if !args.query_parameters.is_empty() {
            request = request.query(&pairs(&args.query_parameters));
        }
        for (name, value) in &args.headers {
            request = request.header(name.as_str(), to_text(value));
        }
        if let Some(body) = &args.json_body {
            request = request.json(body);
        } else if let Some(form) = &args.form_urlencoded {
            request = request.form(&pairs(form));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Exception::command(format!("api call to [{}] failed", args.url)).wrap(e))?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        debug!(url = %args.url, status = status.as_u16(), is_json, "api call returned");
        if !is_json {
            return Ok(Value::Null);
        }
        response.json().await.map_err(|e| {
            Exception::command(format!("api call to [{}] returned invalid json", args.url)).wrap(e)
        })
    }
}

impl Command for ApiCallCommand {
    fn name(&self) -> &'static str {
        "api-call"
    }

    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
        Box::pin(async move {
            let args: ApiCallArgs = parse_args(self.name(), args)?;
            Ok(CommandReturn::with_data(self.call(args).await?))
        })
    }
}

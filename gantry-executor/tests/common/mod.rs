//! Common test utilities for executor integration tests.

#![allow(dead_code)]

use gantry_core::definition::{ApiDefinition, EpDefinition};
use gantry_core::error::Result;
use gantry_core::request::{HttpMethod, Request};
use gantry_core::response::Response;
use gantry_executor::Executor;

/// API shape used across the executor tests.
pub const API: &str = r#"
paths:
  /users/{id}:
    get:
      x-backend-engine:
        points:
          - selector: false
            exec-pipe-id: never
          - selector: "{query.debug}"
            exec-pipe-id: user-debug
          - selector: true
            exec-pipe-id: user
  /teapot:
    get:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: teapot
  /login:
    post:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: login
  /ticks:
    get:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: ticks
            eventSource: true
  /files:
    x-all-subpaths: true
    get:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: files
"#;

/// Pipeline library matching [`API`].
pub const PIPELINES: &str = r#"
pipelines:
  never:
    steps:
      - type: args
        args: { reached: true }
        graft: "."
  user-debug:
    steps:
      - type: args
        args: { debug: true, id: "{path.id}" }
        graft: "."
  user:
    steps:
      - description: load the user
        type: args
        args: { id: "{path.id}" }
        graft: user
      - type: args
        disabled: true
        if:
          "{query.enabled}": { is-truthy: true }
          else: { break: { statusCode: 418, message: "disabled step ran" } }
        args: { skipped: true }
        graft: skipped
      - type: args
        args: "hello {current.user.id}"
        graft: message
  teapot:
    steps:
      - type: args
        if:
          "{query.brew}": { is-truthy: true }
          else: { break: { statusCode: 418, message: "I'm a teapot" } }
        args: { brewed: true }
        graft: brewed
      - type: args
        if:
          "{query.stop}": { is: "now" }
          break: true
        args: "stopped"
        graft: stopped
      - type: args
        args: { finished: true }
        graft: finished
  login:
    steps:
      - type: test
        args:
          data: { user: "{json.user}" }
          cookies: [{ name: session, value: "{json.user}" }]
          headers: { x-login: "ok" }
        graft: login
        cookies: { name: theme, value: dark, options: { maxAge: 60000 } }
      - type: redirection
        args: { url: "https://example.com/welcome", queryParameters: { user: "{json.user}" } }
      - type: args
        args: { unreachable: true }
        graft: unreachable
  ticks:
    steps:
      - type: test
        args: { serverSentEvents: ["event: tick", "data: {query.n}"] }
  files:
    steps:
      - type: args
        args: { subpath: "{path.subpath}" }
        graft: "."
"#;

/// Parse the shared definitions.
pub fn definitions() -> (ApiDefinition, EpDefinition) {
    let api = ApiDefinition::from_yaml(API).unwrap();
    let pipelines = EpDefinition::from_yaml(PIPELINES).unwrap();
    pipelines.validate(&api).unwrap();
    (api, pipelines)
}

/// An executor over the shared definitions.
pub fn executor() -> Executor {
    let (api, pipelines) = definitions();
    Executor::new(api, pipelines)
}

/// A request for a matched template.
pub fn request(method: HttpMethod, template: &str) -> Request {
    Request::new(method, template)
}

/// Run `request` and return the response.
pub async fn run(executor: &Executor, mut request: Request) -> Result<Response> {
    executor.do_request(&mut request).await
}

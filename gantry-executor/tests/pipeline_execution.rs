//! Pipeline execution tests.
//!
//! Run whole pipelines through the executor and check the resulting
//! response: grafts, conditions, cookies, redirects and event buffering.

mod common;

use common::{executor, request, run};
use gantry_commands::sql::{Connections, MemoryDriver, ResultSet, ResultSets, SqlConnection};
use gantry_commands::{
    Command, CommandConfig, CommandFactory, CommandFuture, CommandProvider, CommandReturn,
};
use gantry_core::definition::{ApiDefinition, EpDefinition};
use gantry_core::error::ExceptionKind;
use gantry_core::request::HttpMethod;
use gantry_core::response::Uri;
use gantry_executor::Executor;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_steps_graft_and_read_current() {
    let executor = executor();
    let response = run(
        &executor,
        request(HttpMethod::Get, "/users/{id}").with_path_parameter("id", "42"),
    )
    .await
    .unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.body().as_value(),
        &json!({"user": {"id": "42"}, "message": "hello 42"})
    );
}

#[tokio::test]
async fn test_disabled_step_ignores_its_condition() {
    let executor = executor();
    let response = run(
        &executor,
        request(HttpMethod::Get, "/users/{id}").with_path_parameter("id", "8"),
    )
    .await
    .unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.body().get("skipped"), None);
    assert_eq!(response.body().get("message"), Some(&json!("hello 8")));
}

#[tokio::test]
async fn test_first_selected_endpoint_wins() {
    let executor = executor();
    let debug = request(HttpMethod::Get, "/users/{id}")
        .with_path_parameter("id", "7")
        .with_query("debug", "1");
    let response = run(&executor, debug).await.unwrap();
    assert_eq!(response.body().as_value(), &json!({"debug": true, "id": "7"}));

    let falsy = request(HttpMethod::Get, "/users/{id}")
        .with_path_parameter("id", "7")
        .with_query("debug", "");
    let response = run(&executor, falsy).await.unwrap();
    assert_eq!(response.body().get("user.id"), Some(&json!("7")));
}

#[tokio::test]
async fn test_else_break_sets_status_and_body() {
    let executor = executor();
    let response = run(&executor, request(HttpMethod::Get, "/teapot"))
        .await
        .unwrap();

    assert_eq!(response.status_code(), 418);
    assert_eq!(
        response.body().as_value(),
        &json!({"errors": [{"message": "I'm a teapot"}]})
    );
}

#[tokio::test]
async fn test_inactive_steps_are_skipped() {
    let executor = executor();
    let brew = request(HttpMethod::Get, "/teapot").with_query("brew", "yes");
    let response = run(&executor, brew).await.unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.body().as_value(),
        &json!({"brewed": {"brewed": true}, "finished": {"finished": true}})
    );
}

#[tokio::test]
async fn test_break_stops_after_active_step() {
    let executor = executor();
    let stop = request(HttpMethod::Get, "/teapot")
        .with_query("brew", "yes")
        .with_query("stop", "now");
    let response = run(&executor, stop).await.unwrap();

    assert_eq!(response.body().get("stopped"), Some(&json!("stopped")));
    assert_eq!(response.body().get("finished"), None);
}

#[tokio::test]
async fn test_cookies_headers_and_redirect() {
    let executor = executor();
    let login = request(HttpMethod::Post, "/login").with_body(json!({"user": "ann"}));
    let response = run(&executor, login).await.unwrap();

    let names: Vec<&str> = response.cookies().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["session", "theme"]);
    assert_eq!(response.cookies()[0].value, json!("ann"));
    assert_eq!(response.cookies()[1].options.max_age, Some(60_000));
    assert_eq!(response.headers().get("x-login").map(String::as_str), Some("ok"));

    let redirect = response.redirection().unwrap();
    assert_eq!(redirect.full(), "https://example.com/welcome?user=ann");
    assert_eq!(response.body().get("login.user"), Some(&json!("ann")));
    assert_eq!(response.body().get("unreachable"), None);
}

#[tokio::test]
async fn test_event_source_buffers_events() {
    let executor = executor();
    let mut ticks = request(HttpMethod::Get, "/ticks").with_query("n", "3");
    let mut response = executor.do_request(&mut ticks).await.unwrap();

    assert!(ticks.is_event_source());
    assert_eq!(
        response.drain_server_sent_events(),
        vec!["event: tick".to_string(), "data: 3".to_string()]
    );
    assert!(response.server_sent_events().is_empty());
}

#[tokio::test]
async fn test_subpath_parameter() {
    let executor = executor();
    let (template, parameters) = executor.api().match_path("/files/docs/a.md").unwrap();
    let files = request(HttpMethod::Get, template).with_path_parameters(parameters);
    let response = run(&executor, files).await.unwrap();
    assert_eq!(response.body().as_value(), &json!({"subpath": "docs/a.md"}));
}

#[tokio::test]
async fn test_routing_failures_are_not_found() {
    let executor = executor();

    let err = run(&executor, request(HttpMethod::Delete, "/teapot"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::NotFound);

    let err = run(&executor, request(HttpMethod::Get, "/nowhere"))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_unknown_command_is_definition_error() {
    let api = ApiDefinition::from_yaml(
        r#"
paths:
  /broken:
    get:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: broken
"#,
    )
    .unwrap();
    let pipelines = EpDefinition::from_yaml(
        r#"
pipelines:
  broken:
    steps:
      - type: teleport
"#,
    )
    .unwrap();
    let executor = Executor::new(api, pipelines);

    let err = run(&executor, request(HttpMethod::Get, "/broken"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::EpDefinition);
    assert_eq!(err.http_status(), 500);
    assert_eq!(err.to_public_json()["errors"][0]["message"], "Sorry, system error");
}

struct Bounce;

impl Command for Bounce {
    fn name(&self) -> &'static str {
        "bounce"
    }

    fn run<'a>(&'a self, _args: Value) -> CommandFuture<'a> {
        Box::pin(async move {
            Ok(CommandReturn::with_redirect(
                Uri::new("https://example.com/users/{path.id}").with_query("state", "{query.state}"),
            ))
        })
    }
}

struct BounceProvider;

impl CommandProvider for BounceProvider {
    fn create<'a>(&self, kind: &str, _config: CommandConfig<'a>) -> Option<Box<dyn Command + 'a>> {
        (kind == "bounce").then(|| Box::new(Bounce) as Box<dyn Command + 'a>)
    }
}

#[tokio::test]
async fn test_redirect_templates_expand_after_pipeline() {
    let api = ApiDefinition::from_yaml(
        r#"
paths:
  /go/{id}:
    get:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: go
"#,
    )
    .unwrap();
    let pipelines = EpDefinition::from_yaml(
        r#"
pipelines:
  go:
    steps:
      - type: bounce
"#,
    )
    .unwrap();
    let executor = Executor::new(api, pipelines)
        .with_commands(CommandFactory::new().with_provider(Arc::new(BounceProvider)));

    let go = request(HttpMethod::Get, "/go/{id}")
        .with_path_parameter("id", "5")
        .with_query("state", "xyz");
    let response = run(&executor, go).await.unwrap();
    assert_eq!(
        response.redirection().unwrap().full(),
        "https://example.com/users/5?state=xyz"
    );
}

#[tokio::test]
async fn test_sql_query_step_grafts_rows() {
    let api = ApiDefinition::from_yaml(
        r#"
paths:
  /orders/{user}:
    get:
      x-backend-engine:
        points:
          - selector: true
            exec-pipe-id: orders
"#,
    )
    .unwrap();
    let pipelines = EpDefinition::from_yaml(
        r#"
pipelines:
  orders:
    steps:
      - type: sql-query
        args: { connection: main, queryId: list-orders, args: ["{path.user}"] }
        graft: orders
      - type: args
        if:
          "{current.orders._0.0}": { is-truthy: true }
          else: { break: { statusCode: 404, message: "no orders" } }
        args: "{current.orders._0.0.id}"
        graft: first
"#,
    )
    .unwrap();
    let queries = serde_json::from_value(json!({
        "list-orders": {
            "query": "select id from orders where user_id = ?1",
            "return": {"resultsets": [{"expect": "multiple"}]}
        }
    }))
    .unwrap();
    let driver = MemoryDriver::new();
    let connections = Connections::new().with(SqlConnection::new(
        "main",
        Arc::new(driver.clone()),
        queries,
    ));
    let executor = Executor::new(api, pipelines).with_connections(connections);

    let rows = vec![
        json!({"id": 10}).as_object().cloned().unwrap(),
        json!({"id": 11}).as_object().cloned().unwrap(),
    ];
    driver.push_response(Ok(ResultSets::new(vec![ResultSet::Rows(rows)])));
    let orders = request(HttpMethod::Get, "/orders/{user}").with_path_parameter("user", "3");
    let response = run(&executor, orders).await.unwrap();
    assert_eq!(
        response.body().as_value(),
        &json!({"orders": {"_0": [{"id": 10}, {"id": 11}]}, "first": 10})
    );
    assert_eq!(driver.executed()[0].1, vec![json!("3")]);

    driver.push_response(Ok(ResultSets::new(vec![ResultSet::Rows(vec![])])));
    let orders = request(HttpMethod::Get, "/orders/{user}").with_path_parameter("user", "4");
    let response = run(&executor, orders).await.unwrap();
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let executor = executor();
    let requests: Vec<_> = (0..8)
        .map(|i| {
            let executor = executor.clone();
            tokio::spawn(async move {
                let user = request(HttpMethod::Get, "/users/{id}")
                    .with_path_parameter("id", i.to_string());
                run(&executor, user).await.unwrap()
            })
        })
        .collect();

    let mut seen = HashMap::new();
    for (i, handle) in requests.into_iter().enumerate() {
        let response = handle.await.unwrap();
        seen.insert(i, response.body().get("message").cloned());
    }
    for (i, message) in seen {
        assert_eq!(message, Some(json!(format!("hello {i}"))));
    }
}

//! Integration tests for the `sql-query` command over the scripted driver.

mod common;

use common::{connections, rows, run_command};
use gantry_commands::CommandFactory;
use gantry_commands::sql::{MemoryDriver, ResultSet, ResultSets, SqlError};
use gantry_core::ExceptionKind;
use gantry_core::error::SYSTEM_ERROR_MESSAGE;
use serde_json::json;

#[tokio::test]
async fn test_one_row_result_under_index_key() {
    let driver = MemoryDriver::new().respond(Ok(rows(vec![json!({"id": 7})])));
    let connections = connections(&driver);

    let result = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "create-order", "args": [3, 9.5]}),
    )
    .await
    .unwrap();

    assert_eq!(result.data, Some(json!({"_0": {"id": 7}})));
    let executed = driver.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].0.starts_with("insert into orders"));
    assert_eq!(executed[0].1, vec![json!(3), json!(9.5)]);
}

#[tokio::test]
async fn test_multiple_result_sets() {
    let driver = MemoryDriver::new().respond(Ok(ResultSets::new(vec![
        ResultSet::Rows(vec![
            common::row(json!({"id": 1, "total": 10})),
            common::row(json!({"id": 2, "total": 20})),
        ]),
        ResultSet::Rows(vec![]),
    ])));
    let connections = connections(&driver);

    let result = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "list-orders", "args": [3]}),
    )
    .await
    .unwrap();

    assert_eq!(
        result.data,
        Some(json!({
            "_0": [{"id": 1, "total": 10}, {"id": 2, "total": 20}],
            "_1": null
        }))
    );
}

#[tokio::test]
async fn test_mapped_constraint_is_user_error() {
    let driver = MemoryDriver::new().respond(Err(SqlError::Constraint {
        name: "orders_user_id_fkey".into(),
        message: "insert violates foreign key constraint \"orders_user_id_fkey\"".into(),
    }));
    let connections = connections(&driver);

    let err = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "create-order", "args": [404, 1]}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ExceptionKind::User);
    assert_eq!(err.http_status(), 400);
    assert_eq!(err.public_messages(), vec!["no such user"]);
}

#[tokio::test]
async fn test_unmapped_constraint_is_system_error() {
    let driver = MemoryDriver::new().respond(Err(SqlError::Constraint {
        name: "orders_total_check".into(),
        message: "new row violates check constraint \"orders_total_check\"".into(),
    }));
    let connections = connections(&driver);

    let err = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "create-order", "args": [1, -1]}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ExceptionKind::Sql);
    assert_eq!(err.http_status(), 500);
    assert_eq!(err.public_messages(), vec![SYSTEM_ERROR_MESSAGE]);
    assert!(err.details().iter().any(|d| d.contains("orders_total_check")));
}

#[tokio::test]
async fn test_failed_result_set_uses_failure_table() {
    let driver = MemoryDriver::new().respond(Ok(ResultSets::new(vec![ResultSet::Failed {
        constraint: "orders_user_id_fkey".into(),
    }])));
    let connections = connections(&driver);

    let err = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "create-order", "args": [1, 1]}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_messages(), vec!["no such user"]);
}

#[tokio::test]
async fn test_failure_in_undeclared_result_set() {
    let driver = MemoryDriver::new().respond(Ok(ResultSets::new(vec![ResultSet::Failed {
        constraint: "orders_user_id_fkey".into(),
    }])));
    let connections = connections(&driver);

    let err = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "delete-user", "args": [3]}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::User);
    assert_eq!(err.public_messages(), vec!["user has orders"]);

    let driver = MemoryDriver::new().respond(Ok(ResultSets::new(vec![
        ResultSet::Rows(vec![common::row(json!({"id": 1}))]),
        ResultSet::Failed {
            constraint: "orders_user_id_fkey".into(),
        },
    ])));
    let connections = common::connections(&driver);

    let err = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "create-order", "args": [404, 1]}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::User);
    assert_eq!(err.public_messages(), vec!["no such user"]);
}

#[tokio::test]
async fn test_undeclared_result_sets_are_not_grafted() {
    let driver = MemoryDriver::new().respond(Ok(rows(vec![json!({"deleted": 1})])));
    let connections = connections(&driver);

    let result = run_command(
        &CommandFactory::new(),
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "delete-user", "args": [3]}),
    )
    .await
    .unwrap();
    assert_eq!(result.data, Some(json!({})));
}

#[tokio::test]
async fn test_unknown_connection_or_query() {
    let connections = connections(&MemoryDriver::new());
    let factory = CommandFactory::new();

    let err = run_command(
        &factory,
        &connections,
        "sql-query",
        json!({"connection": "replica", "queryId": "create-order"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Sql);

    let err = run_command(
        &factory,
        &connections,
        "sql-query",
        json!({"connection": "main", "queryId": "drop-everything"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Sql);
}

#[tokio::test]
async fn test_reconnects_once_connection_drops() {
    let driver = MemoryDriver::new()
        .respond(Ok(rows(vec![json!({"id": 1})])))
        .respond(Err(SqlError::ConnectionLost("server closed the connection".into())))
        .respond(Ok(rows(vec![json!({"id": 2})])));
    let connections = connections(&driver);
    let factory = CommandFactory::new();
    let args = json!({"connection": "main", "queryId": "create-order", "args": [1, 1]});

    let first = run_command(&factory, &connections, "sql-query", args.clone())
        .await
        .unwrap();
    let second = run_command(&factory, &connections, "sql-query", args)
        .await
        .unwrap();

    assert_eq!(first.data, Some(json!({"_0": {"id": 1}})));
    assert_eq!(second.data, Some(json!({"_0": {"id": 2}})));
    assert_eq!(driver.connect_count(), 2);
    assert_eq!(driver.executed().len(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_share_registry() {
    let driver = MemoryDriver::new();
    let connections = connections(&driver);
    let factory = CommandFactory::new();
    let args = json!({"connection": "main", "queryId": "list-orders", "args": [1]});

    let (a, b) = tokio::join!(
        run_command(&factory, &connections, "sql-query", args.clone()),
        run_command(&factory, &connections, "sql-query", args.clone()),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(driver.executed().len(), 2);
}

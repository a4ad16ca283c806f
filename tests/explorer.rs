mod common;

use std::time::Duration;

use dbexplorer::{CellValue, ColumnKind, Dialect, Explorer, ExplorerError, Page, Payload, Row};

fn record(payload: Payload) -> Row {
    match payload {
        Payload::Record(row) => row,
        other => panic!("expected a record, got {other:?}"),
    }
}

fn records(payload: Payload) -> Vec<Row> {
    match payload {
        Payload::Records(rows) => rows,
        other => panic!("expected records, got {other:?}"),
    }
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[tokio::test]
async fn discovers_tables_and_columns() {
    let explorer = common::explorer().await;
    let catalog = explorer.catalog();

    assert_eq!(catalog.dialect(), Dialect::Sqlite);
    assert_eq!(catalog.table_names(), ["items", "log", "readings", "users"]);

    let users = catalog.describe("users").unwrap();
    assert_eq!(users.primary_key().unwrap().name, "user_id");
    let names: Vec<_> = users.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["user_id", "login", "password", "email", "info", "updated"]);
    assert!(!users.column("login").unwrap().nullable);
    assert!(users.column("updated").unwrap().nullable);
    assert_eq!(users.column("info").unwrap().kind, ColumnKind::Text);
    assert_eq!(users.column("user_id").unwrap().kind, ColumnKind::Integer);

    let readings = catalog.describe("readings").unwrap();
    assert_eq!(readings.column("level").unwrap().kind, ColumnKind::Other);

    assert!(catalog.describe("log").unwrap().primary_key().is_none());
    assert!(!catalog.exists("sqlite_sequence"));
}

#[tokio::test]
async fn table_listing_is_stable() {
    let explorer = common::explorer().await;
    let first = explorer.list_tables();
    let second = explorer.list_tables();
    assert_eq!(first, second);
    assert_eq!(
        first,
        Payload::Tables(vec![
            "items".into(),
            "log".into(),
            "readings".into(),
            "users".into()
        ])
    );
}

#[tokio::test]
async fn lists_records_with_pagination() {
    let explorer = common::explorer().await;
    for i in 0..6 {
        let body = format!(r#"{{"title": "extra {i}", "description": "d"}}"#);
        explorer.create_record("items", body.as_bytes()).await.unwrap();
    }

    let rows = records(explorer.list_records("items", Page::default()).await.unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].get("id"), Some(&CellValue::Integer(1)));
    assert_eq!(rows[0].get("title"), Some(&text("database/sql")));
    assert_eq!(rows[1].get("updated"), Some(&CellValue::Null));

    let fallback = Page::from_query(Some("abc"), None);
    let rows = records(explorer.list_records("items", fallback).await.unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].get("id"), Some(&CellValue::Integer(1)));

    let page = Page::from_query(Some("2"), Some("3"));
    let rows = records(explorer.list_records("items", page).await.unwrap());
    let ids: Vec<_> = rows.iter().map(|r| r.get("id").cloned()).collect();
    assert_eq!(ids, [Some(CellValue::Integer(4)), Some(CellValue::Integer(5))]);
}

#[tokio::test]
async fn rows_keep_column_order() {
    let explorer = common::explorer().await;
    let row = record(explorer.get_record("users", "1").await.unwrap());
    let columns: Vec<_> = row.columns().collect();
    assert_eq!(columns, ["user_id", "login", "password", "email", "info", "updated"]);
}

#[tokio::test]
async fn get_delete_get() {
    let explorer = common::explorer().await;

    let row = record(explorer.get_record("items", "1").await.unwrap());
    assert_eq!(row.get("title"), Some(&text("database/sql")));

    assert_eq!(explorer.delete_record("items", "1").await.unwrap(), Payload::Deleted(1));
    assert!(matches!(
        explorer.get_record("items", "1").await,
        Err(ExplorerError::RecordNotFound)
    ));
    assert_eq!(explorer.delete_record("items", "1").await.unwrap(), Payload::Deleted(0));
}

#[tokio::test]
async fn missing_record() {
    let explorer = common::explorer().await;
    assert!(matches!(
        explorer.get_record("items", "100500").await,
        Err(ExplorerError::RecordNotFound)
    ));
    assert!(matches!(
        explorer.get_record("items", "not-a-number").await,
        Err(ExplorerError::RecordNotFound)
    ));
}

#[tokio::test]
async fn create_fills_missing_not_null_text_with_empty_string() {
    let explorer = common::explorer().await;

    let created = explorer
        .create_record("items", br#"{"title": "db_crud"}"#)
        .await
        .unwrap();
    assert_eq!(created, Payload::Created { key: "id".into(), id: 3 });

    let row = record(explorer.get_record("items", "3").await.unwrap());
    assert_eq!(row.get("title"), Some(&text("db_crud")));
    assert_eq!(row.get("description"), Some(&text("")));
    assert_eq!(row.get("updated"), Some(&CellValue::Null));
}

#[tokio::test]
async fn create_reports_generated_ids() {
    let explorer = common::explorer().await;

    for expected in [3, 4, 5] {
        let created = explorer
            .create_record("items", br#"{"title": "t", "description": "d"}"#)
            .await
            .unwrap();
        assert_eq!(created, Payload::Created { key: "id".into(), id: expected });
    }

    // a keyless table still reports the engine's row id
    for expected in [1, 2] {
        let created = explorer.create_record("log", br#"{"line": "x"}"#).await.unwrap();
        assert_eq!(created, Payload::Created { key: "id".into(), id: expected });
    }
}

#[tokio::test]
async fn create_ignores_client_key_and_unknown_fields() {
    let explorer = common::explorer().await;

    let created = explorer
        .create_record(
            "users",
            br#"{"user_id": 42, "login": "ann", "password": "x", "email": "a@b.c", "info": "", "unknown_field": 1}"#,
        )
        .await
        .unwrap();
    assert_eq!(created, Payload::Created { key: "user_id".into(), id: 2 });
    assert!(matches!(
        explorer.get_record("users", "42").await,
        Err(ExplorerError::RecordNotFound)
    ));
}

#[tokio::test]
async fn create_rejects_wrong_types() {
    let explorer = common::explorer().await;

    let err = explorer
        .create_record("items", br#"{"title": 42}"#)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "field title have invalid type");

    let err = explorer
        .create_record("items", br#"{"title": "ok", "description": null}"#)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "field description have invalid type");

    // the empty-string default does not satisfy an integer column
    let err = explorer.create_record("readings", br#"{}"#).await.unwrap_err();
    assert_eq!(err.to_string(), "field sensor have invalid type");

    let rows = records(explorer.list_records("items", Page::default()).await.unwrap());
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn create_passes_unconstrained_types_through() {
    let explorer = common::explorer().await;
    let created = explorer
        .create_record("readings", br#"{"level": 3.5, "sensor": 7.0}"#)
        .await
        .unwrap();
    assert_eq!(created, Payload::Created { key: "id".into(), id: 1 });

    let row = record(explorer.get_record("readings", "1").await.unwrap());
    assert_eq!(row.get("level"), Some(&CellValue::Float(3.5)));
    assert_eq!(row.get("sensor"), Some(&CellValue::Integer(7)));
}

#[tokio::test]
async fn create_rejects_malformed_body() {
    let explorer = common::explorer().await;
    for body in [&b"{"[..], b"[1]", b""] {
        assert!(matches!(
            explorer.create_record("items", body).await,
            Err(ExplorerError::MalformedBody(_))
        ));
    }
}

#[tokio::test]
async fn update_changes_only_supplied_columns() {
    let explorer = common::explorer().await;

    let updated = explorer
        .update_record("items", "1", br#"{"title": "new title", "updated": null}"#)
        .await
        .unwrap();
    assert_eq!(updated, Payload::Updated(1));

    let row = record(explorer.get_record("items", "1").await.unwrap());
    assert_eq!(row.get("title"), Some(&text("new title")));
    assert_eq!(row.get("description"), Some(&text("Рассказать про базы данных")));
    assert_eq!(row.get("updated"), Some(&CellValue::Null));
}

#[tokio::test]
async fn update_rejects_primary_key_before_anything_else() {
    let explorer = common::explorer().await;

    let err = explorer
        .update_record("items", "1", br#"{"id": 5}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::PrimaryKeyImmutable(ref k) if k == "id"));
    assert_eq!(err.to_string(), "field id have invalid type");

    // still the key error even though `title` is invalid too
    let err = explorer
        .update_record("items", "1", br#"{"title": 1, "id": 5}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::PrimaryKeyImmutable(_)));

    let row = record(explorer.get_record("items", "1").await.unwrap());
    assert_eq!(row.get("title"), Some(&text("database/sql")));
}

#[tokio::test]
async fn update_validates_fields() {
    let explorer = common::explorer().await;

    let err = explorer
        .update_record("items", "1", br#"{"title": 42}"#)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "field title have invalid type");

    let err = explorer
        .update_record("items", "1", br#"{"description": null}"#)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "field description have invalid type");
}

#[tokio::test]
async fn update_without_recognised_columns_is_a_no_op() {
    let explorer = common::explorer().await;

    let updated = explorer
        .update_record("items", "1", br#"{"nonexistent": "x"}"#)
        .await
        .unwrap();
    assert_eq!(updated, Payload::Updated(0));

    let updated = explorer.update_record("items", "1", b"{}").await.unwrap();
    assert_eq!(updated, Payload::Updated(0));

    let updated = explorer
        .update_record("items", "999", br#"{"title": "ghost"}"#)
        .await
        .unwrap();
    assert_eq!(updated, Payload::Updated(0));
}

#[tokio::test]
async fn unknown_table_everywhere() {
    let explorer = common::explorer().await;
    let results = [
        explorer.list_records("nope", Page::default()).await,
        explorer.get_record("nope", "1").await,
        explorer.create_record("nope", b"{}").await,
        explorer.update_record("nope", "1", b"{}").await,
        explorer.delete_record("nope", "1").await,
    ];
    for result in results {
        assert!(matches!(result, Err(ExplorerError::UnknownTable)));
    }
}

#[tokio::test]
async fn unknown_table_wins_over_malformed_body() {
    let explorer = common::explorer().await;
    assert!(matches!(
        explorer.create_record("nope", b"{").await,
        Err(ExplorerError::UnknownTable)
    ));
}

#[tokio::test]
async fn keyless_tables_degrade() {
    let explorer = common::explorer().await;

    let created = explorer
        .create_record("log", br#"{"line": "started"}"#)
        .await
        .unwrap();
    assert!(matches!(created, Payload::Created { ref key, .. } if key == "id"));

    let rows = records(explorer.list_records("log", Page::default()).await.unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("line"), Some(&text("started")));

    assert!(matches!(
        explorer.get_record("log", "1").await,
        Err(ExplorerError::RecordNotFound)
    ));
    assert_eq!(
        explorer.update_record("log", "1", br#"{"line": "x"}"#).await.unwrap(),
        Payload::Updated(0)
    );
    assert_eq!(explorer.delete_record("log", "1").await.unwrap(), Payload::Deleted(0));
}

#[tokio::test]
async fn expired_deadline_is_a_database_error() {
    let explorer = common::explorer()
        .await
        .with_query_timeout(Some(Duration::from_millis(50)));

    // the fixture pool has one connection; holding it makes every query wait
    let held = explorer.pool().acquire().await.unwrap();

    let err = explorer
        .list_records("items", Page::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::DeadlineExceeded));
    assert_eq!(err.to_string(), "db error");

    let err = explorer
        .create_record("items", br#"{"title": "late"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::DeadlineExceeded));

    drop(held);
    let rows = records(explorer.list_records("items", Page::default()).await.unwrap());
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn discovery_failure_is_fatal() {
    let pool = common::memory_pool().await;
    pool.close().await;
    let result = Explorer::from_pool(pool, Dialect::Sqlite).await;
    assert!(matches!(result, Err(ExplorerError::Discovery(_))));
}

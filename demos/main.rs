use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use dbexplorer::*;
use sqlx::any::AnyPoolOptions;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("dbexplorer=debug").init();

    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NULL
        )",
    )
    .execute(&pool)
    .await?;

    let explorer = Explorer::from_pool(pool, Dialect::Sqlite).await?;
    let dispatcher = Dispatcher::new(Arc::new(explorer));

    let requests: [(Method, &str, &str); 6] = [
        (Method::GET, "/", ""),
        (Method::PUT, "/users", r#"{"name": "Ada", "email": "ada@mail.com"}"#),
        (Method::GET, "/users/1", ""),
        (Method::POST, "/users/1", r#"{"id": 5}"#),
        (Method::DELETE, "/users/1", ""),
        (Method::GET, "/users/1", ""),
    ];

    for (method, path, body) in &requests {
        let reply = dispatcher
            .dispatch(Request {
                method,
                path,
                query: &[],
                body: body.as_bytes(),
            })
            .await;
        println!(
            "{} {} -> {} {}",
            method,
            path,
            reply.status.as_u16(),
            serde_json::to_string(&reply.envelope)?
        );
    }

    Ok(())
}

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dbexplorer::{Dialect, Dispatcher, Explorer};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

const SCHEMA: &[&str] = &[
    "CREATE TABLE items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title VARCHAR(255) NOT NULL,
        description TEXT NOT NULL,
        updated VARCHAR(255) NULL
    )",
    "CREATE TABLE users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        login VARCHAR(255) NOT NULL,
        password VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        info TEXT NOT NULL,
        updated VARCHAR(255) NULL
    )",
    "CREATE TABLE readings (
        id INTEGER PRIMARY KEY,
        level REAL NULL,
        sensor INTEGER NOT NULL
    )",
    "CREATE TABLE log (line TEXT NULL)",
];

const SEED: &[&str] = &[
    "INSERT INTO items (title, description, updated) VALUES
        ('database/sql', 'Рассказать про базы данных', 'rvasily'),
        ('memcache', 'Рассказать про мемкеш с примером использования', NULL)",
    "INSERT INTO users (login, password, email, info, updated) VALUES
        ('rvasily', 'love', 'rvasily@example.com', 'none', NULL)",
];

/// Single-connection in-memory SQLite; more connections would each see an
/// empty database.
pub async fn memory_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite")
}

pub async fn seeded_pool() -> AnyPool {
    let pool = memory_pool().await;
    for sql in SCHEMA.iter().chain(SEED) {
        sqlx::query(sql).execute(&pool).await.expect(sql);
    }
    pool
}

pub async fn explorer() -> Explorer {
    Explorer::from_pool(seeded_pool().await, Dialect::Sqlite)
        .await
        .expect("discover schema")
}

pub async fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(explorer().await))
}

use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::libs::error::{ExplorerError, Result};
use crate::libs::row::text_at;
use crate::libs::schema::ColumnSchema;

/// The engines whose catalogs we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split_once(':').map(|(s, _)| s).unwrap_or(url);
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(ExplorerError::UnsupportedDatabase(other.to_string())),
        }
    }

    /// Quotes an identifier that already came out of the catalog.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Insert statement for a table with no writable columns.
    pub fn empty_insert(&self, quoted_table: &str) -> String {
        match self {
            Dialect::MySql => format!("INSERT INTO {} () VALUES ()", quoted_table),
            Dialect::Sqlite => format!("INSERT INTO {} DEFAULT VALUES", quoted_table),
        }
    }

    pub fn introspector(&self) -> Box<dyn Introspector> {
        match self {
            Dialect::MySql => Box::new(MySqlIntrospector),
            Dialect::Sqlite => Box::new(SqliteIntrospector),
        }
    }
}

/// Reads table names and column metadata from a live database.
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn table_names(&self, pool: &AnyPool) -> sqlx::Result<Vec<String>>;

    async fn columns(&self, pool: &AnyPool, table: &str) -> sqlx::Result<Vec<ColumnSchema>>;
}

pub struct MySqlIntrospector;

#[async_trait]
impl Introspector for MySqlIntrospector {
    async fn table_names(&self, pool: &AnyPool) -> sqlx::Result<Vec<String>> {
        let rows = sqlx::query("SHOW TABLES").fetch_all(pool).await?;
        rows.iter().map(|r| text_at(r, 0)).collect()
    }

    async fn columns(&self, pool: &AnyPool, table: &str) -> sqlx::Result<Vec<ColumnSchema>> {
        let sql = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_KEY \
                   FROM information_schema.COLUMNS \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   ORDER BY ORDINAL_POSITION";
        let rows = sqlx::query(sql).bind(table.to_string()).fetch_all(pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for r in rows {
            let name = text_at(&r, 0)?;
            let sql_type = text_at(&r, 1)?;
            let nullable = text_at(&r, 2)? == "YES";
            let primary = text_at(&r, 3)? == "PRI";
            columns.push(ColumnSchema::new(name, sql_type, nullable, primary));
        }
        Ok(columns)
    }
}

pub struct SqliteIntrospector;

#[async_trait]
impl Introspector for SqliteIntrospector {
    async fn table_names(&self, pool: &AnyPool) -> sqlx::Result<Vec<String>> {
        let sql = "SELECT name FROM sqlite_master \
                   WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                   ORDER BY name";
        let rows = sqlx::query(sql).fetch_all(pool).await?;
        rows.iter().map(|r| text_at(r, 0)).collect()
    }

    async fn columns(&self, pool: &AnyPool, table: &str) -> sqlx::Result<Vec<ColumnSchema>> {
        let sql = "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?) ORDER BY cid";
        let rows = sqlx::query(sql).bind(table.to_string()).fetch_all(pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for r in rows {
            let name = text_at(&r, 0)?;
            let sql_type = text_at(&r, 1)?;
            let not_null: i64 = r.try_get(2)?;
            let pk: i64 = r.try_get(3)?;
            columns.push(ColumnSchema::new(name, sql_type, not_null == 0, pk > 0));
        }
        Ok(columns)
    }
}

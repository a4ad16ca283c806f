use std::future::Future;
use std::time::Duration;

use sqlx::AnyPool;
use sqlx::any::{AnyPoolOptions, AnyQueryResult};
use tracing::{debug, info, warn};

use crate::libs::error::{ExplorerError, Result};
use crate::libs::introspect::Dialect;
use crate::libs::query_builder::{Page, QueryBuilder, Statement};
use crate::libs::row::{Row, decode};
use crate::libs::schema::Catalog;
use crate::libs::value::{FieldValue, decode_fields, validate};

/// Key used in the create response when a table has no primary key.
const FALLBACK_KEY: &str = "id";

/// Scoped to the connection that ran the insert.
const LAST_ROWID: &str = "SELECT last_insert_rowid()";

/// Successful result of one of the six operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Tables(Vec<String>),
    Records(Vec<Row>),
    Record(Row),
    Created { key: String, id: i64 },
    Updated(u64),
    Deleted(u64),
}

/// Generic CRUD over every table in the catalog.
pub struct Explorer {
    pool: AnyPool,
    catalog: Catalog,
    query_timeout: Option<Duration>,
}

impl Explorer {
    pub fn new(pool: AnyPool, catalog: Catalog) -> Self {
        Self {
            pool,
            catalog,
            query_timeout: None,
        }
    }

    /// Opens a pool for `database_url` and discovers its schema.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let dialect = Dialect::from_url(database_url)?;
        sqlx::any::install_default_drivers();

        info!(?dialect, max_connections, "connecting to database");
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(ExplorerError::Connect)?;

        Self::from_pool(pool, dialect).await
    }

    pub async fn from_pool(pool: AnyPool, dialect: Dialect) -> Result<Self> {
        let catalog = Catalog::discover(&pool, dialect).await?;
        Ok(Self::new(pool, catalog))
    }

    /// Deadline applied to every database round-trip.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    // -------- Operations --------

    pub fn list_tables(&self) -> Payload {
        Payload::Tables(
            self.catalog
                .table_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }

    pub async fn list_records(&self, table: &str, page: Page) -> Result<Payload> {
        let builder = QueryBuilder::new(&self.catalog, table)?;
        let rows = self.fetch_all(&builder.select_page(page)).await?;
        Ok(Payload::Records(rows))
    }

    pub async fn get_record(&self, table: &str, id: &str) -> Result<Payload> {
        let builder = QueryBuilder::new(&self.catalog, table)?;
        let stmt = builder.select_by_key(id).ok_or(ExplorerError::RecordNotFound)?;
        self.fetch_optional(&stmt)
            .await?
            .map(Payload::Record)
            .ok_or(ExplorerError::RecordNotFound)
    }

    /// Inserts one row. Every writable column is written: missing nullable
    /// columns as NULL, missing NOT NULL columns as an empty string.
    pub async fn create_record(&self, table: &str, body: &[u8]) -> Result<Payload> {
        let builder = QueryBuilder::new(&self.catalog, table)?;
        let schema = builder.table();
        let mut fields = decode_fields(body)?;

        let mut values = Vec::with_capacity(schema.columns.len());
        for column in schema.writable_columns() {
            let value = fields.remove(&column.name).unwrap_or_else(|| {
                if column.nullable {
                    FieldValue::Null
                } else {
                    FieldValue::String(String::new())
                }
            });
            validate(&value, column)?;
            values.push((column, value.into_param()));
        }

        let id = self.insert(&builder.insert(values)).await?;
        let key = schema
            .primary_key()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| FALLBACK_KEY.to_string());
        Ok(Payload::Created { key, id })
    }

    /// Updates the supplied columns of one row. The key column may not be
    /// part of the body; unknown fields are ignored.
    pub async fn update_record(&self, table: &str, id: &str, body: &[u8]) -> Result<Payload> {
        let builder = QueryBuilder::new(&self.catalog, table)?;
        let schema = builder.table();
        let mut fields = decode_fields(body)?;

        if let Some(key) = schema.primary_key() {
            if fields.contains_key(&key.name) {
                return Err(ExplorerError::PrimaryKeyImmutable(key.name.clone()));
            }
        }

        let mut sets = Vec::new();
        for column in schema.writable_columns() {
            if let Some(value) = fields.remove(&column.name) {
                validate(&value, column)?;
                sets.push((column, value.into_param()));
            }
        }

        let Some(stmt) = builder.update(sets, id) else {
            debug!(table, id, "nothing to update");
            return Ok(Payload::Updated(0));
        };
        let result = self.execute(&stmt).await?;
        Ok(Payload::Updated(result.rows_affected()))
    }

    pub async fn delete_record(&self, table: &str, id: &str) -> Result<Payload> {
        let builder = QueryBuilder::new(&self.catalog, table)?;
        let Some(stmt) = builder.delete(id) else {
            return Ok(Payload::Deleted(0));
        };
        let result = self.execute(&stmt).await?;
        Ok(Payload::Deleted(result.rows_affected()))
    }

    // -------- Execution --------

    async fn fetch_all(&self, stmt: &Statement) -> Result<Vec<Row>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "fetch_all");
        let rows = self.bounded(stmt.query().fetch_all(&self.pool)).await?;
        rows.iter()
            .map(|r| decode(r).map_err(ExplorerError::Scan))
            .collect()
    }

    async fn fetch_optional(&self, stmt: &Statement) -> Result<Option<Row>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "fetch_optional");
        let row = self.bounded(stmt.query().fetch_optional(&self.pool)).await?;
        row.as_ref()
            .map(|r| decode(r).map_err(ExplorerError::Scan))
            .transpose()
    }

    async fn execute(&self, stmt: &Statement) -> Result<AnyQueryResult> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "execute");
        self.bounded(stmt.query().execute(&self.pool)).await
    }

    /// Runs an insert and reads back the id the engine generated for it.
    async fn insert(&self, stmt: &Statement) -> Result<i64> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "insert");
        let id = match self.catalog.dialect() {
            Dialect::MySql => {
                let result = self.bounded(stmt.query().execute(&self.pool)).await?;
                result.last_insert_id()
            }
            // the Any driver drops SQLite's rowid, so ask for it on the same connection
            Dialect::Sqlite => {
                let mut conn = self.bounded(self.pool.acquire()).await?;
                self.bounded(stmt.query().execute(&mut *conn)).await?;
                let rowid = self
                    .bounded(sqlx::query_scalar::<_, i64>(LAST_ROWID).fetch_one(&mut *conn))
                    .await?;
                Some(rowid)
            }
        };
        id.ok_or(ExplorerError::MissingInsertId)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = sqlx::Result<T>>,
    {
        let result = match self.query_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(?limit, "query deadline exceeded");
                    return Err(ExplorerError::DeadlineExceeded);
                }
            },
            None => fut.await,
        };
        result.map_err(ExplorerError::Database)
    }
}

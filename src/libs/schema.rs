use std::collections::HashMap;

use sqlx::AnyPool;
use tracing::{debug, info, warn};

use crate::libs::error::{ExplorerError, Result};
use crate::libs::introspect::Dialect;

/// Validation bucket of a column, derived once from the engine's type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Other,
}

impl ColumnKind {
    /// `int(11)`, `bigint unsigned`, `INTEGER` are integers; `varchar(255)`,
    /// `text`, `char(2)` are text; anything else is left unconstrained.
    pub fn classify(sql_type: &str) -> Self {
        let sql_type = sql_type.to_ascii_lowercase();
        if sql_type.contains("int") {
            ColumnKind::Integer
        } else if sql_type.contains("varchar")
            || sql_type.contains("text")
            || sql_type.contains("char")
        {
            ColumnKind::Text
        } else {
            ColumnKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    /// Raw type string as reported by the engine.
    pub sql_type: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, nullable: bool, primary: bool) -> Self {
        let sql_type = sql_type.into();
        Self {
            name: name.into(),
            kind: ColumnKind::classify(&sql_type),
            sql_type,
            nullable,
            primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    primary_key: Option<usize>,
}

impl TableSchema {
    /// The first column flagged `primary` becomes the key column; any further
    /// ones are demoted to ordinary columns.
    pub fn new(name: impl Into<String>, mut columns: Vec<ColumnSchema>) -> Self {
        let name = name.into();
        let primary_key = columns.iter().position(|c| c.primary);
        if let Some(pk) = primary_key {
            for (i, column) in columns.iter_mut().enumerate() {
                if column.primary && i != pk {
                    warn!(table = %name, column = %column.name, "composite primary key, ignoring extra key column");
                    column.primary = false;
                }
            }
        }
        Self {
            name,
            columns,
            primary_key,
        }
    }

    pub fn primary_key(&self) -> Option<&ColumnSchema> {
        self.primary_key.map(|i| &self.columns[i])
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns a client may write: everything but the key column.
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| !c.primary)
    }
}

/// Table structure discovered once at startup. Never mutated afterwards, so a
/// single instance is shared by every request task.
#[derive(Debug, Clone)]
pub struct Catalog {
    dialect: Dialect,
    tables: Vec<TableSchema>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(dialect: Dialect, tables: Vec<TableSchema>) -> Self {
        let by_name = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self {
            dialect,
            tables,
            by_name,
        }
    }

    /// Lists every table and reads its column metadata. Any failing query
    /// aborts the whole discovery.
    pub async fn discover(pool: &AnyPool, dialect: Dialect) -> Result<Self> {
        let introspector = dialect.introspector();

        let names = introspector
            .table_names(pool)
            .await
            .map_err(ExplorerError::Discovery)?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = introspector
                .columns(pool, &name)
                .await
                .map_err(ExplorerError::Discovery)?;
            debug!(table = %name, columns = columns.len(), "discovered table");
            let table = TableSchema::new(name, columns);
            if table.primary_key().is_none() {
                warn!(table = %table.name, "table has no primary key, id routes will not match rows");
            }
            tables.push(table);
        }

        info!(tables = tables.len(), ?dialect, "schema catalog ready");
        Ok(Self::new(dialect, tables))
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn describe(&self, name: &str) -> Option<&TableSchema> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    /// Table names in discovery order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }
}

use sqlx::Any;
use sqlx::any::AnyArguments;
use sqlx::query::Query;

use crate::libs::error::{ExplorerError, Result};
use crate::libs::introspect::Dialect;
use crate::libs::schema::{Catalog, ColumnKind, ColumnSchema, TableSchema};

pub const DEFAULT_LIMIT: i64 = 5;
pub const DEFAULT_OFFSET: i64 = 0;

/// A value travelling through a bound-parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Param {
    /// Path ids arrive as text; integer keys get an integer parameter when
    /// the text parses.
    pub fn for_key(key: &ColumnSchema, id: &str) -> Self {
        match key.kind {
            ColumnKind::Integer => id
                .parse::<i64>()
                .map(Param::Int)
                .unwrap_or_else(|_| Param::Text(id.to_string())),
            _ => Param::Text(id.to_string()),
        }
    }
}

/// Pagination window for table listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl Page {
    /// Anything that is not a non-negative integer falls back to the default.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        fn parse(raw: Option<&str>) -> Option<i64> {
            raw?.parse::<i64>().ok().filter(|n| *n >= 0)
        }
        Self {
            limit: parse(limit).unwrap_or(DEFAULT_LIMIT),
            offset: parse(offset).unwrap_or(DEFAULT_OFFSET),
        }
    }
}

/// SQL text plus its parameters, one per `?`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    pub fn query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = match param {
                Param::Null => query.bind(None::<String>),
                Param::Int(i) => query.bind(*i),
                Param::Float(f) => query.bind(*f),
                Param::Text(s) => query.bind(s.clone()),
                Param::Bool(b) => query.bind(*b),
            };
        }
        query
    }
}

/// Builds statements against one catalog table. Identifiers are taken from
/// the catalog's own descriptors, client data only ever becomes a `Param`.
pub struct QueryBuilder<'a> {
    dialect: Dialect,
    table: &'a TableSchema,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(catalog: &'a Catalog, table: &str) -> Result<Self> {
        let table = catalog.describe(table).ok_or(ExplorerError::UnknownTable)?;
        Ok(Self {
            dialect: catalog.dialect(),
            table,
        })
    }

    pub fn table(&self) -> &'a TableSchema {
        self.table
    }

    fn quoted_table(&self) -> String {
        self.dialect.quote(&self.table.name)
    }

    fn key_clause(&self, id: &str) -> Option<(String, Param)> {
        let key = self.table.primary_key()?;
        Some((
            format!("{} = ?", self.dialect.quote(&key.name)),
            Param::for_key(key, id),
        ))
    }

    pub fn select_page(&self, page: Page) -> Statement {
        Statement {
            sql: format!("SELECT * FROM {} LIMIT ? OFFSET ?", self.quoted_table()),
            params: vec![Param::Int(page.limit), Param::Int(page.offset)],
        }
    }

    /// `None` when the table has no key column to match on.
    pub fn select_by_key(&self, id: &str) -> Option<Statement> {
        let (clause, param) = self.key_clause(id)?;
        Some(Statement {
            sql: format!("SELECT * FROM {} WHERE {}", self.quoted_table(), clause),
            params: vec![param],
        })
    }

    /// Key columns are never part of the insert list.
    pub fn insert(&self, values: Vec<(&ColumnSchema, Param)>) -> Statement {
        let (columns, params): (Vec<_>, Vec<_>) = values
            .into_iter()
            .filter(|(c, _)| !c.primary)
            .map(|(c, p)| (self.dialect.quote(&c.name), p))
            .unzip();

        if columns.is_empty() {
            return Statement {
                sql: self.dialect.empty_insert(&self.quoted_table()),
                params,
            };
        }

        let placeholders = vec!["?"; columns.len()];
        Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.quoted_table(),
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        }
    }

    /// `None` when there is nothing to set or no key column to match on.
    pub fn update(&self, sets: Vec<(&ColumnSchema, Param)>, id: &str) -> Option<Statement> {
        let (clause, key_param) = self.key_clause(id)?;

        let (assignments, mut params): (Vec<_>, Vec<_>) = sets
            .into_iter()
            .filter(|(c, _)| !c.primary)
            .map(|(c, p)| (format!("{} = ?", self.dialect.quote(&c.name)), p))
            .unzip();
        if assignments.is_empty() {
            return None;
        }
        params.push(key_param);

        Some(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {}",
                self.quoted_table(),
                assignments.join(", "),
                clause
            ),
            params,
        })
    }

    pub fn delete(&self, id: &str) -> Option<Statement> {
        let (clause, param) = self.key_clause(id)?;
        Some(Statement {
            sql: format!("DELETE FROM {} WHERE {}", self.quoted_table(), clause),
            params: vec![param],
        })
    }
}

//! Database executor: runs parameterized statements and returns rows or affected-row counts.

use crate::sql::{Placeholder, SqlType, SqlValue, Statement};
use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};

/// SQL flavour of the connected database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Pick the dialect from a database URL scheme.
    pub fn from_url(url: &str) -> Option<Dialect> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Some(Dialect::Sqlite),
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            _ => None,
        }
    }

    pub fn placeholder(self) -> Placeholder {
        match self {
            Dialect::Sqlite => Placeholder::Question,
            Dialect::Postgres => Placeholder::Dollar,
        }
    }
}

/// Result of a statement that returns no rows. Generated keys come back through `RETURNING`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
}

/// Result rows with their column names (empty when no rows came back).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
pub trait Executor: Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    async fn execute(&self, stmt: &Statement) -> Result<ExecOutcome, sqlx::Error>;

    async fn query(&self, stmt: &Statement) -> Result<RowSet, sqlx::Error>;
}

/// Executor over an sqlx `AnyPool` (SQLite or PostgreSQL).
#[derive(Clone, Debug)]
pub struct SqlExecutor {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlExecutor {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let dialect = Dialect::from_url(url).ok_or_else(|| {
            sqlx::Error::Configuration(format!("unsupported database url: {}", url).into())
        })?;
        sqlx::any::install_default_drivers();
        let mut options = AnyPoolOptions::new().max_connections(max_connections);
        if url.contains(":memory:") {
            // Every connection to an in-memory database is a separate database; keep exactly one alive.
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options.connect(url).await?;
        Ok(SqlExecutor { pool, dialect })
    }

    fn bind(stmt: &Statement) -> sqlx::query::Query<'_, sqlx::Any, sqlx::any::AnyArguments<'_>> {
        let mut query = sqlx::query::<sqlx::Any>(&stmt.sql);
        for arg in &stmt.args {
            query = match arg {
                SqlValue::Null | SqlValue::NullOf(SqlType::Text) => query.bind(None::<String>),
                SqlValue::NullOf(SqlType::Int) => query.bind(None::<i64>),
                SqlValue::NullOf(SqlType::Float) => query.bind(None::<f64>),
                SqlValue::NullOf(SqlType::Bool) => query.bind(None::<bool>),
                SqlValue::NullOf(SqlType::Bytes) => query.bind(None::<Vec<u8>>),
                SqlValue::Bool(b) => query.bind(*b),
                SqlValue::Int(n) => query.bind(*n),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
                SqlValue::Bytes(b) => query.bind(b.clone()),
            };
        }
        query
    }
}

#[async_trait]
impl Executor for SqlExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, stmt: &Statement) -> Result<ExecOutcome, sqlx::Error> {
        tracing::debug!(sql = %stmt.sql, args = %args_json(stmt), "execute");
        let result = Self::bind(stmt).execute(&self.pool).await?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
        })
    }

    async fn query(&self, stmt: &Statement) -> Result<RowSet, sqlx::Error> {
        tracing::debug!(sql = %stmt.sql, args = %args_json(stmt), "query");
        let rows = Self::bind(stmt).fetch_all(&self.pool).await?;
        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        Ok(RowSet {
            columns,
            rows: rows.iter().map(row_values).collect(),
        })
    }
}

fn args_json(stmt: &Statement) -> serde_json::Value {
    serde_json::Value::Array(stmt.args.iter().map(SqlValue::to_json).collect())
}

fn row_values(row: &AnyRow) -> Vec<SqlValue> {
    (0..row.columns().len()).map(|i| cell_to_value(row, i)).collect()
}

/// Decode one cell by trying each supported type in turn. NULL decodes as `None` on the first attempt.
fn cell_to_value(row: &AnyRow, idx: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(SqlValue::Int).unwrap_or(SqlValue::Null);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return SqlValue::Float(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return SqlValue::Float(v as f64);
    }
    if let Ok(Some(v)) = row.try_get::<Option<bool>, _>(idx) {
        return SqlValue::Bool(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return SqlValue::Text(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return SqlValue::Bytes(v);
    }
    SqlValue::Null
}

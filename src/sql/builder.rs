//! Fluent INSERT, SELECT, UPDATE, DELETE builders. Identifiers are validated and quoted; values are always parameters.

use super::params::SqlValue;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("update of {0} has no columns to set")]
    EmptyUpdate(String),
}

/// Placeholder style for positional parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` (SQLite, MySQL).
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Dollar,
}

/// SQL text plus its positional arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    /// Raw statement without arguments (DDL and the like).
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("identifier pattern")
    })
}

/// Quote identifier for SQL; `schema.table` is quoted per part.
fn quoted(s: &str) -> Result<String, BuildError> {
    if !identifier_re().is_match(s) {
        return Err(BuildError::InvalidIdentifier(s.to_string()));
    }
    Ok(s.split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join("."))
}

/// Returns true when `s` can be used as a table or column name.
pub fn is_valid_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

struct Writer {
    placeholder: Placeholder,
    args: Vec<SqlValue>,
}

impl Writer {
    fn new(placeholder: Placeholder) -> Self {
        Writer {
            placeholder,
            args: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlValue) -> String {
        self.args.push(v);
        match self.placeholder {
            Placeholder::Question => "?".to_string(),
            Placeholder::Dollar => format!("${}", self.args.len()),
        }
    }

    fn finish(self, sql: String) -> Statement {
        Statement { sql, args: self.args }
    }
}

pub struct Insert {
    table: String,
    pairs: Vec<(String, SqlValue)>,
    returning: Option<String>,
}

impl Insert {
    pub fn into(table: impl Into<String>) -> Self {
        Insert {
            table: table.into(),
            pairs: Vec::new(),
            returning: None,
        }
    }

    /// Add one column with its value; columns and values cannot drift apart.
    pub fn value(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.pairs.push((column.into(), value));
        self
    }

    pub fn values<I, C>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, SqlValue)>,
        C: Into<String>,
    {
        self.pairs.extend(pairs.into_iter().map(|(c, v)| (c.into(), v)));
        self
    }

    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning = Some(column.into());
        self
    }

    pub fn to_sql(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        let mut w = Writer::new(placeholder);
        let table = quoted(&self.table)?;
        let mut sql = if self.pairs.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let mut cols = Vec::with_capacity(self.pairs.len());
            let mut placeholders = Vec::with_capacity(self.pairs.len());
            for (col, val) in self.pairs {
                cols.push(quoted(&col)?);
                placeholders.push(w.push_param(val));
            }
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                cols.join(", "),
                placeholders.join(", ")
            )
        };
        if let Some(col) = &self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&quoted(col)?);
        }
        Ok(w.finish(sql))
    }
}

pub struct Select {
    table: String,
    filter: Option<(String, SqlValue)>,
    order_by: Option<String>,
    limit: Option<u64>,
}

impl Select {
    /// `SELECT *`; rows are matched to fields by column name.
    pub fn from(table: impl Into<String>) -> Self {
        Select {
            table: table.into(),
            filter: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.filter = Some((column.into(), value));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn to_sql(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        let mut w = Writer::new(placeholder);
        let mut sql = format!("SELECT * FROM {}", quoted(&self.table)?);
        if let Some((col, val)) = self.filter {
            let col = quoted(&col)?;
            sql.push_str(&format!(" WHERE {} = {}", col, w.push_param(val)));
        }
        if let Some(col) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {}", quoted(col)?));
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        Ok(w.finish(sql))
    }
}

pub struct Update {
    table: String,
    sets: Vec<(String, SqlValue)>,
    filter: Option<(String, SqlValue)>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Update {
            table: table.into(),
            sets: Vec::new(),
            filter: None,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.sets.push((column.into(), value));
        self
    }

    pub fn set_all<I, C>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, SqlValue)>,
        C: Into<String>,
    {
        self.sets.extend(pairs.into_iter().map(|(c, v)| (c.into(), v)));
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.filter = Some((column.into(), value));
        self
    }

    pub fn to_sql(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        if self.sets.is_empty() {
            return Err(BuildError::EmptyUpdate(self.table));
        }
        let mut w = Writer::new(placeholder);
        let table = quoted(&self.table)?;
        let mut sets = Vec::with_capacity(self.sets.len());
        for (col, val) in self.sets {
            let col = quoted(&col)?;
            sets.push(format!("{} = {}", col, w.push_param(val)));
        }
        let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
        if let Some((col, val)) = self.filter {
            let col = quoted(&col)?;
            sql.push_str(&format!(" WHERE {} = {}", col, w.push_param(val)));
        }
        Ok(w.finish(sql))
    }
}

pub struct Delete {
    table: String,
    filter: Option<(String, SqlValue)>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Delete {
            table: table.into(),
            filter: None,
        }
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.filter = Some((column.into(), value));
        self
    }

    pub fn to_sql(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        let mut w = Writer::new(placeholder);
        let mut sql = format!("DELETE FROM {}", quoted(&self.table)?);
        if let Some((col, val)) = self.filter {
            let col = quoted(&col)?;
            sql.push_str(&format!(" WHERE {} = {}", col, w.push_param(val)));
        }
        Ok(w.finish(sql))
    }
}

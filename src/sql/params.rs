//! Bind values shared by the statement builder, the executor and record fields.

use serde_json::Value;
use std::fmt;

/// Type of a non-null value; kept on NULL arguments for databases that bind typed parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

/// A single statement argument or result cell.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    /// NULL for a column of a known type (an empty `Option` field).
    NullOf(SqlType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Short type name used in mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null | SqlValue::NullOf(_) => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null | SqlValue::NullOf(_))
    }

    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            SqlValue::Null => None,
            SqlValue::NullOf(t) => Some(*t),
            SqlValue::Bool(_) => Some(SqlType::Bool),
            SqlValue::Int(_) => Some(SqlType::Int),
            SqlValue::Float(_) => Some(SqlType::Float),
            SqlValue::Text(_) => Some(SqlType::Text),
            SqlValue::Bytes(_) => Some(SqlType::Bytes),
        }
    }

    /// JSON rendering, used when logging statement arguments.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null | SqlValue::NullOf(_) => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(n) => Value::Number((*n).into()),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Bytes(b) => Value::String(format!("<{} bytes>", b.len())),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null | SqlValue::NullOf(_) => f.write_str("NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(n) => write!(f, "{}", n),
            SqlValue::Float(x) => write!(f, "{}", x),
            SqlValue::Text(s) => write!(f, "{:?}", s),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Float(f)
    }
}

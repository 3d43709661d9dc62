//! Column conversions between Rust field types and SqlValue.

use super::{Column, ScanError};
use crate::sql::SqlValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

fn mismatch(expected: &'static str, found: &SqlValue) -> ScanError {
    ScanError {
        expected,
        found: found.kind(),
    }
}

impl Column for i64 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Int(*self)
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Int(n) => *self = n,
            SqlValue::Bool(b) => *self = b as i64,
            other => return Err(mismatch(self.sql_type(), &other)),
        }
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "i64"
    }
}

macro_rules! narrow_int_column {
    ($($ty:ty),+) => {
        $(
            impl Column for $ty {
                fn to_sql(&self) -> SqlValue {
                    SqlValue::Int(*self as i64)
                }

                fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
                    match value {
                        SqlValue::Int(n) => {
                            *self = <$ty>::try_from(n).map_err(|_| mismatch(self.sql_type(), &SqlValue::Int(n)))?;
                            Ok(())
                        }
                        other => Err(mismatch(self.sql_type(), &other)),
                    }
                }

                fn sql_type(&self) -> &'static str {
                    stringify!($ty)
                }
            }
        )+
    };
}

narrow_int_column!(i32, i16, u32);

impl Column for f64 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Float(*self)
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Float(f) => *self = f,
            SqlValue::Int(n) => *self = n as f64,
            SqlValue::Text(ref s) => *self = s.parse().map_err(|_| mismatch("f64", &value))?,
            other => return Err(mismatch(self.sql_type(), &other)),
        }
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "f64"
    }
}

impl Column for f32 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Float(*self as f64)
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        let mut wide = 0f64;
        wide.scan(value).map_err(|e| ScanError { expected: "f32", ..e })?;
        *self = wide as f32;
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "f32"
    }
}

impl Column for bool {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        // SQLite stores booleans as integers.
        match value {
            SqlValue::Bool(b) => *self = b,
            SqlValue::Int(n) => *self = n != 0,
            other => return Err(mismatch(self.sql_type(), &other)),
        }
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "bool"
    }
}

impl Column for String {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Text(s) => *self = s,
            SqlValue::Bytes(b) => {
                *self = String::from_utf8(b).map_err(|_| ScanError {
                    expected: "String",
                    found: "bytes",
                })?
            }
            other => return Err(mismatch(self.sql_type(), &other)),
        }
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "String"
    }
}

impl Column for Vec<u8> {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Bytes(self.clone())
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Bytes(b) => *self = b,
            SqlValue::Text(s) => *self = s.into_bytes(),
            other => return Err(mismatch(self.sql_type(), &other)),
        }
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "Vec<u8>"
    }
}

/// String lists are stored as a JSON array in a text column.
impl Column for Vec<String> {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(serde_json::to_string(self).unwrap_or_else(|_| "[]".into()))
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Text(ref s) => {
                *self = serde_json::from_str(s).map_err(|_| mismatch("Vec<String>", &value))?;
                Ok(())
            }
            other => Err(mismatch(self.sql_type(), &other)),
        }
    }

    fn sql_type(&self) -> &'static str {
        "Vec<String>"
    }
}

impl Column for DateTime<Utc> {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.to_rfc3339())
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Text(ref s) => {
                *self = DateTime::parse_from_rfc3339(s)
                    .map_err(|_| mismatch("DateTime<Utc>", &value))?
                    .with_timezone(&Utc);
                Ok(())
            }
            other => Err(mismatch(self.sql_type(), &other)),
        }
    }

    fn sql_type(&self) -> &'static str {
        "DateTime<Utc>"
    }
}

impl Column for NaiveDateTime {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Text(ref s) => {
                *self = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .map_err(|_| mismatch("NaiveDateTime", &value))?;
                Ok(())
            }
            other => Err(mismatch(self.sql_type(), &other)),
        }
    }

    fn sql_type(&self) -> &'static str {
        "NaiveDateTime"
    }
}

impl Column for NaiveDate {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.format("%Y-%m-%d").to_string())
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Text(ref s) => {
                *self = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| mismatch("NaiveDate", &value))?;
                Ok(())
            }
            other => Err(mismatch(self.sql_type(), &other)),
        }
    }

    fn sql_type(&self) -> &'static str {
        "NaiveDate"
    }
}

impl Column for uuid::Uuid {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        match value {
            SqlValue::Text(ref s) => {
                *self = uuid::Uuid::parse_str(s).map_err(|_| mismatch("Uuid", &value))?;
                Ok(())
            }
            SqlValue::Bytes(ref b) => {
                *self = uuid::Uuid::from_slice(b).map_err(|_| mismatch("Uuid", &value))?;
                Ok(())
            }
            other => Err(mismatch(self.sql_type(), &other)),
        }
    }

    fn sql_type(&self) -> &'static str {
        "Uuid"
    }
}

/// NULL maps to `None`; anything else is scanned into a fresh `T`.
impl<T> Column for Option<T>
where
    T: Column + Default,
{
    fn to_sql(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql(),
            None => T::default()
                .to_sql()
                .sql_type()
                .map(SqlValue::NullOf)
                .unwrap_or(SqlValue::Null),
        }
    }

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.scan(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "Option"
    }
}

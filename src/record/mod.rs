//! Field reflection for records: each record type describes itself as an ordered
//! mapping from lower-cased field name to a reference into its own storage.
//!
//! The write path reads values through the mapping to build statements; the read
//! path scans result cells through the same mapping, so both agree on the key set.

mod column;

use crate::sql::SqlValue;
use indexmap::map::Keys;
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Key of the primary key entry in every record mapping.
pub const ID_FIELD: &str = "id";

/// Field name of the [`Reflection`] marker; never part of a mapping.
pub const MARKER_FIELD: &str = "reflection";

/// A scanned value did not fit the field it was written into.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct ScanError {
    pub expected: &'static str,
    pub found: &'static str,
}

/// Storage that can be read as a bind value and written from a result cell.
pub trait Column: Send + Sync {
    fn to_sql(&self) -> SqlValue;

    fn scan(&mut self, value: SqlValue) -> Result<(), ScanError>;

    fn sql_type(&self) -> &'static str;
}

/// Mutable handle to one field of a record.
pub struct FieldRef<'a>(&'a mut dyn Column);

impl<'a> FieldRef<'a> {
    pub fn value(&self) -> SqlValue {
        self.0.to_sql()
    }

    pub fn scan(&mut self, value: SqlValue) -> Result<(), ScanError> {
        self.0.scan(value)
    }

    pub fn sql_type(&self) -> &'static str {
        self.0.sql_type()
    }
}

impl fmt::Debug for FieldRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldRef({})", self.0.to_sql())
    }
}

/// Ordered name → field mapping borrowed from a record.
#[derive(Debug, Default)]
pub struct FieldMap<'a> {
    fields: IndexMap<String, FieldRef<'a>>,
}

impl<'a> FieldMap<'a> {
    pub fn new() -> Self {
        FieldMap {
            fields: IndexMap::new(),
        }
    }

    /// Add a field under its canonical (lower-case) name. The marker field is skipped.
    pub fn insert(&mut self, name: &str, column: &'a mut dyn Column) {
        let key = canonical_name(name);
        if key == MARKER_FIELD {
            return;
        }
        self.fields.insert(key, FieldRef(column));
    }

    pub fn with(mut self, name: &str, column: &'a mut dyn Column) -> Self {
        self.insert(name, column);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldRef<'a>> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldRef<'a>> {
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Canonical field names in declaration order.
    pub fn keys(&self) -> Keys<'_, String, FieldRef<'a>> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column/value pairs for every field except the primary key, in one pass.
    pub fn values_without_id(&self) -> Vec<(String, SqlValue)> {
        self.fields
            .iter()
            .filter(|(name, _)| name.as_str() != ID_FIELD)
            .map(|(name, field)| (name.clone(), field.value()))
            .collect()
    }
}

/// Lower-case, without a raw identifier prefix (`r#type` → `type`).
pub fn canonical_name(name: &str) -> String {
    name.trim_start_matches("r#").to_lowercase()
}

/// A row type that can expose its fields by name.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn describe(&mut self) -> FieldMap<'_>;
}

/// Marker a record may embed; it is never mapped to a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection;

impl Column for Reflection {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Null
    }

    fn scan(&mut self, _value: SqlValue) -> Result<(), ScanError> {
        Ok(())
    }

    fn sql_type(&self) -> &'static str {
        "Reflection"
    }
}

/// Implements [`Record`] for a struct by listing its fields; each field name becomes a column.
///
/// ```ignore
/// impl_record!(Item { id, name, r#type, reflection });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::record::Record for $ty {
            fn describe(&mut self) -> $crate::record::FieldMap<'_> {
                let mut map = $crate::record::FieldMap::new();
                $( map.insert(stringify!($field), &mut self.$field); )+
                map
            }
        }
    };
}

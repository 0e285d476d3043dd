//! Generic row and field types
//!
//! The record store is table-agnostic, so rows come back as a [`Record`]
//! (ordered column names plus values) and writes take a [`Fields`] mapping.

use std::collections::BTreeMap;

use rusqlite::types::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Column name to value mapping used by `insert` and `update`.
pub type Fields = BTreeMap<String, Value>;

/// Build a [`Fields`] mapping from `column => value` pairs.
///
/// ```
/// let fields = intelhub::fields! {
///     "title" => "Phishing",
///     "severity" => "High",
///     "resolution_time_hours" => None::<f64>,
/// };
/// assert_eq!(fields.len(), 3);
/// ```
#[macro_export]
macro_rules! fields {
    ($($column:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut fields = $crate::Fields::new();
        $(
            fields.insert(
                ::std::string::ToString::to_string(&$column),
                $crate::IntoValue::into_value($value),
            );
        )*
        fields
    }};
}

/// Conversion into a SQLite value, covering the types domain code writes.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Drop NULL-valued entries; `insert`/`update` never write them.
pub fn without_nulls(fields: &Fields) -> Vec<(&str, &Value)> {
    fields
        .iter()
        .filter(|(_, v)| !matches!(v, Value::Null))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

/// A single result row: column names in select order and their values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Read a record out of a rusqlite row, using the statement's column names.
    pub(crate) fn from_row(columns: &[String], row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(row.get::<_, Value>(idx)?);
        }
        Ok(Self::new(columns.to_vec(), values))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value of a column by name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.get(column), Some(Value::Null))
    }

    /// Iterate `(column, value)` pairs in select order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Render a value for terminal tables.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Value::from(*f),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &to_json(value))?;
        }
        map.end()
    }
}

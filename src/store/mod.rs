//! Document persistence used by the progress recorder.
//!
//! Documents are flat JSON objects addressed by collection and id. Writes are
//! last-writer-wins except inside [`DocumentStore::run_transaction`], which
//! reads and writes one document atomically.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt;

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    pub collection: String,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the listed top-level fields, keep the rest.
    Merge,
    Overwrite,
}

/// Ordered read over one collection. Documents without the order field are
/// left out.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub order_by: String,
    pub descending: bool,
    pub limit: Option<usize>,
    /// Only documents strictly after this order value, in query direction.
    pub start_after: Option<Value>,
}

impl Query {
    pub fn ordered_by(field: &str) -> Self {
        Self {
            order_by: field.to_string(),
            descending: false,
            limit: None,
            start_after: None,
        }
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: Value) -> Self {
        self.start_after = Some(cursor);
        self
    }
}

/// A transaction body: sees the current document (if any) and returns the
/// fields to merge into it, or `None` to leave it untouched.
pub type TransactionFn<'a> = dyn FnMut(Option<&Document>) -> Option<Document> + 'a;

pub trait DocumentStore {
    fn get(&self, key: &DocKey) -> StoreResult<Option<Document>>;

    fn set(&self, key: &DocKey, fields: Document, mode: WriteMode) -> StoreResult<()>;

    /// Adds `delta` to a numeric field, creating the document or field at
    /// zero first.
    fn increment(&self, key: &DocKey, field: &str, delta: f64) -> StoreResult<()>;

    /// Returns whether the body chose to write.
    fn run_transaction(&self, key: &DocKey, body: &mut TransactionFn<'_>) -> StoreResult<bool>;

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<(DocKey, Document)>>;

    /// Deletes all keys as one unit and returns how many existed.
    fn delete_batch(&self, keys: &[DocKey]) -> StoreResult<usize>;
}

/// Integral values are kept as JSON integers so counters stay exact.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// `existing + delta`; `None` when the existing value is not a number.
pub(crate) fn add_number(existing: Option<&Value>, delta: f64) -> Option<Value> {
    match existing {
        None | Some(Value::Null) => Some(number_value(delta)),
        Some(Value::Number(n)) => match (n.as_i64(), delta.fract() == 0.0) {
            (Some(i), true) => Some(Value::from(i + delta as i64)),
            _ => n.as_f64().map(|f| number_value(f + delta)),
        },
        Some(_) => None,
    }
}

pub fn field_f64(doc: &Document, field: &str) -> Option<f64> {
    doc.get(field).and_then(Value::as_f64)
}

pub fn field_u64(doc: &Document, field: &str) -> Option<u64> {
    doc.get(field).and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    })
}

/// Total order used for query sorting: numbers before strings, then
/// booleans; anything else sorts last.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::String(_) => 1,
            Value::Bool(_) => 2,
            _ => 3,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

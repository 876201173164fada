use super::{
    add_number, compare_values, DocKey, Document, DocumentStore, Query, TransactionFn, WriteMode,
};
use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local store. One mutex guards every document, so transactions are
/// trivially serialized.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<DocKey, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<DocKey, Document>>> {
        self.docs.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &DocKey) -> StoreResult<Option<Document>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &DocKey, fields: Document, mode: WriteMode) -> StoreResult<()> {
        let mut docs = self.lock()?;
        match mode {
            WriteMode::Overwrite => {
                docs.insert(key.clone(), fields);
            }
            WriteMode::Merge => docs.entry(key.clone()).or_default().extend(fields),
        }
        Ok(())
    }

    fn increment(&self, key: &DocKey, field: &str, delta: f64) -> StoreResult<()> {
        let mut docs = self.lock()?;
        let doc = docs.entry(key.clone()).or_default();
        let value = add_number(doc.get(field), delta).ok_or_else(|| StoreError::NotANumber {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        doc.insert(field.to_string(), value);
        Ok(())
    }

    fn run_transaction(&self, key: &DocKey, body: &mut TransactionFn<'_>) -> StoreResult<bool> {
        let mut docs = self.lock()?;
        let fields = body(docs.get(key));
        match fields {
            Some(fields) => {
                docs.entry(key.clone()).or_default().extend(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<(DocKey, Document)>> {
        let docs = self.lock()?;
        let mut rows: Vec<(&DocKey, &Document)> = docs
            .iter()
            .filter(|(key, doc)| key.collection == collection && doc.contains_key(&query.order_by))
            .collect();

        rows.sort_by(|(ka, a), (kb, b)| {
            let ord = compare_values(&a[&query.order_by], &b[&query.order_by]);
            let ord = if query.descending { ord.reverse() } else { ord };
            ord.then_with(|| ka.id.cmp(&kb.id))
        });

        if let Some(cursor) = &query.start_after {
            rows.retain(|(_, doc)| {
                let ord = compare_values(&doc[&query.order_by], cursor);
                if query.descending {
                    ord.is_lt()
                } else {
                    ord.is_gt()
                }
            });
        }

        Ok(rows
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(key, doc)| (key.clone(), doc.clone()))
            .collect())
    }

    fn delete_batch(&self, keys: &[DocKey]) -> StoreResult<usize> {
        let mut docs = self.lock()?;
        Ok(keys.iter().filter(|key| docs.remove(*key).is_some()).count())
    }
}

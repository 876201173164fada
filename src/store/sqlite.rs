use super::{add_number, DocKey, Document, DocumentStore, Query, TransactionFn, WriteMode};
use crate::error::{StoreError, StoreResult};
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (collection, id)
    );
    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

/// Documents kept as JSON text in a single SQLite table.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        debug!("opening document store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

fn parse_body(body: &str) -> StoreResult<Document> {
    Ok(serde_json::from_str(body)?)
}

fn read_doc(conn: &Connection, key: &DocKey) -> StoreResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![key.collection, key.id],
            |row| row.get(0),
        )
        .optional()?;
    body.as_deref().map(parse_body).transpose()
}

fn write_doc(conn: &Connection, key: &DocKey, doc: &Document) -> StoreResult<()> {
    conn.execute(
        r#"
        INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
        ON CONFLICT(collection, id)
        DO UPDATE SET body = excluded.body, updated_at = CURRENT_TIMESTAMP
        "#,
        params![key.collection, key.id, serde_json::to_string(doc)?],
    )?;
    Ok(())
}

fn sql_value(value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::Number(n) => Ok(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        }),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        other => Err(StoreError::Unavailable(format!(
            "unsupported query cursor {other}"
        ))),
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, key: &DocKey) -> StoreResult<Option<Document>> {
        read_doc(&self.conn, key)
    }

    fn set(&self, key: &DocKey, fields: Document, mode: WriteMode) -> StoreResult<()> {
        match mode {
            WriteMode::Overwrite => write_doc(&self.conn, key, &fields),
            WriteMode::Merge => self.in_transaction(|conn| {
                let mut doc = read_doc(conn, key)?.unwrap_or_default();
                doc.extend(fields);
                write_doc(conn, key, &doc)
            }),
        }
    }

    fn increment(&self, key: &DocKey, field: &str, delta: f64) -> StoreResult<()> {
        self.in_transaction(|conn| {
            let mut doc = read_doc(conn, key)?.unwrap_or_default();
            let value = add_number(doc.get(field), delta).ok_or_else(|| StoreError::NotANumber {
                key: key.to_string(),
                field: field.to_string(),
            })?;
            doc.insert(field.to_string(), value);
            write_doc(conn, key, &doc)
        })
    }

    fn run_transaction(&self, key: &DocKey, body: &mut TransactionFn<'_>) -> StoreResult<bool> {
        self.in_transaction(|conn| {
            let current = read_doc(conn, key)?;
            let fields = body(current.as_ref());
            match fields {
                Some(fields) => {
                    let mut doc = current.unwrap_or_default();
                    doc.extend(fields);
                    write_doc(conn, key, &doc)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<(DocKey, Document)>> {
        let direction = if query.descending { "DESC" } else { "ASC" };
        let mut values = vec![
            SqlValue::Text(collection.to_string()),
            SqlValue::Text(format!("$.{}", query.order_by)),
            SqlValue::Integer(query.limit.map_or(-1, |l| l as i64)),
        ];

        let mut sql = String::from(
            "SELECT id, body FROM documents \
             WHERE collection = ?1 AND json_extract(body, ?2) IS NOT NULL",
        );
        if let Some(cursor) = &query.start_after {
            let op = if query.descending { "<" } else { ">" };
            sql.push_str(&format!(" AND json_extract(body, ?2) {op} ?4"));
            values.push(sql_value(cursor)?);
        }
        sql.push_str(&format!(
            " ORDER BY json_extract(body, ?2) {direction}, id ASC LIMIT ?3"
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, body) = row?;
            out.push((DocKey::new(collection, id), parse_body(&body)?));
        }
        Ok(out)
    }

    fn delete_batch(&self, keys: &[DocKey]) -> StoreResult<usize> {
        self.in_transaction(|conn| {
            let mut deleted = 0;
            for key in keys {
                deleted += conn.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                    params![key.collection, key.id],
                )?;
            }
            Ok(deleted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use tempfile::tempdir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = create_test_store();
        assert_eq!(store.get(&DocKey::new("users", "nobody")).unwrap(), None);
    }

    #[test]
    fn test_merge_keeps_other_fields() {
        let store = create_test_store();
        let key = DocKey::new("users", "u1");
        store
            .set(&key, doc(json!({"a": 1, "b": "x"})), WriteMode::Overwrite)
            .unwrap();
        store.set(&key, doc(json!({"b": "y"})), WriteMode::Merge).unwrap();
        assert_eq!(
            store.get(&key).unwrap(),
            Some(doc(json!({"a": 1, "b": "y"})))
        );
    }

    #[test]
    fn test_increment() {
        let store = create_test_store();
        let key = DocKey::new("users", "u1");
        for _ in 0..3 {
            store.increment(&key, "runs", 1.0).unwrap();
        }
        store.increment(&key, "wpm_sum", 2.2).unwrap();
        store.increment(&key, "wpm_sum", 3.3).unwrap();
        let d = store.get(&key).unwrap().unwrap();
        assert_eq!(d["runs"], json!(3));
        assert!((d["wpm_sum"].as_f64().unwrap() - 5.5).abs() < 1e-9);

        store.set(&key, doc(json!({"name": "x"})), WriteMode::Merge).unwrap();
        assert_matches!(
            store.increment(&key, "name", 1.0),
            Err(StoreError::NotANumber { .. })
        );
    }

    #[test]
    fn test_transaction_max_merge() {
        let store = create_test_store();
        let key = DocKey::new("users", "u1");
        let merge = |candidate: i64| {
            store
                .run_transaction(&key, &mut |current| {
                    let high = current
                        .and_then(|d| d.get("high"))
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    (candidate > high).then(|| doc(json!({ "high": candidate })))
                })
                .unwrap()
        };
        assert!(merge(5));
        assert!(!merge(3));
        assert!(merge(8));
        assert_eq!(store.get(&key).unwrap().unwrap()["high"], json!(8));
    }

    #[test]
    fn test_query_uses_json_order() {
        let store = create_test_store();
        for (id, ts) in [("a", 10), ("b", 30), ("c", 20), ("d", 40)] {
            store
                .set(&DocKey::new("runs", id), doc(json!({"timestamp": ts})), WriteMode::Overwrite)
                .unwrap();
        }
        store
            .set(&DocKey::new("runs", "nots"), doc(json!({"wpm": 1})), WriteMode::Overwrite)
            .unwrap();

        let ids = |rows: Vec<(DocKey, Document)>| -> Vec<String> {
            rows.into_iter().map(|(k, _)| k.id).collect()
        };
        let newest = store
            .query("runs", &Query::ordered_by("timestamp").descending().limit(3))
            .unwrap();
        assert_eq!(ids(newest), vec!["d", "b", "c"]);

        let older = store
            .query("runs", &Query::ordered_by("timestamp").descending().start_after(json!(20)))
            .unwrap();
        assert_eq!(ids(older), vec!["a"]);

        let all = store.query("runs", &Query::ordered_by("timestamp")).unwrap();
        assert_eq!(ids(all), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_delete_batch() {
        let store = create_test_store();
        let keys: Vec<DocKey> = (0..3).map(|i| DocKey::new("runs", i.to_string())).collect();
        for key in &keys {
            store.set(key, doc(json!({"timestamp": 1})), WriteMode::Overwrite).unwrap();
        }
        assert_eq!(store.delete_batch(&keys[..2]).unwrap(), 2);
        assert_eq!(store.delete_batch(&keys[..2]).unwrap(), 0);
        assert!(store.get(&keys[2]).unwrap().is_some());
    }

    #[test]
    fn test_open_creates_parent_dirs_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("coach.db");
        let key = DocKey::new("users", "u1");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.increment(&key, "runs", 1.0).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap()["runs"], json!(1));
    }
}

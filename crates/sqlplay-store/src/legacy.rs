use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Value};
use std::path::Path;

use crate::Result;

// v1 kept one column per file and called the name `title`.
pub(crate) const V1_EXTRACT: &str = "\
SELECT id,
       title AS name,
       dialect,
       NULL AS preset,
       json_patch('{}', json_object(
           'schema', schema_code,
           'utils', utils_code,
           'seed', seed_code,
           'index', index_code)) AS files,
       created_at,
       created_at AS updated_at
FROM playground
ORDER BY id";

// v2 already stored the file tree as JSON but had no preset or updated_at.
pub(crate) const V2_EXTRACT: &str = "\
SELECT id,
       name,
       dialect,
       NULL AS preset,
       files,
       created_at,
       created_at AS updated_at
FROM playgrounds
ORDER BY id";

const BOOTSTRAP: &str = "PRAGMA query_only = ON;";

/// Reads every row of a legacy image as a JSON object keyed by column.
///
/// The image is opened read-only and closed before returning.
pub(crate) fn extract_rows(path: &Path, extraction: &str) -> Result<Vec<Map<String, Value>>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    conn.execute_batch(BOOTSTRAP)?;

    let mut stmt = conn.prepare(extraction)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = Map::new();
        for (idx, column) in columns.iter().enumerate() {
            object.insert(column.clone(), to_json(row.get_ref(idx)?));
        }
        out.push(object);
    }

    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_v1_drops_null_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("v1.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE playground (id TEXT, title TEXT, dialect TEXT, schema_code TEXT,
                     utils_code TEXT, seed_code TEXT, index_code TEXT, created_at TEXT);
                 INSERT INTO playground VALUES ('p1', 'First', 'sqlite', 'table t {}', NULL, '', 'select 1;', '2023-05-01 10:00:00');",
            )
            .unwrap();
        }

        let rows = extract_rows(&path, V1_EXTRACT).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "First");
        assert_eq!(rows[0]["preset"], Value::Null);
        assert_eq!(rows[0]["updated_at"], "2023-05-01 10:00:00");

        let files: Value = serde_json::from_str(rows[0]["files"].as_str().unwrap()).unwrap();
        assert_eq!(
            files,
            serde_json::json!({"schema": "table t {}", "seed": "", "index": "select 1;"})
        );
    }

    #[test]
    fn test_extraction_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("v2.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE playgrounds (id TEXT, name TEXT, dialect TEXT, files TEXT, created_at TEXT);")
            .unwrap();

        assert!(extract_rows(&path, "DELETE FROM playgrounds").is_err());
        assert!(extract_rows(&path, V2_EXTRACT).unwrap().is_empty());
    }
}

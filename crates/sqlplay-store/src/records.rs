use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlplay_types::{Dialect, FileName, PlaygroundFileTree, Value};

use crate::{Error, Result};

/// Column order shared by every query that reads or writes records.
pub(crate) const COLUMNS: [&str; 7] = [
    "id",
    "name",
    "dialect",
    "preset",
    "files",
    "created_at",
    "updated_at",
];

/// One saved playground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaygroundRecord {
    pub id: String,
    pub name: String,
    pub dialect: Dialect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// User files only; `tools` is never stored.
    pub files: PlaygroundFileTree,
    pub created_at: String,
    pub updated_at: String,
}

impl PlaygroundRecord {
    pub fn new(
        name: impl Into<String>,
        dialect: Dialect,
        preset: Option<String>,
        files: PlaygroundFileTree,
    ) -> Self {
        let now = timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            dialect,
            preset,
            files: files.without(FileName::Tools),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Row values in [`COLUMNS`] order.
    pub(crate) fn to_row(&self) -> Result<Vec<Value>> {
        Ok(vec![
            Value::from(self.id.as_str()),
            Value::from(self.name.as_str()),
            Value::from(self.dialect.as_str()),
            Value::from(self.preset.clone()),
            Value::from(serde_json::to_string(&self.files)?),
            Value::from(self.created_at.as_str()),
            Value::from(self.updated_at.as_str()),
        ])
    }

    /// Reads a row in [`COLUMNS`] order.
    pub(crate) fn from_row(row: &[Value]) -> Result<Self> {
        let [id, name, dialect, preset, files, created_at, updated_at] = row else {
            return Err(Error::Record(format!(
                "expected {} columns, found {}",
                COLUMNS.len(),
                row.len()
            )));
        };

        let id = required(id, "id")?;
        let dialect = required(dialect, "dialect")?;
        let dialect = dialect
            .parse::<Dialect>()
            .map_err(|_| Error::Record(format!("playground {} has unknown dialect `{}`", id, dialect)))?;
        let files: PlaygroundFileTree = serde_json::from_str(&required(files, "files")?)?;
        let created_at = optional(created_at).unwrap_or_else(timestamp);
        let updated_at = optional(updated_at).unwrap_or_else(|| created_at.clone());

        Ok(Self {
            name: required(name, "name")?,
            dialect,
            preset: optional(preset),
            files,
            created_at,
            updated_at,
            id,
        })
    }

    /// Reads one backup row (a JSON object keyed by column).
    pub(crate) fn from_backup_row(row: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let values: Vec<Value> = COLUMNS
            .iter()
            .map(|column| row.get(*column).map(Value::from_json).unwrap_or_default())
            .collect();
        Self::from_row(&values)
    }
}

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn required(value: &Value, column: &str) -> Result<String> {
    optional(value).ok_or_else(|| Error::Record(format!("`{}` is null", column)))
}

fn optional(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_tools() {
        let files = PlaygroundFileTree::default()
            .with(FileName::Schema, "table t {\n id serial pk\n}")
            .with(FileName::Tools, "-- reference");
        let record = PlaygroundRecord::new("demo", Dialect::Sqlite, None, files);

        assert_eq!(record.files.get(FileName::Tools), None);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.id.len(), 36);
    }

    #[test]
    fn test_backup_row_with_integer_id() {
        let row = serde_json::json!({
            "id": 7,
            "name": "old",
            "dialect": "postgresql",
            "preset": null,
            "files": "{\"index\":\"select 1;\"}",
            "created_at": "2022-01-01 00:00:00",
            "updated_at": null
        });
        let record = PlaygroundRecord::from_backup_row(row.as_object().unwrap()).unwrap();

        assert_eq!(record.id, "7");
        assert_eq!(record.dialect, Dialect::Postgresql);
        assert_eq!(record.files.get(FileName::Index), Some("select 1;"));
        assert_eq!(record.updated_at, "2022-01-01 00:00:00");
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        let row = serde_json::json!({"id": "a", "name": "x", "dialect": "oracle", "files": "{}"});
        let err = PlaygroundRecord::from_backup_row(row.as_object().unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid playground record: playground a has unknown dialect `oracle`"
        );
    }
}

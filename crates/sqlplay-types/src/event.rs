use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FileName, Value};

/// One statement executed against a session, with its bound values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLogEntry {
    pub sql: String,
    pub params: Vec<Value>,
}

impl StatementLogEntry {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: usize,
}

impl QueryResult {
    /// First column of the first row.
    pub fn scalar(&self) -> Value {
        self.rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Rows as an array of `{column: value}` objects.
    pub fn to_json_rows(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), value.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

/// A playground file failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub file: FileName,
    /// 1-based line of the failing statement.
    pub line: usize,
    pub message: String,
    /// SQL text when the failure came from the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)?;
        if let Some(statement) = &self.statement {
            write!(f, " (in `{}`)", statement)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {}

/// Tagged output of a playground run, in execution order.
///
/// The stream is finite: it ends after `index` completes, or right after the
/// single `Error` event when a file fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    Console { file: FileName, text: String },
    Statement(StatementLogEntry),
    Error(ExecutionError),
}

impl OutputEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, OutputEvent::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = OutputEvent::Statement(StatementLogEntry::new(
            "insert into users (name) values (?1)",
            vec![Value::from("Ada")],
        ));
        insta::assert_json_snapshot!(event, @r###"
        {
          "type": "statement",
          "sql": "insert into users (name) values (?1)",
          "params": [
            "Ada"
          ]
        }
        "###);
    }

    #[test]
    fn test_error_display_includes_statement() {
        let err = ExecutionError {
            file: FileName::Seed,
            line: 3,
            message: "no such table: pets".to_string(),
            statement: Some("insert into pets default values".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "seed:3: no such table: pets (in `insert into pets default values`)"
        );
    }

    #[test]
    fn test_scalar_and_json_rows() {
        let result = QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![Value::Integer(1), Value::from("Ada")]],
            rows_affected: 0,
        };
        assert_eq!(result.scalar(), Value::Integer(1));
        assert_eq!(
            result.to_json_rows(),
            serde_json::json!([{"id": 1, "name": "Ada"}])
        );
        assert_eq!(QueryResult::default().scalar(), Value::Null);
    }
}

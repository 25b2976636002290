use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use sqlplay_types::{Dialect, QueryResult, StatementLogEntry, Value};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use tracing::{debug, trace};

use crate::functions::{self, Settings};
use crate::identity::{ADMIN_ROLE, ROLE_SETTING, SUBJECT_SETTING};
use crate::schema::{SchemaModule, compile};
use crate::{Error, Result};

/// Where a session keeps its database image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Ephemeral; gone when the session is dropped.
    InMemory,
    /// File-backed image, created if missing.
    Durable(PathBuf),
}

/// One embedded engine instance.
///
/// Every statement goes through [`EngineSession::execute`], which republishes
/// it to all subscribers before running it.
pub struct EngineSession {
    conn: Connection,
    dialect: Dialect,
    storage: Storage,
    settings: Settings,
    subscribers: Vec<Sender<StatementLogEntry>>,
}

impl EngineSession {
    /// Starts an engine and applies the schema's DDL in dependency order.
    ///
    /// The session is only returned once every DDL statement succeeded.
    pub fn create(dialect: Dialect, schema: &SchemaModule, storage: Storage) -> Result<Self> {
        let ddl = compile(schema, dialect)?;
        let mut session = Self::open(dialect, storage)?;

        for statement in &ddl {
            session
                .run_statement(statement, &[])
                .map_err(|source| Error::Provisioning {
                    statement: Some(statement.clone()),
                    source,
                })?;
        }

        debug!(
            dialect = %dialect,
            tables = schema.tables.len(),
            statements = ddl.len(),
            "engine session ready"
        );
        Ok(session)
    }

    /// Convenience for [`EngineSession::create`] from schema source text.
    pub fn from_source(dialect: Dialect, schema: &str, storage: Storage) -> Result<Self> {
        let module = SchemaModule::parse(schema)?;
        Self::create(dialect, &module, storage)
    }

    fn open(dialect: Dialect, storage: Storage) -> Result<Self> {
        let conn = match &storage {
            Storage::InMemory => Connection::open_in_memory(),
            Storage::Durable(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(path)
            }
        }
        .map_err(|source| Error::Provisioning {
            statement: None,
            source,
        })?;

        let settings = Settings::default();
        functions::install(&conn, dialect, &settings).map_err(|source| Error::Provisioning {
            statement: None,
            source,
        })?;

        let mut session = Self {
            conn,
            dialect,
            storage,
            settings,
            subscribers: Vec::new(),
        };
        session
            .run_statement("PRAGMA foreign_keys = ON", &[])
            .map_err(|source| Error::Provisioning {
                statement: Some("PRAGMA foreign_keys = ON".to_string()),
                source,
            })?;

        Ok(session)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Attaches a statement logger for the rest of the session's lifetime.
    ///
    /// Dropping the receiver detaches it.
    pub fn subscribe(&mut self) -> Receiver<StatementLogEntry> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Runs one statement with positional parameters (`?1`, `?2`, ...).
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.run_statement(sql, params).map_err(Error::Database)
    }

    /// True while an explicit transaction is open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Current value of a session setting (see `set_config`).
    pub fn setting(&self, name: &str) -> Option<String> {
        self.settings.get(name)
    }

    /// Role statements currently run as; `admin` outside identity scopes.
    pub fn effective_role(&self) -> String {
        self.setting(ROLE_SETTING)
            .unwrap_or_else(|| ADMIN_ROLE.to_string())
    }

    /// Drops emulated identity values without going through the engine.
    pub(crate) fn clear_identity(&self) {
        self.settings.clear(&[SUBJECT_SETTING, ROLE_SETTING]);
    }

    fn run_statement(&mut self, sql: &str, params: &[Value]) -> rusqlite::Result<QueryResult> {
        self.publish(sql, params);

        let mut stmt = self.conn.prepare(sql)?;
        let bound = params.iter().map(to_sql_value);

        if stmt.column_count() == 0 {
            let rows_affected = stmt.execute(params_from_iter(bound))?;
            return Ok(QueryResult {
                rows_affected,
                ..QueryResult::default()
            });
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = stmt.query(params_from_iter(bound))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                cells.push(from_value_ref(row.get_ref(idx)?));
            }
            out.push(cells);
        }

        Ok(QueryResult {
            columns,
            rows: out,
            rows_affected: 0,
        })
    }

    fn publish(&mut self, sql: &str, params: &[Value]) {
        trace!(target: "sqlplay::sql", %sql, ?params, "execute");
        if self.subscribers.is_empty() {
            return;
        }
        let entry = StatementLogEntry::new(sql, params.to_vec());
        self.subscribers.retain(|tx| tx.send(entry.clone()).is_ok());
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            Value::Text(format!("x'{}'", hex))
        }
    }
}

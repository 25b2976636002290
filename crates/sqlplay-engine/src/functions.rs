use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use sqlplay_types::Dialect;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Session-scoped configuration values read by `current_setting`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings(Arc<Mutex<HashMap<String, String>>>);

impl Settings {
    pub(crate) fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    pub(crate) fn set(&self, name: String, value: Option<String>) {
        let mut map = self.lock();
        match value {
            Some(value) => map.insert(name, value),
            None => map.remove(&name),
        };
    }

    pub(crate) fn clear(&self, names: &[&str]) {
        let mut map = self.lock();
        for name in names {
            map.remove(*name);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Installs the session functions every dialect gets, plus the PostgreSQL
/// compatibility helpers for `Dialect::Postgresql`.
pub(crate) fn install(conn: &Connection, dialect: Dialect, settings: &Settings) -> rusqlite::Result<()> {
    let store = settings.clone();
    conn.create_scalar_function("set_config", 3, FunctionFlags::SQLITE_UTF8, move |ctx| {
        let name = text_arg(ctx, 0).unwrap_or_default();
        let value = text_arg(ctx, 1);
        store.set(name, value.clone());
        Ok(value)
    })?;

    // current_setting(name) and current_setting(name, missing_ok)
    for arity in [1, 2] {
        let store = settings.clone();
        conn.create_scalar_function(
            "current_setting",
            arity,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_INNOCUOUS,
            move |ctx| {
                let name = text_arg(ctx, 0).unwrap_or_default();
                Ok(store.get(&name))
            },
        )?;
    }

    if dialect == Dialect::Postgresql {
        conn.create_scalar_function("gen_random_uuid", 0, FunctionFlags::SQLITE_UTF8, |_| {
            Ok(uuid::Uuid::new_v4().to_string())
        })?;
        conn.create_scalar_function("now", 0, FunctionFlags::SQLITE_UTF8, |_| {
            Ok(chrono::Utc::now().to_rfc3339())
        })?;
    }

    Ok(())
}

fn text_arg(ctx: &Context<'_>, idx: usize) -> Option<String> {
    match ctx.get_raw(idx) {
        ValueRef::Null => None,
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(dialect: Dialect) -> (Connection, Settings) {
        let conn = Connection::open_in_memory().unwrap();
        let settings = Settings::default();
        install(&conn, dialect, &settings).unwrap();
        (conn, settings)
    }

    #[test]
    fn test_set_and_read_setting() {
        let (conn, settings) = connection(Dialect::Sqlite);

        let echoed: String = conn
            .query_row("SELECT set_config('app.user', 'u1', 1)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(echoed, "u1");
        assert_eq!(settings.get("app.user").as_deref(), Some("u1"));

        let read: Option<String> = conn
            .query_row("SELECT current_setting('app.user')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(read.as_deref(), Some("u1"));
    }

    #[test]
    fn test_null_value_clears_setting() {
        let (conn, settings) = connection(Dialect::Sqlite);
        settings.set("app.role".to_string(), Some("reader".to_string()));

        conn.query_row("SELECT set_config('app.role', NULL, 1)", [], |_| Ok(()))
            .unwrap();

        let read: Option<String> = conn
            .query_row("SELECT current_setting('app.role', 1)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn test_postgres_helpers_only_for_postgres() {
        let (pg, _) = connection(Dialect::Postgresql);
        let id: String = pg
            .query_row("SELECT gen_random_uuid()", [], |row| row.get(0))
            .unwrap();
        assert_eq!(id.len(), 36);

        let (lite, _) = connection(Dialect::Sqlite);
        assert!(lite.prepare("SELECT gen_random_uuid()").is_err());
    }
}

//! Integration tests for file-backed sessions
//!
//! A durable image is provisioned through the same path as an in-memory one,
//! so reopening it must re-apply the DDL without touching existing rows.

use sqlplay_engine::{EngineSession, Error, Storage};
use sqlplay_types::{Dialect, Value};
use tempfile::TempDir;

const SCHEMA: &str = r#"
table projects {
  id   text pk
  name text not null
}
index projects_name on projects(name)
"#;

#[test]
fn test_reopen_keeps_rows_and_reapplies_ddl() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("images").join("dev-playgrounds-v3.db");

    {
        let mut session =
            EngineSession::from_source(Dialect::Sqlite, SCHEMA, Storage::Durable(path.clone()))
                .unwrap();
        session
            .execute(
                "INSERT INTO projects (id, name) VALUES (?1, ?2)",
                &[Value::from("p1"), Value::from("first")],
            )
            .unwrap();
    }

    assert!(path.exists(), "durable image should be created with parent dirs");

    let mut reopened =
        EngineSession::from_source(Dialect::Sqlite, SCHEMA, Storage::Durable(path.clone())).unwrap();
    let rows = reopened
        .execute("SELECT id, name FROM projects", &[])
        .unwrap()
        .rows;
    assert_eq!(rows, vec![vec![Value::from("p1"), Value::from("first")]]);
    assert_eq!(reopened.storage(), &Storage::Durable(path));
}

#[test]
fn test_one_insert_produces_one_log_entry() {
    let mut session =
        EngineSession::from_source(Dialect::Postgresql, SCHEMA, Storage::InMemory).unwrap();
    let rx = session.subscribe();

    session
        .execute(
            "INSERT INTO projects (id, name) VALUES (gen_random_uuid(), ?1)",
            &[Value::from("logged")],
        )
        .unwrap();

    let entries: Vec<_> = rx.try_iter().collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].sql.starts_with("INSERT INTO projects"));
    assert_eq!(entries[0].params, vec![Value::from("logged")]);
}

#[test]
fn test_schema_errors_are_not_provisioning_errors() {
    let err = match EngineSession::from_source(
        Dialect::Postgresql,
        "table a {\n id int\n}\nindex a_missing on a(nope)",
        Storage::InMemory,
    ) {
        Ok(_) => panic!("schema should be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, Error::Schema(_)));
}

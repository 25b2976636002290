//! Legacy image fixtures.
//!
//! Each writer creates an image exactly as that version laid it out, so
//! migration tests start from realistic files.

use anyhow::Result;
use rusqlite::{Connection, params};
use sqlplay_types::{FileName, PlaygroundFileTree};
use std::path::Path;

/// A playground as an older version stored it.
#[derive(Debug, Clone)]
pub struct LegacyPlayground {
    pub id: String,
    pub name: String,
    pub dialect: String,
    pub files: PlaygroundFileTree,
    pub created_at: String,
}

impl LegacyPlayground {
    /// A small sqlite playground with schema, seed and index.
    pub fn sample(id: &str, name: &str) -> Self {
        let files = PlaygroundFileTree::default()
            .with(FileName::Schema, "table notes {\n  id serial pk\n  body text not null\n}")
            .with(FileName::Seed, "insert into notes (body) values ('hello');")
            .with(FileName::Index, "print select * from notes;");

        Self {
            id: id.to_string(),
            name: name.to_string(),
            dialect: "sqlite".to_string(),
            files,
            created_at: "2023-03-14 09:26:53".to_string(),
        }
    }
}

/// v1: one row per playground in `playground`, one column per file.
pub fn write_v1_image(path: &Path, playgrounds: &[LegacyPlayground]) -> Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE playground (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            dialect TEXT NOT NULL,
            schema_code TEXT,
            utils_code TEXT,
            seed_code TEXT,
            index_code TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    for p in playgrounds {
        conn.execute(
            "INSERT INTO playground VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                p.id,
                p.name,
                p.dialect,
                p.files.get(FileName::Schema),
                p.files.get(FileName::Utils),
                p.files.get(FileName::Seed),
                p.files.get(FileName::Index),
                p.created_at,
            ],
        )?;
    }
    Ok(())
}

/// v2: `playgrounds` with the file tree as a JSON column.
pub fn write_v2_image(path: &Path, playgrounds: &[LegacyPlayground]) -> Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE playgrounds (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            dialect TEXT NOT NULL,
            files TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;

    for p in playgrounds {
        conn.execute(
            "INSERT INTO playgrounds VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                p.id,
                p.name,
                p.dialect,
                serde_json::to_string(&p.files)?,
                p.created_at
            ],
        )?;
    }
    Ok(())
}

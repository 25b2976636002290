use sqlplay_engine::{EngineSession, Storage};
use sqlplay_types::{Dialect, Value};
use std::path::Path;
use tracing::debug;

use crate::Result;
use crate::records::{COLUMNS, PlaygroundRecord, timestamp};

const STORE_SCHEMA: &str = "\
table playgrounds {
  id         text pk
  name       text not null
  dialect    text not null
  preset     text
  files      json not null
  created_at timestamp not null default now
  updated_at timestamp not null default now
}

index playgrounds_by_updated on playgrounds(updated_at)
";

/// Rows handled by one [`PlaygroundStore::absorb`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsorbSummary {
    pub absorbed: usize,
    /// Rows whose id already existed; the stored row was kept.
    pub skipped: usize,
}

/// Saved playgrounds in the current image.
pub struct PlaygroundStore {
    session: EngineSession,
}

impl PlaygroundStore {
    /// Opens (or creates) the image at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let session = EngineSession::from_source(
            Dialect::Sqlite,
            STORE_SCHEMA,
            Storage::Durable(path.to_path_buf()),
        )?;
        debug!(path = %path.display(), "playground store open");
        Ok(Self { session })
    }

    pub fn open_in_memory() -> Result<Self> {
        let session = EngineSession::from_source(Dialect::Sqlite, STORE_SCHEMA, Storage::InMemory)?;
        Ok(Self { session })
    }

    /// Inserts or replaces `record`, setting its `updated_at` to now.
    ///
    /// `created_at` of an existing row is kept.
    pub fn save(&mut self, record: &mut PlaygroundRecord) -> Result<()> {
        record.updated_at = timestamp();
        let sql = format!(
            "INSERT INTO playgrounds ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, dialect = excluded.dialect, \
             preset = excluded.preset, files = excluded.files, updated_at = excluded.updated_at",
            COLUMNS.join(", ")
        );
        self.session.execute(&sql, &record.to_row()?)?;
        Ok(())
    }

    pub fn get(&mut self, id: &str) -> Result<Option<PlaygroundRecord>> {
        let sql = format!("SELECT {} FROM playgrounds WHERE id = ?1", COLUMNS.join(", "));
        let result = self.session.execute(&sql, &[Value::from(id)])?;

        result
            .rows
            .first()
            .map(|row| PlaygroundRecord::from_row(row))
            .transpose()
    }

    /// All playgrounds, most recently updated first.
    pub fn list(&mut self) -> Result<Vec<PlaygroundRecord>> {
        let sql = format!(
            "SELECT {} FROM playgrounds ORDER BY updated_at DESC, id",
            COLUMNS.join(", ")
        );
        let result = self.session.execute(&sql, &[])?;

        result
            .rows
            .iter()
            .map(|row| PlaygroundRecord::from_row(row))
            .collect()
    }

    /// Returns false when no playground had this id.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let result = self
            .session
            .execute("DELETE FROM playgrounds WHERE id = ?1", &[Value::from(id)])?;
        Ok(result.rows_affected > 0)
    }

    /// Inserts records as-is, skipping ids that already exist.
    ///
    /// Runs in one transaction: on error nothing is absorbed.
    pub fn absorb(&mut self, records: &[PlaygroundRecord]) -> Result<AbsorbSummary> {
        self.session.execute("BEGIN", &[])?;
        match self.insert_new(records) {
            Ok(summary) => {
                self.session.execute("COMMIT", &[])?;
                Ok(summary)
            }
            Err(err) => {
                let _ = self.session.execute("ROLLBACK", &[]);
                Err(err)
            }
        }
    }

    fn insert_new(&mut self, records: &[PlaygroundRecord]) -> Result<AbsorbSummary> {
        let sql = format!(
            "INSERT INTO playgrounds ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO NOTHING",
            COLUMNS.join(", ")
        );

        let mut summary = AbsorbSummary::default();
        for record in records {
            let result = self.session.execute(&sql, &record.to_row()?)?;
            if result.rows_affected > 0 {
                summary.absorbed += 1;
            } else {
                summary.skipped += 1;
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlplay_types::{FileName, PlaygroundFileTree};

    fn record(id: &str, updated_at: &str) -> PlaygroundRecord {
        PlaygroundRecord {
            id: id.to_string(),
            name: format!("playground {}", id),
            dialect: Dialect::Sqlite,
            preset: None,
            files: PlaygroundFileTree::default().with(FileName::Index, "select 1;"),
            created_at: "2020-01-01T00:00:00.000Z".to_string(),
            updated_at: updated_at.to_string(),
        }
    }

    #[test]
    fn test_save_and_get() {
        let mut store = PlaygroundStore::open_in_memory().unwrap();
        let mut saved = PlaygroundRecord::new(
            "demo",
            Dialect::Postgresql,
            Some("blog".to_string()),
            PlaygroundFileTree::default().with(FileName::Seed, ""),
        );
        store.save(&mut saved).unwrap();

        let loaded = store.get(&saved.id).unwrap().unwrap();
        assert_eq!(loaded, saved);
        // Empty files survive; absent files stay absent.
        assert_eq!(loaded.files.get(FileName::Seed), Some(""));
        assert_eq!(loaded.files.get(FileName::Utils), None);

        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_save_updates_in_place() {
        let mut store = PlaygroundStore::open_in_memory().unwrap();
        let mut saved = record("a", "2020-01-01T00:00:00.000Z");
        store.save(&mut saved).unwrap();

        saved.name = "renamed".to_string();
        saved.created_at = "2099-01-01T00:00:00.000Z".to_string();
        store.save(&mut saved).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "renamed");
        assert_eq!(all[0].created_at, "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut store = PlaygroundStore::open_in_memory().unwrap();
        store
            .absorb(&[
                record("old", "2020-01-01T00:00:00.000Z"),
                record("new", "2021-01-01T00:00:00.000Z"),
            ])
            .unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let mut old = store.get("old").unwrap().unwrap();
        store.save(&mut old).unwrap();
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[test]
    fn test_absorb_skips_existing_ids() {
        let mut store = PlaygroundStore::open_in_memory().unwrap();
        let mut kept = record("a", "2022-01-01T00:00:00.000Z");
        kept.name = "kept".to_string();
        store.absorb(&[kept]).unwrap();

        let summary = store
            .absorb(&[record("a", "2023-01-01T00:00:00.000Z"), record("b", "2023-01-01T00:00:00.000Z")])
            .unwrap();
        assert_eq!(summary, AbsorbSummary { absorbed: 1, skipped: 1 });
        assert_eq!(store.get("a").unwrap().unwrap().name, "kept");
    }

    #[test]
    fn test_delete() {
        let mut store = PlaygroundStore::open_in_memory().unwrap();
        store.absorb(&[record("a", "2022-01-01T00:00:00.000Z")]).unwrap();

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.list().unwrap().is_empty());
    }
}

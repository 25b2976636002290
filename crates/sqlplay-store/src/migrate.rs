use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{CleanupWarning, MigrationError, MigrationStage};
use crate::legacy;
use crate::records::PlaygroundRecord;
use crate::store::PlaygroundStore;
use crate::versions::{self, CURRENT_VERSION, LEGACY_VERSIONS, PersistedImageVersion};

/// Rows read from a legacy image, kept on disk until they are absorbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationBackup {
    pub from_version: String,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Tag of the image that was migrated, if any.
    pub migrated_from: Option<String>,
    pub absorbed: usize,
    pub skipped: usize,
    pub warnings: Vec<CleanupWarning>,
}

/// Brings the store in `storage_dir` up to the current image version.
pub struct Migrator {
    storage_dir: PathBuf,
    environment: String,
}

impl Migrator {
    pub fn new(storage_dir: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            environment: environment.into(),
        }
    }

    pub fn image_path(&self, version: &PersistedImageVersion) -> PathBuf {
        version.image_path(&self.storage_dir, &self.environment)
    }

    pub fn backup_path(&self) -> PathBuf {
        versions::backup_path(&self.storage_dir, &self.environment)
    }

    /// Oldest legacy version with an image on disk.
    pub fn scan(&self) -> Result<Option<&'static PersistedImageVersion>, MigrationError> {
        for version in &LEGACY_VERSIONS {
            let path = self.image_path(version);
            let exists = path
                .try_exists()
                .map_err(|e| MigrationError::new(MigrationStage::Scan, version.tag, e))?;
            if exists {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }

    /// Opens the current image, migrating a legacy image into it first.
    ///
    /// A backup left by an interrupted run is absorbed even when its legacy
    /// image is already gone. Running again after success is a no-op.
    pub fn run(&self) -> Result<(PlaygroundStore, MigrationReport), MigrationError> {
        let mut report = MigrationReport::default();
        let mut leftovers = Vec::new();

        let backup = match self.scan()? {
            Some(version) => {
                let path = self.image_path(version);
                info!(from = version.tag, path = %path.display(), "migrating legacy playground image");
                let backup = self.extract(version, &path)?;
                leftovers.push(path);
                Some(backup)
            }
            None => self.resume()?,
        };

        let current = CURRENT_VERSION.tag;
        let mut store = PlaygroundStore::open(&self.image_path(&CURRENT_VERSION))
            .map_err(|e| MigrationError::new(MigrationStage::Provision, current, e))?;

        if let Some(backup) = backup {
            let records = backup
                .rows
                .iter()
                .map(PlaygroundRecord::from_backup_row)
                .collect::<crate::Result<Vec<_>>>()
                .map_err(|e| MigrationError::new(MigrationStage::Absorb, &backup.from_version, e))?;
            let summary = store
                .absorb(&records)
                .map_err(|e| MigrationError::new(MigrationStage::Absorb, &backup.from_version, e))?;

            info!(
                from = %backup.from_version,
                absorbed = summary.absorbed,
                skipped = summary.skipped,
                "legacy playgrounds absorbed"
            );
            report.migrated_from = Some(backup.from_version);
            report.absorbed = summary.absorbed;
            report.skipped = summary.skipped;

            leftovers.insert(0, self.backup_path());
            report.warnings = cleanup(&leftovers);
        }

        Ok((store, report))
    }

    fn extract(
        &self,
        version: &PersistedImageVersion,
        path: &Path,
    ) -> Result<MigrationBackup, MigrationError> {
        let fail = |e: &dyn std::fmt::Display| {
            MigrationError::new(MigrationStage::Extract, version.tag, e)
        };

        let extraction = version
            .extraction
            .ok_or_else(|| fail(&"no extraction query"))?;
        let rows = legacy::extract_rows(path, extraction).map_err(|e| fail(&e))?;

        let backup = MigrationBackup {
            from_version: version.tag.to_string(),
            rows,
        };
        let content = serde_json::to_vec_pretty(&backup).map_err(|e| fail(&e))?;
        std::fs::write(self.backup_path(), content).map_err(|e| fail(&e))?;

        Ok(backup)
    }

    fn resume(&self) -> Result<Option<MigrationBackup>, MigrationError> {
        let path = self.backup_path();
        if !path.exists() {
            return Ok(None);
        }

        info!(path = %path.display(), "resuming interrupted migration");
        let fail = |tag: &str, e: &dyn std::fmt::Display| {
            MigrationError::new(MigrationStage::Absorb, tag, e)
        };
        let content = std::fs::read(&path).map_err(|e| fail("backup", &e))?;
        let raw: serde_json::Value =
            serde_json::from_slice(&content).map_err(|e| fail("backup", &e))?;
        let tag = raw
            .get("from_version")
            .and_then(|v| v.as_str())
            .unwrap_or("backup")
            .to_string();
        let backup = serde_json::from_value(raw).map_err(|e| fail(&tag, &e))?;
        Ok(Some(backup))
    }
}

/// Removes leftover files. Files already gone are not warnings.
fn cleanup(paths: &[PathBuf]) -> Vec<CleanupWarning> {
    let mut warnings = Vec::new();
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                let warning = CleanupWarning {
                    path: path.clone(),
                    message: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_reports_failures_and_ignores_missing() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("backup.json");
        let dir = temp_dir.path().join("not-a-file");
        std::fs::write(&file, "{}").unwrap();
        std::fs::create_dir(&dir).unwrap();

        let warnings = cleanup(&[file.clone(), temp_dir.path().join("gone.db"), dir.clone()]);

        assert!(!file.exists());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, dir);
    }

    #[test]
    fn test_fresh_directory_just_provisions() {
        let temp_dir = TempDir::new().unwrap();
        let migrator = Migrator::new(temp_dir.path(), "test");

        assert_eq!(migrator.scan().unwrap(), None);
        let (mut store, report) = migrator.run().unwrap();
        assert_eq!(report, MigrationReport::default());
        assert!(store.list().unwrap().is_empty());
        assert!(migrator.image_path(&CURRENT_VERSION).exists());
    }
}

//! On-disk image versions, oldest first.

use std::path::{Path, PathBuf};

use crate::legacy;

/// One persisted image layout.
#[derive(Debug, PartialEq, Eq)]
pub struct PersistedImageVersion {
    pub tag: &'static str,
    /// Projects this layout onto the current columns. `None` for the current version.
    pub(crate) extraction: Option<&'static str>,
}

pub static LEGACY_VERSIONS: [PersistedImageVersion; 2] = [
    PersistedImageVersion {
        tag: "v1",
        extraction: Some(legacy::V1_EXTRACT),
    },
    PersistedImageVersion {
        tag: "v2",
        extraction: Some(legacy::V2_EXTRACT),
    },
];

pub const CURRENT_VERSION: PersistedImageVersion = PersistedImageVersion {
    tag: "v3",
    extraction: None,
};

impl PersistedImageVersion {
    /// `<environment>-playgrounds-<tag>`
    pub fn storage_key(&self, environment: &str) -> String {
        format!("{}-playgrounds-{}", environment, self.tag)
    }

    pub fn image_path(&self, storage_dir: &Path, environment: &str) -> PathBuf {
        storage_dir.join(format!("{}.db", self.storage_key(environment)))
    }
}

pub fn backup_path(storage_dir: &Path, environment: &str) -> PathBuf {
    storage_dir.join(format!("{}-playgrounds-migration-backup.json", environment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys() {
        assert_eq!(LEGACY_VERSIONS[0].storage_key("dev"), "dev-playgrounds-v1");
        assert_eq!(
            CURRENT_VERSION.image_path(Path::new("/data"), "production"),
            PathBuf::from("/data/production-playgrounds-v3.db")
        );
        assert_eq!(
            backup_path(Path::new("/data"), "dev"),
            PathBuf::from("/data/dev-playgrounds-migration-backup.json")
        );
    }

    #[test]
    fn test_only_legacy_versions_have_extraction() {
        assert!(LEGACY_VERSIONS.iter().all(|v| v.extraction.is_some()));
        assert!(CURRENT_VERSION.extraction.is_none());
    }
}

use std::fmt;
use std::path::PathBuf;

/// Result type for sqlplay-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer
#[derive(Debug)]
pub enum Error {
    /// Statement failed on the current image
    Engine(sqlplay_engine::Error),

    /// Direct read of a legacy image failed
    Database(rusqlite::Error),

    /// Backup or files column could not be (de)serialized
    Json(serde_json::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// A stored row does not describe a valid playground
    Record(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Engine(err) => write!(f, "Store error: {}", err),
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Record(msg) => write!(f, "Invalid playground record: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            Error::Database(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Record(_) => None,
        }
    }
}

impl From<sqlplay_engine::Error> for Error {
    fn from(err: sqlplay_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Step of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStage {
    Scan,
    Extract,
    Provision,
    Absorb,
    Cleanup,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStage::Scan => "scan",
            MigrationStage::Extract => "extract",
            MigrationStage::Provision => "provision",
            MigrationStage::Absorb => "absorb",
            MigrationStage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// A migration step failed; the store was not opened.
#[derive(Debug)]
pub struct MigrationError {
    pub stage: MigrationStage,
    /// Tag of the image being read or written.
    pub version: String,
    pub message: String,
}

impl MigrationError {
    pub(crate) fn new(stage: MigrationStage, version: &str, err: impl fmt::Display) -> Self {
        Self {
            stage,
            version: version.to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Migration failed during {} ({}): {}",
            self.stage, self.version, self.message
        )
    }
}

impl std::error::Error for MigrationError {}

/// A leftover file that could not be removed after a successful migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not remove {}: {}", self.path.display(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_display() {
        let err = MigrationError::new(MigrationStage::Extract, "v1", "no such table: playground");
        assert_eq!(
            err.to_string(),
            "Migration failed during extract (v1): no such table: playground"
        );
    }
}

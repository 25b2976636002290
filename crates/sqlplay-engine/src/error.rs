use std::fmt;

use crate::schema::SchemaError;

/// Result type for sqlplay-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the engine layer
#[derive(Debug)]
pub enum Error {
    /// Schema text could not be parsed or compiled to DDL
    Schema(SchemaError),

    /// Engine failed to start or to apply DDL; the session is unusable
    Provisioning {
        statement: Option<String>,
        source: rusqlite::Error,
    },

    /// Statement failed on a ready session
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(err) => write!(f, "Schema error: {}", err),
            Error::Provisioning {
                statement: Some(statement),
                source,
            } => write!(
                f,
                "Failed to provision engine: {} (while applying `{}`)",
                source, statement
            ),
            Error::Provisioning {
                statement: None,
                source,
            } => write!(f, "Failed to provision engine: {}", source),
            Error::Database(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Schema(err) => Some(err),
            Error::Provisioning { source, .. } => Some(source),
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

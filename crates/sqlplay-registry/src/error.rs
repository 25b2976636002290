use std::fmt;

/// Result type for sqlplay-registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while resolving templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Dialect identifier is not in the catalog
    UnknownDialect(String),

    /// Dialect exists but has no preset with this id
    PresetNotFound { dialect: String, preset: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownDialect(name) => write!(f, "Unknown dialect: {}", name),
            Error::PresetNotFound { dialect, preset } => {
                write!(f, "Preset '{}' not found for dialect {}", preset, dialect)
            }
        }
    }
}

impl std::error::Error for Error {}

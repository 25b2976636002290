use std::fmt;

/// Result type for sqlplay-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur when parsing identifiers in the types layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Dialect identifier is not part of the catalog
    UnknownDialect(String),

    /// File name is not one of the canonical playground files
    UnknownFile(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownDialect(name) => write!(f, "Unknown dialect: {}", name),
            Error::UnknownFile(name) => write!(f, "Unknown playground file: {}", name),
        }
    }
}

impl std::error::Error for Error {}

use sqlplay_types::FileName;
use std::fmt;

/// Result type for sqlplay-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
///
/// Failures inside playground files are not errors here: they are reported
/// as `OutputEvent::Error` on the run's event stream.
#[derive(Debug)]
pub enum Error {
    /// Engine could not be provisioned
    Engine(sqlplay_engine::Error),

    /// Dialect or preset could not be resolved
    Registry(sqlplay_registry::Error),

    /// A required playground file is absent
    MissingFile(FileName),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Run worker thread failed
    Worker(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Engine(err) => write!(f, "Engine error: {}", err),
            Error::Registry(err) => write!(f, "{}", err),
            Error::MissingFile(name) => write!(f, "Playground is missing {}", name.file_name()),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Worker(msg) => write!(f, "Worker error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            Error::Registry(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::MissingFile(_) | Error::Config(_) | Error::Worker(_) => None,
        }
    }
}

impl From<sqlplay_engine::Error> for Error {
    fn from(err: sqlplay_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<sqlplay_registry::Error> for Error {
    fn from(err: sqlplay_registry::Error) -> Self {
        Error::Registry(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

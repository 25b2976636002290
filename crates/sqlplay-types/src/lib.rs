pub mod dialect;
pub mod error;
pub mod event;
pub mod files;
pub mod preset;
pub mod value;

pub use dialect::Dialect;
pub use error::{Error, Result};
pub use event::{ExecutionError, OutputEvent, QueryResult, StatementLogEntry};
pub use files::{FileName, PlaygroundFileTree};
pub use preset::PresetManifest;
pub use value::Value;

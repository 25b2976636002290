// Playground persistence
// The current image is a durable engine session; older images are migrated
// into it once, at bootstrap.

pub mod error;
mod legacy;
mod migrate;
mod records;
mod store;
pub mod versions;

pub use error::{CleanupWarning, Error, MigrationError, MigrationStage, Result};
pub use migrate::{MigrationBackup, MigrationReport, Migrator};
pub use records::PlaygroundRecord;
pub use store::{AbsorbSummary, PlaygroundStore};
pub use versions::{CURRENT_VERSION, LEGACY_VERSIONS, PersistedImageVersion};

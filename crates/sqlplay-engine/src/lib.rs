// Embedded engine sessions
// One rusqlite connection per playground session; schema text is compiled to
// dialect DDL before the session is handed out.

mod error;
mod functions;
pub mod identity;
pub mod schema;
mod session;

// Public API
pub use error::{Error, Result};
pub use identity::{ADMIN_ROLE, Identity, IdentityScope, ROLE_SETTING, SUBJECT_SETTING, with_identity};
pub use schema::{SchemaError, SchemaModule, compile};
pub use session::{EngineSession, Storage};

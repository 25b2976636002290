//! Row-access emulation.
//!
//! Runs a block inside one transaction with an emulated subject and role set
//! as session settings, the way policies read them through
//! `current_setting('request.jwt.claim.role')`. This is a testing aid for
//! access rules, not a security boundary.

use sqlplay_types::Value;
use tracing::debug;

use crate::{EngineSession, Error, Result};

/// Role reported when no identity is being emulated.
pub const ADMIN_ROLE: &str = "admin";
pub const SUBJECT_SETTING: &str = "request.jwt.claim.sub";
pub const ROLE_SETTING: &str = "request.jwt.claim.role";

/// Subject/role pair to impersonate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub role: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// Prepares an identity scope on `session`. Nothing is sent to the engine
/// until [`IdentityScope::run`] is called.
pub fn with_identity(identity: Identity, session: &mut EngineSession) -> IdentityScope<'_> {
    IdentityScope { identity, session }
}

pub struct IdentityScope<'s> {
    identity: Identity,
    session: &'s mut EngineSession,
}

impl IdentityScope<'_> {
    /// Runs `block` as the scoped identity.
    ///
    /// Both settings are reset before the transaction ends, whether the block
    /// succeeds, fails or panics. The transaction commits only on success.
    /// Inside an already open transaction the scope is a savepoint instead,
    /// and only the block's own writes are undone on failure.
    pub fn run<T, E, F>(self, block: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut EngineSession) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut tx = IdentityTransaction::begin(self.session, &self.identity)?;
        let outcome = block(&mut *tx.session);
        let reset = tx.reset();

        match (outcome, reset) {
            (Ok(value), Ok(())) => {
                tx.commit()?;
                Ok(value)
            }
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), _) => Err(err),
        }
    }
}

const SAVEPOINT: &str = "identity_scope";

struct IdentityTransaction<'s> {
    session: &'s mut EngineSession,
    nested: bool,
    reset_done: bool,
    finished: bool,
}

impl<'s> IdentityTransaction<'s> {
    fn begin(session: &'s mut EngineSession, identity: &Identity) -> Result<Self> {
        let nested = session.in_transaction();
        if nested {
            session.execute(&format!("SAVEPOINT {}", SAVEPOINT), &[])?;
        } else {
            session.execute("BEGIN", &[])?;
        }
        debug!(subject = %identity.subject, role = %identity.role, nested, "identity scope opened");

        let mut tx = Self {
            session,
            nested,
            reset_done: false,
            finished: false,
        };
        tx.set(SUBJECT_SETTING, Value::from(identity.subject.as_str()))?;
        tx.set(ROLE_SETTING, Value::from(identity.role.as_str()))?;
        Ok(tx)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        self.session.execute(
            "SELECT set_config(?1, ?2, 1)",
            &[Value::from(name), value],
        )?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.set(SUBJECT_SETTING, Value::Null)?;
        self.set(ROLE_SETTING, Value::Null)?;
        self.reset_done = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.nested {
            self.session.execute(&format!("RELEASE SAVEPOINT {}", SAVEPOINT), &[])?;
        } else {
            self.session.execute("COMMIT", &[])?;
        }
        self.finished = true;
        Ok(())
    }
}

impl Drop for IdentityTransaction<'_> {
    fn drop(&mut self) {
        if !self.reset_done {
            self.session.clear_identity();
        }
        if self.finished || !self.session.in_transaction() {
            return;
        }
        if self.nested {
            let _ = self
                .session
                .execute(&format!("ROLLBACK TO SAVEPOINT {}", SAVEPOINT), &[]);
            let _ = self
                .session
                .execute(&format!("RELEASE SAVEPOINT {}", SAVEPOINT), &[]);
        } else {
            let _ = self.session.execute("ROLLBACK", &[]);
        }
    }
}

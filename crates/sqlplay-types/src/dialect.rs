use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// SQL variant a playground targets.
///
/// Selects the engine bootstrap, the file templates and the DDL renderer.
/// A playground keeps the same dialect for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgresql,
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Postgresql, Dialect::Sqlite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgresql => "postgresql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Dialect::Postgresql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect_aliases() {
        assert_eq!("postgresql".parse::<Dialect>().unwrap(), Dialect::Postgresql);
        assert_eq!("PG".parse::<Dialect>().unwrap(), Dialect::Postgresql);
        assert_eq!(" sqlite ".parse::<Dialect>().unwrap(), Dialect::Sqlite);
    }

    #[test]
    fn test_unknown_dialect_is_typed_error() {
        let err = "mysql".parse::<Dialect>().unwrap_err();
        assert_eq!(err, Error::UnknownDialect("mysql".to_string()));
    }

    #[test]
    fn test_dialect_serde_roundtrip_uses_identifier() {
        let json = serde_json::to_string(&Dialect::Postgresql).unwrap();
        assert_eq!(json, "\"postgresql\"");
    }
}

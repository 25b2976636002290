//! Playground script language.
//!
//! Scripts are sequences of `;`-terminated statements. Lines that are not one
//! of the script forms are SQL, sent to the engine with `:name` bindings and
//! `$fn(...)` toolkit calls turned into positional parameters.
//!
//! ```text
//! export let owner = $uuid();
//! insert into users (id, name) values (:owner, $name());
//! repeat 3 {
//!   insert into posts (author_id, title) values (:owner, $sentence());
//! }
//! let total = query select count(*) from posts;
//! log 'posts:', total;
//! ```

mod lexer;
mod parser;
mod sql;

use sqlplay_types::Value;
use std::fmt;

pub use sql::SqlTemplate;

/// A parsed playground file.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

impl Script {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let chunks = lexer::split(source)?;
        let statements = parser::parse(&chunks)?;
        Ok(Self { statements })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// 1-based line the statement starts on.
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Let {
        name: String,
        exported: bool,
        value: Expr,
    },
    Log(Vec<Expr>),
    Print(SqlTemplate),
    Sleep(Expr),
    Repeat {
        count: Expr,
        body: Vec<Statement>,
    },
    WithIdentity {
        subject: Expr,
        role: Expr,
        body: Vec<Statement>,
    },
    Try(Vec<Statement>),
    Sql(SqlTemplate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Binding(String),
    /// Toolkit function, written `$name(args)`.
    Call { name: String, args: Vec<Expr> },
    /// First column of the first row, or null.
    Query(SqlTemplate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

//! Declarative schema language.
//!
//! A schema file declares tables, indexes and access policies:
//!
//! ```text
//! table users {
//!   id    serial pk
//!   name  text not null
//! }
//! table posts {
//!   id        serial pk
//!   author_id int not null -> users.id on delete cascade
//! }
//! unique index posts_author on posts(author_id)
//! policy readers_read_only on posts deny insert, update, delete for reader
//! ```
//!
//! [`compile`] turns a parsed module into dialect DDL, ordered so that every
//! referenced table is created before the tables pointing at it.

mod parser;
mod render;

use std::fmt;
use std::str::FromStr;

pub use render::{DdlRenderer, PostgresRenderer, SqliteRenderer, compile, renderer_for};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModule {
    pub tables: Vec<TableDef>,
    pub indexes: Vec<IndexDef>,
    pub policies: Vec<PolicyDef>,
}

impl SchemaModule {
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        parser::parse(source)
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }
}

impl FromStr for SchemaModule {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub line: usize,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Tables this one references, excluding itself.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref())
            .map(|fk| fk.table.as_str())
            .filter(move |table| *table != self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
    pub references: Option<ForeignKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Serial,
    Text,
    Bool,
    Real,
    Timestamp,
    Date,
    Json,
    Uuid,
}

impl ColumnType {
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "int" | "integer" => ColumnType::Int,
            "bigint" => ColumnType::BigInt,
            "serial" => ColumnType::Serial,
            "text" | "string" => ColumnType::Text,
            "bool" | "boolean" => ColumnType::Bool,
            "real" | "float" | "double" => ColumnType::Real,
            "timestamp" => ColumnType::Timestamp,
            "date" => ColumnType::Date,
            "json" => ColumnType::Json,
            "uuid" => ColumnType::Uuid,
            _ => return None,
        };
        Some(ty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Now,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_delete_cascade: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDef {
    pub name: String,
    pub table: String,
    pub operations: Vec<PolicyOperation>,
    pub role: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOperation {
    Insert,
    Update,
    Delete,
}

impl PolicyOperation {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "insert" => Some(PolicyOperation::Insert),
            "update" => Some(PolicyOperation::Update),
            "delete" => Some(PolicyOperation::Delete),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            PolicyOperation::Insert => "INSERT",
            PolicyOperation::Update => "UPDATE",
            PolicyOperation::Delete => "DELETE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyOperation::Insert => "insert",
            PolicyOperation::Update => "update",
            PolicyOperation::Delete => "delete",
        }
    }
}

/// Schema text failed to parse or validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// 1-based line, 0 when the error is not tied to a line.
    pub line: usize,
    pub message: String,
}

impl SchemaError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "schema: {}", self.message)
        } else {
            write!(f, "schema:{}: {}", self.line, self.message)
        }
    }
}

impl std::error::Error for SchemaError {}

use std::collections::HashSet;

use sqlplay_types::Dialect;

use super::{
    ColumnDef, ColumnType, DefaultValue, IndexDef, PolicyDef, SchemaError, SchemaModule, TableDef,
};
use crate::identity::ROLE_SETTING;

/// Dialect-specific DDL spelling.
///
/// Both renderers target the embedded engine; the PostgreSQL renderer uses
/// PostgreSQL type names and literals the engine accepts as-is.
pub trait DdlRenderer: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn column_type(&self, ty: ColumnType) -> &'static str;

    /// Column constraint for an auto-incrementing single primary key.
    fn serial_primary_key(&self) -> &'static str;

    fn bool_literal(&self, value: bool) -> &'static str;

    fn default_literal(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Bool(b) => self.bool_literal(*b).to_string(),
            DefaultValue::Integer(n) => n.to_string(),
            DefaultValue::Real(r) => r.to_string(),
            DefaultValue::Text(s) => quote_literal(s),
            DefaultValue::Now => "CURRENT_TIMESTAMP".to_string(),
        }
    }

    fn column(&self, column: &ColumnDef, single_primary_key: bool) -> String {
        let mut sql = format!("{} {}", quote_ident(&column.name), self.column_type(column.ty));

        if column.ty == ColumnType::Serial {
            sql.push(' ');
            sql.push_str(self.serial_primary_key());
        } else {
            if column.not_null || column.primary_key {
                sql.push_str(" NOT NULL");
            }
            if column.primary_key && single_primary_key {
                sql.push_str(" PRIMARY KEY");
            }
        }
        if column.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.default_literal(default));
        }
        if let Some(fk) = &column.references {
            sql.push_str(&format!(
                " REFERENCES {}({})",
                quote_ident(&fk.table),
                quote_ident(&fk.column)
            ));
            if fk.on_delete_cascade {
                sql.push_str(" ON DELETE CASCADE");
            }
        }
        sql
    }

    fn create_table(&self, table: &TableDef) -> String {
        let primary_key = table.primary_key();
        let single = primary_key.len() == 1;

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column(c, single))
            .collect();

        if primary_key.len() > 1 {
            let names: Vec<String> = primary_key.iter().map(|c| quote_ident(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&table.name),
            parts.join(", ")
        )
    }

    fn create_index(&self, index: &IndexDef) -> String {
        let columns: Vec<String> = index.columns.iter().map(|c| quote_ident(c)).collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            quote_ident(&index.name),
            quote_ident(&index.table),
            columns.join(", ")
        )
    }

    /// One guard trigger per denied operation.
    fn create_policy(&self, policy: &PolicyDef) -> Vec<String> {
        policy
            .operations
            .iter()
            .map(|op| {
                format!(
                    "CREATE TRIGGER IF NOT EXISTS {} BEFORE {} ON {} FOR EACH ROW \
                     WHEN current_setting({}) = {} \
                     BEGIN SELECT RAISE(ABORT, {}); END",
                    quote_ident(&format!("{}_{}", policy.name, op.as_str())),
                    op.as_sql(),
                    quote_ident(&policy.table),
                    quote_literal(ROLE_SETTING),
                    quote_literal(&policy.role),
                    quote_literal(&format!("permission denied for table {}", policy.table)),
                )
            })
            .collect()
    }
}

pub struct SqliteRenderer;

impl DdlRenderer for SqliteRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Int | ColumnType::BigInt | ColumnType::Serial | ColumnType::Bool => {
                "INTEGER"
            }
            ColumnType::Real => "REAL",
            ColumnType::Text
            | ColumnType::Timestamp
            | ColumnType::Date
            | ColumnType::Json
            | ColumnType::Uuid => "TEXT",
        }
    }

    fn serial_primary_key(&self) -> &'static str {
        "PRIMARY KEY AUTOINCREMENT"
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }
}

pub struct PostgresRenderer;

impl DdlRenderer for PostgresRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Int | ColumnType::Serial => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Text => "text",
            ColumnType::Bool => "boolean",
            ColumnType::Real => "double precision",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::Date => "date",
            ColumnType::Json => "jsonb",
            ColumnType::Uuid => "uuid",
        }
    }

    // `integer PRIMARY KEY` is the engine's row id alias, so ids are assigned
    // the way a serial column would assign them.
    fn serial_primary_key(&self) -> &'static str {
        "PRIMARY KEY"
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }
}

pub fn renderer_for(dialect: Dialect) -> &'static dyn DdlRenderer {
    match dialect {
        Dialect::Sqlite => &SqliteRenderer,
        Dialect::Postgresql => &PostgresRenderer,
    }
}

/// Compiles a schema module into ordered DDL for `dialect`.
///
/// Tables come first in dependency order, then indexes, then policy
/// triggers.
pub fn compile(schema: &SchemaModule, dialect: Dialect) -> Result<Vec<String>, SchemaError> {
    validate(schema)?;
    let renderer = renderer_for(dialect);

    let mut statements: Vec<String> = dependency_order(schema)?
        .into_iter()
        .map(|table| renderer.create_table(table))
        .collect();
    statements.extend(schema.indexes.iter().map(|i| renderer.create_index(i)));
    statements.extend(schema.policies.iter().flat_map(|p| renderer.create_policy(p)));

    Ok(statements)
}

fn validate(schema: &SchemaModule) -> Result<(), SchemaError> {
    let mut table_names = HashSet::new();
    for table in &schema.tables {
        if !table_names.insert(table.name.as_str()) {
            return Err(SchemaError::new(
                table.line,
                format!("table `{}` is declared twice", table.name),
            ));
        }

        let mut column_names = HashSet::new();
        for column in &table.columns {
            if !column_names.insert(column.name.as_str()) {
                return Err(SchemaError::new(
                    table.line,
                    format!("column `{}.{}` is declared twice", table.name, column.name),
                ));
            }
        }

        let primary_key = table.primary_key();
        for column in &table.columns {
            if column.ty == ColumnType::Serial && !(column.primary_key && primary_key.len() == 1) {
                return Err(SchemaError::new(
                    table.line,
                    format!(
                        "serial column `{}.{}` must be the only primary key",
                        table.name, column.name
                    ),
                ));
            }
        }
    }

    for table in &schema.tables {
        for column in &table.columns {
            let Some(fk) = &column.references else {
                continue;
            };
            let target = schema.table(&fk.table).ok_or_else(|| {
                SchemaError::new(
                    table.line,
                    format!(
                        "column `{}.{}` references unknown table `{}`",
                        table.name, column.name, fk.table
                    ),
                )
            })?;
            if target.column(&fk.column).is_none() {
                return Err(SchemaError::new(
                    table.line,
                    format!(
                        "column `{}.{}` references unknown column `{}.{}`",
                        table.name, column.name, fk.table, fk.column
                    ),
                ));
            }
        }
    }

    let mut index_names = HashSet::new();
    for index in &schema.indexes {
        if !index_names.insert(index.name.as_str()) {
            return Err(SchemaError::new(
                index.line,
                format!("index `{}` is declared twice", index.name),
            ));
        }
        let table = schema.table(&index.table).ok_or_else(|| {
            SchemaError::new(
                index.line,
                format!("index `{}` is on unknown table `{}`", index.name, index.table),
            )
        })?;
        if let Some(missing) = index.columns.iter().find(|c| table.column(c).is_none()) {
            return Err(SchemaError::new(
                index.line,
                format!(
                    "index `{}` uses unknown column `{}.{}`",
                    index.name, index.table, missing
                ),
            ));
        }
    }

    for policy in &schema.policies {
        if schema.table(&policy.table).is_none() {
            return Err(SchemaError::new(
                policy.line,
                format!("policy `{}` is on unknown table `{}`", policy.name, policy.table),
            ));
        }
    }

    Ok(())
}

/// Stable topological order: among ready tables, declaration order wins.
fn dependency_order(schema: &SchemaModule) -> Result<Vec<&TableDef>, SchemaError> {
    let mut created: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&TableDef> = schema.tables.iter().collect();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|table| table.dependencies().all(|dep| created.contains(dep)));

        let Some(index) = ready else {
            let names: Vec<&str> = pending.iter().map(|t| t.name.as_str()).collect();
            return Err(SchemaError::new(
                pending[0].line,
                format!(
                    "circular foreign key dependency between tables: {}",
                    names.join(", ")
                ),
            ));
        };

        let table = pending.remove(index);
        created.insert(table.name.as_str());
        ordered.push(table);
    }

    Ok(ordered)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

use std::collections::HashMap;

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    dataset::{Column, ColumnType},
    error::LoadError,
};

/// Suffix of the table a load is written into before it replaces the target.
pub const SHADOW_SUFFIX: &str = "__load";

/// Postgres allows 63 bytes, minus room for [`SHADOW_SUFFIX`].
const MAX_TABLE_NAME_LEN: usize = 56;

/// Postgres truncates longer identifiers instead of rejecting them.
const MAX_PG_IDENT_LEN: usize = 63;

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    DuckDb,
}

impl Dialect {
    pub fn type_name(&self, kind: ColumnType) -> &'static str {
        match (self, kind) {
            (_, ColumnType::Integer) => "BIGINT",
            (Dialect::Postgres, ColumnType::Float) => "DOUBLE PRECISION",
            (Dialect::DuckDb, ColumnType::Float) => "DOUBLE",
            (Dialect::Postgres, ColumnType::Text) => "TEXT",
            (Dialect::DuckDb, ColumnType::Text) => "VARCHAR",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::DuckDb => "duckdb",
        }
    }

    /// The form two column names are compared in; DuckDB ignores case even
    /// for quoted identifiers.
    fn column_key(&self, name: &str) -> String {
        match self {
            Dialect::Postgres => name.to_string(),
            Dialect::DuckDb => name.to_lowercase(),
        }
    }
}

/// Check that every header name can be a distinct column of one table.
pub fn check_columns(dialect: Dialect, columns: &[Column]) -> Result<(), LoadError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for column in columns {
        if dialect == Dialect::Postgres && column.name.len() > MAX_PG_IDENT_LEN {
            return Err(LoadError::ColumnNameTooLong {
                backend: dialect.name(),
                name: column.name.clone(),
                len: column.name.len(),
                max: MAX_PG_IDENT_LEN,
            });
        }
        if let Some(first) = seen.insert(dialect.column_key(&column.name), &column.name) {
            return Err(LoadError::ColumnNameClash {
                backend: dialect.name(),
                first: first.to_string(),
                second: column.name.clone(),
            });
        }
    }
    Ok(())
}

/// Double-quote an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn validate_table_name(name: &str) -> Result<(), LoadError> {
    if name.len() > MAX_TABLE_NAME_LEN || !TABLE_NAME.is_match(name) {
        return Err(LoadError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

pub fn shadow_table_name(table: &str) -> String {
    format!("{}{}", table, SHADOW_SUFFIX)
}

/// `CREATE TABLE` statement with one nullable column per dataset column.
pub fn create_table(dialect: Dialect, table: &str, columns: &[Column]) -> String {
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), dialect.type_name(c.kind)))
            .join(", ")
    )
}

pub fn column_list(columns: &[Column]) -> String {
    columns.iter().map(|c| quote_ident(&c.name)).join(", ")
}

use std::path::Path;

use duckdb::{
    params,
    types::{ToSqlOutput, Value as DuckValue, ValueRef},
    Connection, ToSql,
};
use log::info;

use crate::{
    dataset::{Dataset, Value},
    db::{
        sql::{self, Dialect},
        StagingStore,
    },
    error::LoadError,
};

/// Staging table kept in a local DuckDB database.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    pub fn open(duckdb_path: &Path) -> Result<DuckDbStore, LoadError> {
        Ok(DuckDbStore {
            conn: Connection::open(duckdb_path)?,
        })
    }

    pub fn open_in_memory() -> Result<DuckDbStore, LoadError> {
        Ok(DuckDbStore {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Column names of `table`, in table order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>, LoadError> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let names = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, duckdb::Error>>()?;
        Ok(names)
    }
}

impl StagingStore for DuckDbStore {
    fn backend(&self) -> &'static str {
        "DuckDB"
    }

    /// Drop, create and fill the table inside one transaction.  Other
    /// connections keep seeing the old table until the commit.
    fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<u64, LoadError> {
        sql::validate_table_name(table)?;
        sql::check_columns(Dialect::DuckDb, dataset.columns())?;
        let columns = dataset.columns();
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; {};",
            sql::quote_ident(table),
            sql::create_table(Dialect::DuckDb, table, columns)
        ))?;
        let mut n: u64 = 0;
        {
            let placeholders = vec!["?"; columns.len()].join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                sql::quote_ident(table),
                sql::column_list(columns),
                placeholders
            ))?;
            for row in dataset.rows() {
                let values: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
                n += stmt.execute(values.as_slice())? as u64;
            }
        }
        tx.commit()?;
        info!("replaced table {} with {} rows", table, n);
        Ok(n)
    }

    fn row_count(&mut self, table: &str) -> Result<u64, LoadError> {
        sql::validate_table_name(table)?;
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", sql::quote_ident(table)),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(n as u64)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(DuckValue::Null),
            Value::Int(v) => ToSqlOutput::Owned(DuckValue::BigInt(*v)),
            Value::Float(v) => ToSqlOutput::Owned(DuckValue::Double(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

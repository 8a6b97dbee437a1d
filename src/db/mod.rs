pub mod duckdb_store;
pub mod postgres_store;
pub mod sql;

use crate::{dataset::Dataset, error::LoadError};

/// A relational store that can hold the staging table.
pub trait StagingStore {
    /// Short name used in log messages, e.g. "Postgres".
    fn backend(&self) -> &'static str;

    /// Replace `table` with the contents of `dataset`.  Readers of the table
    /// see either the old rows or the new rows, never a mix.  On error the old
    /// table is left as it was.  Returns the number of rows written.
    fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<u64, LoadError>;

    fn row_count(&mut self, table: &str) -> Result<u64, LoadError>;
}

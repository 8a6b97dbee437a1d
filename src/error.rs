use std::{io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("could not load dotenv file {path}: {source}")]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("could not build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
    #[error("could not write {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} has no header row")]
    MissingHeader { path: PathBuf },
    #[error("{path}, line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        path: PathBuf,
        line: u64,
        expected: u64,
        found: u64,
    },
    #[error("{path}, line {line}: invalid UTF-8")]
    Encoding { path: PathBuf, line: u64 },
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("invalid table name {0:?}")]
    InvalidTableName(String),
    #[error("postgres: {0}")]
    Postgres(#[from] postgres::Error),
    #[error("duckdb: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("column name {name:?} is {len} bytes, {backend} allows at most {max}")]
    ColumnNameTooLong {
        backend: &'static str,
        name: String,
        len: usize,
        max: usize,
    },
    #[error("columns {first:?} and {second:?} are the same name to {backend}")]
    ColumnNameClash {
        backend: &'static str,
        first: String,
        second: String,
    },
    #[error("table {table} holds {found} rows after the load, expected {expected}")]
    RowCountMismatch {
        table: String,
        expected: u64,
        found: u64,
    },
    #[error("{written} rows were written to {table}, expected {expected}")]
    WrittenCountMismatch {
        table: String,
        expected: u64,
        written: u64,
    },
}

/// Failure of a pipeline run, tagged with the stage that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("fetch stage failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("parse stage failed: {0}")]
    Parse(#[from] ParseError),
    #[error("load stage failed: {0}")]
    Load(#[from] LoadError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Parse(_) => "parse",
            PipelineError::Load(_) => "load",
        }
    }
}

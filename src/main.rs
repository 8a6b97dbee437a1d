use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use enterprise_etl::{
    config::{Config, PgSettings, STAGING_TABLE},
    dataset::Dataset,
    db::{
        duckdb_store::DuckDbStore,
        postgres_store::PostgresStore,
        sql::{Dialect, SHADOW_SUFFIX},
        StagingStore,
    },
    error::{ConfigError, PipelineError},
    pipeline,
};
use log::{error, info};
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Postgres,
    Duckdb,
}

#[derive(Parser, Debug)]
#[command(version, about = "Download the annual enterprise CSV and load it into a staging table", long_about = None)]
struct Args {
    /// Dotenv file with the settings, instead of `./.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Where the staging table lives
    #[arg(long, value_enum, default_value_t = StoreKind::Postgres)]
    store: StoreKind,

    /// DuckDB database file, used with `--store duckdb`
    #[arg(long, default_value = "staging.duckdb")]
    duckdb_path: PathBuf,

    /// Staging table to replace
    #[arg(long, default_value = STAGING_TABLE)]
    table: String,
}

/// Make an ASCII table with the columns that were loaded
fn ascii_table(dataset: &Dataset, dialect: Dialect) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Column", "Type", "Non-null"]);
    for (column, count) in dataset.columns().iter().zip(dataset.non_null_counts()) {
        builder.push_record(vec![
            column.name.clone(),
            dialect.type_name(column.kind).to_string(),
            count.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

fn load_env(args: &Args) -> Result<(), ConfigError> {
    match &args.env_file {
        Some(path) => dotenvy::from_path(path).map_err(|e| ConfigError::Dotenv {
            path: path.clone(),
            source: e,
        }),
        None => {
            // a missing ./.env is fine, the variables may come from the shell
            if let Ok(path) = dotenvy::dotenv() {
                info!("loaded settings from {}", path.display());
            }
            Ok(())
        }
    }
}

fn open_store(args: &Args) -> Result<(Box<dyn StagingStore>, Dialect), PipelineError> {
    match args.store {
        StoreKind::Postgres => {
            let settings = PgSettings::from_env()?;
            info!("using {:?}", settings);
            let store: Box<dyn StagingStore> = Box::new(PostgresStore::connect(&settings)?);
            Ok((store, Dialect::Postgres))
        }
        StoreKind::Duckdb => {
            info!("using DuckDB file {}", args.duckdb_path.display());
            let store: Box<dyn StagingStore> = Box::new(DuckDbStore::open(&args.duckdb_path)?);
            Ok((store, Dialect::DuckDb))
        }
    }
}

fn run(args: &Args) -> Result<(), PipelineError> {
    load_env(args)?;
    let config = Config::from_env()?.with_staging_table(args.table.clone());
    let (mut store, dialect) = open_store(args)?;

    let summary = pipeline::run(&config, store.as_mut())?;
    println!("{}", ascii_table(&summary.dataset, dialect));
    info!(
        "{} rows from {} ({} bytes) are in table {}",
        summary.rows_loaded,
        summary.csv_path.display(),
        summary.bytes_downloaded,
        summary.table
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    if args.table.ends_with(SHADOW_SUFFIX) {
        error!("table names ending in {} are reserved", SHADOW_SUFFIX);
        return ExitCode::FAILURE;
    }
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

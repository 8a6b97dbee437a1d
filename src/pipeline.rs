use std::path::{Path, PathBuf};

use log::info;

use crate::{
    config::Config,
    dataset::Dataset,
    db::StagingStore,
    error::{LoadError, PipelineError},
    fetch, parse,
};

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub csv_path: PathBuf,
    pub bytes_downloaded: u64,
    pub table: String,
    pub rows_loaded: u64,
    pub dataset: Dataset,
}

/// Download the CSV file to `DOWNLOAD_DIR`.
pub fn fetch_stage(config: &Config) -> Result<(PathBuf, u64), PipelineError> {
    info!("Downloading CSV file from {}", config.csv_url);
    let client = fetch::http_client(config.http_timeout)?;
    let path = config.download_path();
    let n = fetch::download_file(&client, &config.csv_url, &path)?;
    Ok((path, n))
}

pub fn parse_stage(csv_path: &Path) -> Result<Dataset, PipelineError> {
    info!("Reading CSV file {}", csv_path.display());
    Ok(parse::read_csv(csv_path)?)
}

/// Replace the staging table and check the row count that landed.
pub fn load_stage(
    config: &Config,
    store: &mut dyn StagingStore,
    dataset: &Dataset,
) -> Result<u64, PipelineError> {
    info!(
        "Loading {} rows into {} table {}",
        dataset.len(),
        store.backend(),
        config.staging_table
    );
    let expected = dataset.len() as u64;
    let written = store.replace_table(&config.staging_table, dataset)?;
    if written != expected {
        return Err(LoadError::WrittenCountMismatch {
            table: config.staging_table.clone(),
            expected,
            written,
        }
        .into());
    }
    let found = store.row_count(&config.staging_table)?;
    if found != expected {
        return Err(LoadError::RowCountMismatch {
            table: config.staging_table.clone(),
            expected,
            found,
        }
        .into());
    }
    Ok(found)
}

/// Run fetch, parse and load in order, stopping at the first error.  The
/// staging table is only touched once the file has been downloaded and parsed
/// in full.
pub fn run(config: &Config, store: &mut dyn StagingStore) -> Result<RunSummary, PipelineError> {
    let (csv_path, bytes_downloaded) = fetch_stage(config)?;
    let dataset = parse_stage(&csv_path)?;
    let rows_loaded = load_stage(config, store, &dataset)?;
    info!(
        "Data successfully loaded to {} table.",
        config.staging_table
    );
    Ok(RunSummary {
        csv_path,
        bytes_downloaded,
        table: config.staging_table.clone(),
        rows_loaded,
        dataset,
    })
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, time::Duration};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        db::duckdb_store::DuckDbStore, error::FetchError, testing::serve_once,
    };

    /// Reports one row more than it wrote.
    struct OvercountingStore(DuckDbStore);

    impl StagingStore for OvercountingStore {
        fn backend(&self) -> &'static str {
            self.0.backend()
        }

        fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<u64, LoadError> {
            Ok(self.0.replace_table(table, dataset)? + 1)
        }

        fn row_count(&mut self, table: &str) -> Result<u64, LoadError> {
            self.0.row_count(table)
        }
    }

    const SAMPLE: &[u8] = b"year,industry_name,value\n2020,Retail,1000\n2021,Retail,1100\n";

    fn config(dir: &TempDir, url: &str) -> Config {
        Config {
            csv_url: url.to_string(),
            download_dir: dir.path().to_path_buf(),
            staging_table: "staging_enterprise".to_string(),
            http_timeout: Duration::from_secs(5),
        }
    }

    fn run_with(dir: &TempDir, store: &mut DuckDbStore, body: &[u8]) -> Result<RunSummary, PipelineError> {
        let (url, server) = serve_once(200, body);
        let result = run(&config(dir, &url), store);
        server.join().unwrap();
        result
    }

    fn table_contents(store: &DuckDbStore) -> Vec<(i64, String, i64)> {
        let mut stmt = store
            .connection()
            .prepare("SELECT year, industry_name, value FROM staging_enterprise ORDER BY year")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn loads_enterprise_sample() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = DuckDbStore::open_in_memory()?;
        let summary = run_with(&dir, &mut store, SAMPLE)?;

        assert_eq!(summary.rows_loaded, 2);
        assert_eq!(summary.bytes_downloaded, SAMPLE.len() as u64);
        assert_eq!(summary.csv_path, dir.path().join("annual-enterprise.csv"));
        assert_eq!(
            store.column_names("staging_enterprise")?,
            vec!["year", "industry_name", "value"]
        );
        assert_eq!(
            table_contents(&store),
            vec![
                (2020, "Retail".to_string(), 1000),
                (2021, "Retail".to_string(), 1100)
            ]
        );
        Ok(())
    }

    #[test]
    fn rerun_is_idempotent() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = DuckDbStore::open_in_memory()?;
        run_with(&dir, &mut store, SAMPLE)?;
        let first = table_contents(&store);
        run_with(&dir, &mut store, SAMPLE)?;
        assert_eq!(table_contents(&store), first);
        assert_eq!(store.row_count("staging_enterprise")?, 2);
        Ok(())
    }

    #[test]
    fn unreachable_source_leaves_table_alone() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = DuckDbStore::open_in_memory()?;
        run_with(&dir, &mut store, SAMPLE)?;

        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/annual-enterprise.csv", port);
        let err = run(&config(&dir, &url), &mut store).unwrap_err();
        assert_eq!(err.stage(), "fetch");
        assert!(matches!(
            err,
            PipelineError::Fetch(FetchError::Transport { .. })
        ));
        assert_eq!(table_contents(&store).len(), 2);
        Ok(())
    }

    #[test]
    fn malformed_csv_creates_no_table() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = DuckDbStore::open_in_memory()?;
        let err = run_with(
            &dir,
            &mut store,
            b"year,industry_name,value\n2020,Retail,1000\n2021,Retail\n",
        )
        .unwrap_err();
        assert_eq!(err.stage(), "parse");
        assert!(err.to_string().starts_with("parse stage failed"));
        assert!(store.column_names("staging_enterprise")?.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_csv_keeps_previous_table() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = DuckDbStore::open_in_memory()?;
        run_with(&dir, &mut store, SAMPLE)?;
        let err = run_with(&dir, &mut store, b"a,b\n1,2,3\n").unwrap_err();
        assert_eq!(err.stage(), "parse");
        assert_eq!(table_contents(&store).len(), 2);
        Ok(())
    }

    #[test]
    fn header_names_clashing_in_duckdb_fail_the_load() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = DuckDbStore::open_in_memory()?;
        let err = run_with(&dir, &mut store, b"Year,year\n1,2\n").unwrap_err();
        assert_eq!(err.stage(), "load");
        assert!(matches!(
            err,
            PipelineError::Load(LoadError::ColumnNameClash { .. })
        ));
        assert!(store.column_names("staging_enterprise")?.is_empty());
        Ok(())
    }

    #[test]
    fn written_count_mismatch_is_reported_as_such() -> Result<(), PipelineError> {
        let dir = TempDir::new().unwrap();
        let mut store = OvercountingStore(DuckDbStore::open_in_memory()?);
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let dataset = parse_stage(&path)?;
        let err = load_stage(&config(&dir, "http://unused"), &mut store, &dataset).unwrap_err();
        match err {
            PipelineError::Load(LoadError::WrittenCountMismatch { expected, written, .. }) => {
                assert_eq!(expected, 2);
                assert_eq!(written, 3);
            }
            other => panic!("expected a written count mismatch, got {:?}", other),
        }
        Ok(())
    }
}

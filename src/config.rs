use std::{env, fmt, path::PathBuf, time::Duration};

use crate::error::ConfigError;

/// Name of the downloaded file, placed directly under `DOWNLOAD_DIR`.
pub const CSV_FILE_NAME: &str = "annual-enterprise.csv";

/// Destination table for every run.
pub const STAGING_TABLE: &str = "staging_enterprise";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Pipeline settings, read once at startup and then passed by reference to
/// each stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub csv_url: String,
    pub download_dir: PathBuf,
    pub staging_table: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.  Empty
    /// values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_timeout = match non_empty(&lookup, "HTTP_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: "HTTP_TIMEOUT_SECS",
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };
        Ok(Config {
            csv_url: required(&lookup, "CSV_URL")?,
            download_dir: PathBuf::from(required(&lookup, "DOWNLOAD_DIR")?),
            staging_table: STAGING_TABLE.to_string(),
            http_timeout,
        })
    }

    pub fn with_staging_table<S: Into<String>>(mut self, table: S) -> Config {
        self.staging_table = table.into();
        self
    }

    /// Full path of the local copy of the CSV file.
    pub fn download_path(&self) -> PathBuf {
        self.download_dir.join(CSV_FILE_NAME)
    }
}

/// Connection parameters for the Postgres store.
#[derive(Clone, PartialEq)]
pub struct PgSettings {
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub host: String,
    pub port: u16,
}

impl PgSettings {
    pub fn from_env() -> Result<PgSettings, ConfigError> {
        PgSettings::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<PgSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = required(&lookup, "PG_PORT")?;
        let port = port.parse::<u16>().map_err(|e| ConfigError::Invalid {
            name: "PG_PORT",
            value: port.clone(),
            reason: e.to_string(),
        })?;
        Ok(PgSettings {
            user: required(&lookup, "POSTGRES_USER")?,
            password: required(&lookup, "POSTGRES_PASSWORD")?,
            dbname: required(&lookup, "POSTGRES_DB")?,
            host: required(&lookup, "PG_HOST")?,
            port,
        })
    }
}

impl fmt::Debug for PgSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSettings")
            .field("user", &self.user)
            .field("password", &"********")
            .field("dbname", &self.dbname)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

fn non_empty<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, name).ok_or(ConfigError::Missing(name))
}

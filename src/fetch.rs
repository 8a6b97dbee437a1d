use std::{
    fs::{self, File},
    io::Write,
    path::Path,
    time::Duration,
};

use log::info;
use reqwest::{blocking::Client, header::USER_AGENT};

use crate::error::FetchError;

/// Blocking client used for the download.  Redirects are followed.
pub fn http_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)
}

/// Download `url` to `file_path`, replacing any existing file.  Return the
/// number of bytes written.
///
/// The body goes to a `.part` file next to the destination which is then
/// renamed, so a failed download leaves the previous file untouched.
pub fn download_file(client: &Client, url: &str, file_path: &Path) -> Result<u64, FetchError> {
    let transport = |e: reqwest::Error| FetchError::Transport {
        url: url.to_string(),
        source: e,
    };
    let response = client
        .get(url)
        .header(USER_AGENT, concat!("enterprise_etl/", env!("CARGO_PKG_VERSION")))
        .send()
        .map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }
    let body = response.bytes().map_err(transport)?;

    let storage = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| FetchError::Storage { path, source: e }
    };
    if let Some(dir) = file_path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(storage(dir))?;
        }
    }
    let mut part = file_path.as_os_str().to_owned();
    part.push(".part");
    let part = Path::new(&part);

    let mut out = File::create(part).map_err(storage(part))?;
    let written = out
        .write_all(&body)
        .and_then(|_| out.sync_all())
        .map_err(storage(part));
    drop(out);
    if let Err(e) = written.and_then(|_| fs::rename(part, file_path).map_err(storage(file_path))) {
        // no partial download is left behind
        let _ = fs::remove_file(part);
        return Err(e);
    }

    info!("downloaded {} bytes to {}", body.len(), file_path.display());
    Ok(body.len() as u64)
}

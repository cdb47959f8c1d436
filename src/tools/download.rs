//! Certificate download tool.
//!
//! Fetches a URL with a single GET and writes the body to
//! `<downloads_dir>/arl_<Month>_<DD>_<YYYY>.pdf`. There is no retry and no
//! status check: whatever the server answers is what lands on disk, and a
//! second download on the same day overwrites the first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use super::{InvalidArguments, Tool};

/// Supplies "today" when naming the downloaded file.
pub type DateSource = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// File name for a certificate downloaded on `date`, e.g. `arl_October_16_2026.pdf`.
pub fn artifact_file_name(date: NaiveDate) -> String {
    date.format("arl_%B_%d_%Y.pdf").to_string()
}

pub struct DownloadFile {
    client: reqwest::Client,
    downloads_dir: PathBuf,
    today: DateSource,
}

impl DownloadFile {
    /// Download into `downloads_dir`, naming files after the local date.
    pub fn new(downloads_dir: &Path) -> Self {
        Self::with_date_source(
            downloads_dir,
            Arc::new(|| chrono::Local::now().date_naive()),
        )
    }

    pub fn with_date_source(downloads_dir: &Path, today: DateSource) -> Self {
        Self {
            client: reqwest::Client::new(),
            downloads_dir: downloads_dir.to_path_buf(),
            today,
        }
    }

    /// Where a download made right now would be written.
    pub fn target_path(&self) -> PathBuf {
        self.downloads_dir.join(artifact_file_name((self.today)()))
    }
}

#[async_trait]
impl Tool for DownloadFile {
    fn name(&self) -> &str {
        "download_file"
    }

    fn description(&self) -> &str {
        "Call this tool when you need to download a file from the web. Saves the file as today's ARL certificate PDF."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The url of the file to download."
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| InvalidArguments::new(self.name(), "missing 'url' argument"))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let path = self.target_path();
        tokio::fs::create_dir_all(&self.downloads_dir).await?;
        tokio::fs::write(&path, &body).await?;

        tracing::info!(
            url,
            status = status.as_u16(),
            bytes = body.len(),
            path = %path.display(),
            "Downloaded file"
        );

        Ok(format!(
            "Downloaded {} bytes to {}",
            body.len(),
            path.display()
        ))
    }
}

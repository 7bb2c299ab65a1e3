//! Installer payload download.

use reqwest::StatusCode;

use super::{Downloader, HttpBackend};
use crate::errors::AppError;

impl Downloader for HttpBackend {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::Download {
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            tracing::debug!("Download size: {} bytes", len);
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

//! Backend API module.
//!
//! Narrow seams over the HTTP side of the backend so the update flow can be driven
//! against fakes: [`UpdateService`] for the edge function and [`Downloader`] for
//! installer payloads. [`HttpBackend`] implements both with one shared client.

mod download;
mod functions;

use std::future::Future;

use reqwest::header::HeaderMap;

use crate::auth;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::VersionCheckResponse;

/// Asks the backend whether a newer version exists.
pub trait UpdateService {
    fn check_update(
        &self,
        current_version: &str,
    ) -> impl Future<Output = Result<VersionCheckResponse, AppError>> + Send;
}

/// Fetches an installer payload.
pub trait Downloader {
    /// GET `url`; anything but `200 OK` is [`AppError::Download`].
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;
}

/// reqwest-backed implementation of the backend seams.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    /// Sent to the function endpoint only; downloads may live on another host.
    auth: HeaderMap,
    check_update_url: String,
}

impl HttpBackend {
    /// Build the client with the optional request timeout.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let auth = auth::auth_headers(&config.anon_key)?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("mynofi-updater/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth,
            check_update_url: config.function_url(crate::config::CHECK_UPDATE_FUNCTION),
        })
    }
}

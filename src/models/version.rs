//! Version check models matching the `check-update` function contract.

use serde::{Deserialize, Serialize};

/// Request body for the update check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCheckRequest {
    pub current_version: String,
}

impl VersionCheckRequest {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
        }
    }
}

/// Response of the update check.
///
/// Everything except `update_available` is only meaningful when it is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCheckResponse {
    pub update_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_update: Option<bool>,
}

/// Body returned by the function endpoint.
///
/// Invoking through the client libraries nests the payload under `data`; a raw
/// function response is the payload itself. Both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FunctionEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> FunctionEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            FunctionEnvelope::Wrapped { data } => data,
            FunctionEnvelope::Bare(data) => data,
        }
    }
}

/// Details of an available update, passed through from the response unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub latest_version: Option<String>,
    pub release_notes: Option<String>,
    pub download_url: Option<String>,
    pub requires_update: bool,
}

/// Result of a successful update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Already on the latest version
    NoUpdate,
    /// A newer version is published
    UpdateAvailable(UpdateInfo),
}

impl CheckOutcome {
    /// Returns the update info if an update is available
    pub fn update(&self) -> Option<&UpdateInfo> {
        match self {
            CheckOutcome::UpdateAvailable(info) => Some(info),
            CheckOutcome::NoUpdate => None,
        }
    }
}

impl From<VersionCheckResponse> for CheckOutcome {
    fn from(response: VersionCheckResponse) -> Self {
        if !response.update_available {
            return CheckOutcome::NoUpdate;
        }

        CheckOutcome::UpdateAvailable(UpdateInfo {
            latest_version: response.latest_version,
            release_notes: response.release_notes,
            download_url: response.download_url,
            requires_update: response.requires_update.unwrap_or(false),
        })
    }
}

//! `check-update` edge function call.

use super::{HttpBackend, UpdateService};
use crate::errors::{AppError, FunctionErrorBody};
use crate::models::{FunctionEnvelope, VersionCheckRequest, VersionCheckResponse};

impl UpdateService for HttpBackend {
    async fn check_update(&self, current_version: &str) -> Result<VersionCheckResponse, AppError> {
        tracing::debug!("POST {}", self.check_update_url);

        let response = self
            .client
            .post(&self.check_update_url)
            .headers(self.auth.clone())
            .json(&VersionCheckRequest::new(current_version))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Remote {
                status: status.as_u16(),
                message: FunctionErrorBody::message_from(&body),
            });
        }

        let envelope: FunctionEnvelope<VersionCheckResponse> = serde_json::from_str(&body)?;
        Ok(envelope.into_inner())
    }
}

//! Update checker - asks the `check-update` function whether a newer build exists

use tracing::{error, info, warn};

use crate::api::UpdateService;
use crate::errors::AppError;
use crate::models::{CheckOutcome, UpdateInfo};

/// Update checker bound to the locally installed version.
pub struct UpdateChecker<S> {
    service: S,
    current_version: String,
}

impl<S: UpdateService> UpdateChecker<S> {
    pub fn new(service: S, current_version: impl Into<String>) -> Self {
        Self {
            service,
            current_version: current_version.into(),
        }
    }

    #[cfg(test)]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Get the version reported to the backend
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Check for updates.
    ///
    /// # Returns
    /// * `Ok(CheckOutcome::UpdateAvailable(_))` - A newer version is published
    /// * `Ok(CheckOutcome::NoUpdate)` - Already on latest version
    /// * `Err(AppError)` - The check itself failed; it is logged, never retried
    pub async fn check_for_updates(&self) -> Result<CheckOutcome, AppError> {
        info!("Checking for updates (current version {})", self.current_version);

        let response = match self.service.check_update(&self.current_version).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error checking for updates: {}", e);
                return Err(e);
            }
        };

        let outcome = CheckOutcome::from(response);
        match &outcome {
            CheckOutcome::NoUpdate => info!("Your application is up to date"),
            CheckOutcome::UpdateAvailable(update) => report_update(update),
        }

        Ok(outcome)
    }
}

fn report_update(update: &UpdateInfo) {
    info!(
        "Update available: version {}",
        update.latest_version.as_deref().unwrap_or("<unknown>")
    );
    info!(
        "Release notes: {}",
        update.release_notes.as_deref().unwrap_or("<none>")
    );
    info!(
        "Download URL: {}",
        update.download_url.as_deref().unwrap_or("<none>")
    );

    // Enforcement is up to the host application.
    if update.requires_update {
        warn!("This update is required to continue using the application");
    }
}

//! Mynofi Updater
//!
//! Checks the backend for a newer build on startup, installs it when one is
//! published, then listens on the real-time channel for release notifications.

mod api;
mod auth;
mod config;
mod errors;
mod models;
mod realtime;
mod updater;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{Downloader, HttpBackend, UpdateService};
use config::{Config, LogFormat};
use errors::AppError;
use models::CheckOutcome;
use realtime::{ListenSummary, NotificationListener, RealtimeConnector, TungsteniteConnector};
use updater::{UpdateChecker, UpdateInstaller};

/// The three phases wired to their backends.
pub struct App<S, D, C> {
    pub config: Arc<Config>,
    pub checker: UpdateChecker<S>,
    pub installer: UpdateInstaller<D>,
    pub connector: C,
}

/// What happened during one run.
#[derive(Debug)]
pub struct RunReport {
    pub startup_check: Result<CheckOutcome, AppError>,
    /// Installer written by the startup phase
    pub downloaded: Option<PathBuf>,
    /// PID of the launched installer
    pub launched: Option<u32>,
    pub listen: Result<ListenSummary, AppError>,
}

impl App<HttpBackend, HttpBackend, TungsteniteConnector> {
    /// Wire the reqwest and tokio-tungstenite implementations.
    pub fn live(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let backend = HttpBackend::new(&config)?;

        Ok(Self {
            checker: UpdateChecker::new(backend.clone(), config.current_version.clone()),
            installer: UpdateInstaller::new(backend, Arc::clone(&config)),
            connector: TungsteniteConnector,
            config,
        })
    }
}

impl<S, D, C> App<S, D, C>
where
    S: UpdateService,
    D: Downloader,
    C: RealtimeConnector + Clone,
{
    /// Check, maybe install, then listen until the connection ends.
    pub async fn run(&self) -> Result<RunReport, AppError> {
        let startup_check = self.checker.check_for_updates().await;

        let mut downloaded = None;
        let mut launched = None;

        if let Some(update) = startup_check.as_ref().ok().and_then(CheckOutcome::update) {
            if !self.config.auto_install {
                tracing::info!("Automatic install disabled (MYNOFI_AUTO_INSTALL=false)");
            } else if let Some(url) = update.download_url.as_deref() {
                if let Ok(path) = self.installer.download_update(url).await {
                    downloaded = Some(path);
                    launched = self.installer.install_update().ok();
                }
            } else {
                tracing::warn!("Update has no download URL, skipping install");
            }
        }

        let listener = NotificationListener::new(
            self.connector.clone(),
            &self.checker,
            self.config.realtime_url()?,
            self.config.realtime_topic.clone(),
        )
        .with_heartbeat(self.config.heartbeat_interval);

        let listen = listener.listen_for_notifications().await;

        Ok(RunReport {
            startup_check,
            downloaded,
            launched,
            listen,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info", LogFormat::Text);
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging
    init_tracing(&config.log_level, config.log_format);

    tracing::info!("Starting Mynofi Updater");
    tracing::info!("Backend: {}", config.supabase_url);
    tracing::info!("Anon key: {}", auth::redact_key(&config.anon_key));

    let app = App::live(config)?;
    tracing::info!("Current version: {}", app.checker.current_version());
    tracing::info!("Installer path: {:?}", app.installer.installer_path());

    let report = app.run().await?;

    if report.startup_check.is_err() {
        tracing::warn!("Startup update check failed; see above");
    }
    match (&report.downloaded, report.launched) {
        (Some(path), Some(pid)) => tracing::info!("Installer {:?} running as pid {}", path, pid),
        (Some(path), None) => tracing::warn!("Installer {:?} downloaded but not launched", path),
        _ => {}
    }
    if let Ok(summary) = &report.listen {
        tracing::info!(
            "Stopped listening: {} frames, {} notifications, {} heartbeats",
            summary.frames,
            summary.notifications,
            summary.heartbeats
        );
    }

    Ok(())
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

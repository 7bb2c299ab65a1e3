//! Update installer - downloads the installer and launches it detached

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::Downloader;
use crate::config::Config;
use crate::errors::AppError;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// Downloads installers to the configured path and runs them.
pub struct UpdateInstaller<D> {
    downloader: D,
    config: Arc<Config>,
}

impl<D: Downloader> UpdateInstaller<D> {
    pub fn new(downloader: D, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }

    /// Path the installer is written to.
    pub fn installer_path(&self) -> &Path {
        &self.config.installer_path
    }

    /// Download the update file.
    ///
    /// The whole body is fetched before anything touches the disk, so a failed
    /// request leaves an existing installer in place.
    pub async fn download_update(&self, download_url: &str) -> Result<PathBuf, AppError> {
        let url = self.config.resolve_download_url(download_url);
        info!("Downloading update from: {}", url);

        let bytes = match self.downloader.fetch(&url).await {
            Ok(bytes) => bytes,
            Err(AppError::Download { status }) => {
                error!("Failed to download update: HTTP {}", status);
                return Err(AppError::Download { status });
            }
            Err(e) => {
                error!("Error downloading update: {}", e);
                return Err(e);
            }
        };

        let dest = self.config.installer_path.clone();
        if let Err(e) = write_installer(&dest, &bytes).await {
            error!("Error saving update to {}: {}", dest.display(), e);
            return Err(e);
        }

        info!(
            "Download complete ({} bytes). Ready to install.",
            bytes.len()
        );
        Ok(dest)
    }

    /// Launch the downloaded installer without waiting for it. Returns the child PID.
    pub fn install_update(&self) -> Result<u32, AppError> {
        match launch_detached(&self.config.installer_path) {
            Ok(pid) => {
                info!("Installer launched (pid {})", pid);
                Ok(pid)
            }
            Err(e) => {
                error!("Error installing update: {}", e);
                Err(e)
            }
        }
    }
}

fn resolve_installer(
    path: &Path,
    current_dir: impl FnOnce() -> std::io::Result<PathBuf>,
) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = current_dir()
        .map_err(|e| AppError::Install(format!("Cannot resolve installer path: {}", e)))?;
    Ok(cwd.join(path))
}

async fn write_installer(dest: &Path, bytes: &[u8]) -> Result<(), AppError> {
    tokio::fs::write(dest, bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}

/// Spawn `path` with no arguments and detach from it.
///
/// Relative paths are resolved against the working directory rather than `PATH`.
/// On Unix the child gets its own process group, so a Ctrl-C aimed at the
/// updater does not reach a running installer. The exit status is collected on
/// a background thread; nothing waits on it.
pub fn launch_detached(path: &Path) -> Result<u32, AppError> {
    let path = resolve_installer(path, std::env::current_dir)?;

    if !path.is_file() {
        return Err(AppError::Install(format!(
            "Installer not found: {}",
            path.display()
        )));
    }

    let mut cmd = Command::new(&path);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(DETACHED_PROCESS);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| AppError::Install(format!("Failed to launch installer: {}", e)))?;
    let pid = child.id();

    // Reap the installer when it exits so it never lingers as a zombie.
    let reaper = std::thread::Builder::new()
        .name("installer-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!("Installer (pid {}) exited with {}", pid, status),
            Err(e) => warn!("Failed to wait for installer (pid {}): {}", pid, e),
        });
    if let Err(e) = reaper {
        warn!("Installer (pid {}) will not be reaped: {}", pid, e);
    }

    Ok(pid)
}

//! Update flow building blocks: the checker asks the backend, the installer
//! downloads and launches the new build.

mod checker;
mod installer;

pub use checker::UpdateChecker;
pub use installer::UpdateInstaller;

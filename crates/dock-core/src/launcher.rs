//! Starting applications as detached OS processes.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::platform::{self, Platform};

/// How the launched application should come up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfiguration {
    /// Bring the application to the foreground
    pub activates: bool,
}

impl Default for LaunchConfiguration {
    fn default() -> Self {
        Self { activates: true }
    }
}

/// An application that was started successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub location: PathBuf,
    /// Process id, when the platform hands one back
    pub pid: Option<u32>,
}

#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the application could not be started.
    async fn open_application(
        &self,
        location: &Path,
        config: LaunchConfiguration,
    ) -> io::Result<RunningApp>;
}

/// Launcher that starts real processes.
///
/// On macOS the bundle is handed to `open`. Elsewhere the location is
/// executed directly; a directory is treated as an AppDir and its `AppRun`
/// is executed.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    platform: Platform,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            platform: platform::detect(),
        }
    }

    async fn open_bundle(location: &Path, config: LaunchConfiguration) -> io::Result<RunningApp> {
        let mut command = Command::new("open");
        if !config.activates {
            command.arg("-g");
        }
        let status = command
            .arg(location)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(io::Error::other(format!("open exited with {status}")));
        }

        Ok(RunningApp {
            location: location.to_path_buf(),
            pid: None,
        })
    }

    async fn spawn_executable(
        location: &Path,
        config: LaunchConfiguration,
    ) -> io::Result<RunningApp> {
        let metadata = tokio::fs::metadata(location).await?;
        let program = if metadata.is_dir() {
            location.join("AppRun")
        } else {
            location.to_path_buf()
        };

        if config.activates {
            debug!("Foreground activation of {} is left to the compositor", program.display());
        }

        let mut command = Command::new(&program);
        command
            .current_dir(location.parent().unwrap_or(location))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        // Own process group so the app outlives the dock
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn()?;

        Ok(RunningApp {
            location: location.to_path_buf(),
            pid: child.id(),
        })
    }
}

#[async_trait]
impl AppLauncher for ProcessLauncher {
    async fn open_application(
        &self,
        location: &Path,
        config: LaunchConfiguration,
    ) -> io::Result<RunningApp> {
        debug!(
            "Launching {} on {} (activates: {})",
            location.display(),
            self.platform.as_str(),
            config.activates
        );

        let app = if self.platform.uses_open_command() {
            Self::open_bundle(location, config).await?
        } else {
            Self::spawn_executable(location, config).await?
        };

        info!("Started {} (pid: {:?})", location.display(), app.pid);
        Ok(app)
    }
}

//! Launch pipeline: access → resolve → launch → report.
//!
//! [`LaunchPipeline::run`] performs the stages in order, one await per
//! stage, and maps every failure to a single [`LaunchError`].
//! [`LaunchPipeline::launch`] runs that off the home context and hands the
//! outcome back through [`HomeContext::dispatch`], where exactly one of the
//! caller's continuations is invoked.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dock_types::{LaunchTarget, WindowId};
use tracing::{debug, error, info, warn};

use crate::broker::{AccessBroker, AccessRequest};
use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::home::HomeContext;
use crate::launcher::{AppLauncher, LaunchConfiguration, RunningApp};

pub type SuccessFn<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;
pub type FailureFn<S> = Box<dyn FnOnce(&mut S, LaunchError) + Send + 'static>;

/// Success and failure callbacks for one launch attempt.
///
/// Both run on the home context with access to its state. Resolving
/// consumes the value, so at most one of them can ever run.
pub struct Continuations<S> {
    on_success: SuccessFn<S>,
    on_failure: FailureFn<S>,
}

impl<S: 'static> Continuations<S> {
    pub fn new(
        on_success: impl FnOnce(&mut S) + Send + 'static,
        on_failure: impl FnOnce(&mut S, LaunchError) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        }
    }

    /// Continuations that do nothing
    #[must_use]
    pub fn ignore() -> Self {
        Self::new(|_| {}, |_, _| {})
    }

    /// Run the continuation matching `outcome`.
    pub fn resolve(self, state: &mut S, outcome: Result<RunningApp, LaunchError>) {
        match outcome {
            Ok(_) => (self.on_success)(state),
            Err(err) => (self.on_failure)(state, err),
        }
    }

    pub fn fail(self, state: &mut S, err: LaunchError) {
        (self.on_failure)(state, err);
    }

    /// Split into the success and failure callbacks, for wrapping.
    #[must_use]
    pub fn into_parts(self) -> (SuccessFn<S>, FailureFn<S>) {
        (self.on_success, self.on_failure)
    }
}

/// Settings for how the pipeline talks to its collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Bring launched applications to the foreground
    pub activate: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { activate: true }
    }
}

impl From<&LaunchConfig> for PipelineOptions {
    fn from(config: &LaunchConfig) -> Self {
        Self {
            activate: config.activate,
        }
    }
}

/// Requests access, resolves the scoped location and starts the application.
#[derive(Clone)]
pub struct LaunchPipeline {
    broker: Arc<dyn AccessBroker>,
    launcher: Arc<dyn AppLauncher>,
    options: PipelineOptions,
}

/// Split a target into the directory to request access for and the file
/// name to resolve inside the grant.
///
/// # Errors
///
/// `MissingTargetLocation` when there is no location,
/// `InvalidTargetLocation` when it is relative or has no file name.
pub fn split_target(target: &LaunchTarget) -> Result<(PathBuf, OsString), LaunchError> {
    let location = target
        .location()
        .ok_or(LaunchError::MissingTargetLocation)?;

    if !location.is_absolute() {
        return Err(LaunchError::InvalidTargetLocation(location.to_path_buf()));
    }

    match (location.parent(), location.file_name()) {
        (Some(directory), Some(file_name)) => {
            Ok((directory.to_path_buf(), file_name.to_os_string()))
        }
        _ => Err(LaunchError::InvalidTargetLocation(location.to_path_buf())),
    }
}

impl LaunchPipeline {
    pub fn new(
        broker: Arc<dyn AccessBroker>,
        launcher: Arc<dyn AppLauncher>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            broker,
            launcher,
            options,
        }
    }

    /// Run every stage for `target` and return the started application.
    ///
    /// A grant is requested for the target's own directory on every call;
    /// nothing is cached between attempts.
    ///
    /// # Errors
    ///
    /// Returns the [`LaunchError`] of the first stage that fails.
    pub async fn run(
        &self,
        target: &LaunchTarget,
        anchor: Option<WindowId>,
    ) -> Result<RunningApp, LaunchError> {
        let (directory, file_name) = split_target(target)?;

        let request = AccessRequest {
            ask_if_needed: true,
            anchor,
            persist: true,
        };
        debug!("Requesting access to {}", directory.display());
        let grant = self.broker.request_access(&directory, request).await?;

        let location = grant.resolve(&file_name);
        let config = LaunchConfiguration {
            activates: self.options.activate,
        };
        let app = self
            .launcher
            .open_application(&location, config)
            .await
            .map_err(|e| LaunchError::LaunchFailure {
                location: location.clone(),
                message: e.to_string(),
            })?;

        info!("Launched {}", location.display());
        Ok(app)
    }

    /// Start a launch attempt without blocking the home context.
    ///
    /// The outcome is dispatched back to `home`, where `continuations` is
    /// resolved exactly once. A panic in a collaborator resolves as a
    /// `LaunchFailure`. If the home context is gone by then, the outcome is
    /// dropped and neither continuation runs.
    pub fn launch<S: 'static>(
        &self,
        target: LaunchTarget,
        anchor: Option<WindowId>,
        home: &HomeContext<S>,
        continuations: Continuations<S>,
    ) {
        let pipeline = self.clone();
        let home = home.clone();

        tokio::spawn(async move {
            let attempt = {
                let target = target.clone();
                tokio::spawn(async move { pipeline.run(&target, anchor).await })
            };
            let outcome = match attempt.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Launch task for {:?} aborted: {e}", target.location());
                    Err(LaunchError::LaunchFailure {
                        location: target.location().map(Path::to_path_buf).unwrap_or_default(),
                        message: format!("launch task aborted: {e}"),
                    })
                }
            };
            if let Err(err) = &outcome {
                debug!("Launch of {:?} failed: {err}", target.location());
            }

            if !home.dispatch(move |state| continuations.resolve(state, outcome)) {
                warn!(
                    "Home context closed before launch of {:?} finished, outcome dropped",
                    target.location()
                );
            }
        });
    }
}

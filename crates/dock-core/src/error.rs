use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the access broker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Access to {} was denied", .0.display())]
    Denied(PathBuf),

    #[error("Access broker failed: {0}")]
    Broker(String),
}

/// Why a launch attempt ended without starting the application.
///
/// Every variant is delivered through the failure continuation; none of
/// them is fatal to the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Launch target has no location")]
    MissingTargetLocation,

    #[error("Launch target is not an absolute application path: {}", .0.display())]
    InvalidTargetLocation(PathBuf),

    #[error("Access to {} was denied", .0.display())]
    AccessDenied(PathBuf),

    #[error("Access broker failed: {0}")]
    BrokerFailure(String),

    #[error("Failed to launch {}: {message}", location.display())]
    LaunchFailure { location: PathBuf, message: String },

    #[error("Another launch is already in progress")]
    InFlight,
}

impl LaunchError {
    /// True for failures raised while negotiating directory access
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, LaunchError::AccessDenied(_) | LaunchError::BrokerFailure(_))
    }
}

impl From<AccessError> for LaunchError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Denied(directory) => LaunchError::AccessDenied(directory),
            AccessError::Broker(message) => LaunchError::BrokerFailure(message),
        }
    }
}

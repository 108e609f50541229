//! Error types for the dock daemon.

use dock_rpc::protocol::{METHOD_NOT_FOUND, RpcError};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] dock_core::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] dock_rpc::transport::CodecError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The controller's home task has exited
    #[error("Dock controller is not running")]
    DockUnavailable,
}

impl From<DaemonError> for RpcError {
    fn from(err: DaemonError) -> Self {
        match err {
            DaemonError::Io(e) => RpcError::internal_error(e.to_string()),
            DaemonError::Json(e) => RpcError::internal_error(e.to_string()),
            DaemonError::Core(e) => RpcError::internal_error(e.to_string()),
            DaemonError::Codec(e) => RpcError::internal_error(e.to_string()),
            DaemonError::InvalidParams(msg) => RpcError::invalid_params(msg),
            DaemonError::MethodNotFound(name) => {
                RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {name}"))
            }
            DaemonError::DockUnavailable => RpcError::dock_unavailable(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;

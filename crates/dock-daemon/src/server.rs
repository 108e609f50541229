//! Socket server for the dock daemon.
//!
//! The controller runs on its own task (its home context). Connections never
//! touch controller state directly: `toggle`, `status` and `shutdown` go
//! through a [`ControllerHandle`], and `launch` is published on the event bus
//! the controller subscribes to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dock_core::config::{Config, Directories};
use dock_core::{
    ControllerHandle, ControllerOptions, EventBus, FsAccessBroker, GrantStore, LaunchPipeline,
    LocalBus, LogReporter, PipelineOptions, ProcessLauncher, ToggleController,
};
use dock_rpc::client::socket_path;
use dock_rpc::protocol::{
    LaunchParams, LaunchResult, METHOD_LAUNCH, METHOD_SHUTDOWN, METHOD_STATUS, METHOD_TOGGLE,
    Message, Request, RequestId, Response,
};
use dock_rpc::transport::JsonRpcCodec;
use dock_types::DockEvent;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, trace, warn};

use crate::error::{DaemonError, Result};
use crate::window::HeadlessFactory;

/// Shared by every connection.
struct DaemonState {
    handle: ControllerHandle<HeadlessFactory>,
    bus: Arc<LocalBus>,
    shutdown: watch::Sender<bool>,
}

/// A configured dock controller that has not started serving yet.
pub struct Daemon {
    controller: ToggleController<HeadlessFactory>,
    bus: Arc<LocalBus>,
}

impl Daemon {
    pub fn new(pipeline: LaunchPipeline, options: ControllerOptions) -> Self {
        let bus = Arc::new(LocalBus::new());
        let controller = ToggleController::new(
            HeadlessFactory::default(),
            pipeline,
            bus.clone() as Arc<dyn EventBus>,
            Arc::new(LogReporter),
            options,
        );
        Self { controller, bus }
    }

    /// Wire the filesystem broker and process launcher from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant store exists but cannot be read.
    pub fn from_config(config: &Config, dirs: &Directories) -> Result<Self> {
        let store = GrantStore::load(&dirs.grants_file)?;
        info!(
            "Loaded {} persisted access grant(s) from {}",
            store.len(),
            dirs.grants_file.display()
        );

        let broker = FsAccessBroker::from_config(&config.access, store);
        let pipeline = LaunchPipeline::new(
            Arc::new(broker),
            Arc::new(ProcessLauncher::new()),
            PipelineOptions::from(&config.launch),
        );
        Ok(Self::new(pipeline, ControllerOptions::from(&config.launch)))
    }

    /// Listen on `path` until a `shutdown` request arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if another daemon already owns `path` or the socket
    /// cannot be bound.
    pub async fn serve(self, path: PathBuf) -> Result<()> {
        cleanup_stale_socket(&path).await?;

        let listener = UnixListener::bind(&path)?;
        info!("Daemon listening on {:?}", path);

        let Self {
            mut controller,
            bus,
        } = self;
        controller.start();
        let handle = controller.handle();
        let controller_task = tokio::spawn(controller.run());

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let state = Arc::new(DaemonState {
            handle,
            bus,
            shutdown,
        });

        info!("Ready to accept connections");
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        debug!("Accepted connection");
                        let state = state.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, state).await {
                                error!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => error!("Accept error: {}", e),
                },
                _ = shutdown_rx.changed() => {
                    info!("Shutdown requested, stopping server");
                    break;
                }
            }
        }

        state.handle.shutdown();
        if let Err(e) = controller_task.await {
            error!("Dock controller task failed: {}", e);
        }

        if path.exists()
            && let Err(e) = std::fs::remove_file(&path)
        {
            warn!("Failed to remove socket file {:?}: {}", path, e);
        }

        Ok(())
    }
}

/// Load configuration from the standard locations and serve until shutdown.
///
/// # Errors
///
/// Returns an error if the directories or configuration cannot be loaded,
/// or the socket cannot be served.
pub async fn run(custom_socket_path: Option<PathBuf>) -> Result<()> {
    let path = custom_socket_path.unwrap_or_else(socket_path);

    let dirs = Directories::new()?;
    dirs.ensure_exists()?;
    let config = Config::load(&dirs.config_file)?;
    debug!("Loaded config from {}", dirs.config_file.display());

    Daemon::from_config(&config, &dirs)?.serve(path).await
}

async fn cleanup_stale_socket(path: &Path) -> Result<()> {
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(DaemonError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "Another daemon is already running",
            )));
        }
        info!("Removing stale socket at {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

async fn handle_connection(stream: UnixStream, state: Arc<DaemonState>) -> Result<()> {
    let mut framed = Framed::new(stream, JsonRpcCodec::new());

    while let Some(result) = framed.next().await {
        match result {
            Ok(Message::Request(request)) => {
                let Some(id) = request.id.clone() else {
                    trace!("Processing notification: method={}", request.method);
                    if let Err(e) = handle_request(&state, &request).await {
                        warn!("Notification {} failed: {}", request.method, e);
                    }
                    continue;
                };

                trace!("Processing request: method={}, id={}", request.method, id);
                let response = respond(id, handle_request(&state, &request).await);
                framed.send(Message::Response(response)).await?;
            }
            Ok(Message::Response(resp)) => {
                warn!("Ignoring unsolicited response {}", resp.id);
            }
            Err(e) => {
                warn!("Read error: {}", e);
                break;
            }
        }
    }

    debug!("Connection closed");
    Ok(())
}

fn respond(id: RequestId, outcome: Result<Value>) -> Response {
    match outcome {
        Ok(result) => Response::success(id, result),
        Err(err) => Response::error(id, err.into()),
    }
}

async fn handle_request(state: &DaemonState, request: &Request) -> Result<Value> {
    match request.method.as_str() {
        METHOD_TOGGLE => {
            if !state.handle.toggle() {
                return Err(DaemonError::DockUnavailable);
            }
            // Queued after the toggle, so it observes the new state
            let status = state
                .handle
                .status()
                .await
                .ok_or(DaemonError::DockUnavailable)?;
            Ok(serde_json::to_value(status)?)
        }
        METHOD_LAUNCH => {
            let params = request
                .params
                .clone()
                .ok_or_else(|| DaemonError::InvalidParams("launch requires params".to_string()))?;
            let params: LaunchParams = serde_json::from_value(params)
                .map_err(|e| DaemonError::InvalidParams(e.to_string()))?;

            let event = DockEvent::OpenApp {
                entry: params.into_entry(),
            };
            let delivered = state.bus.publish(&event);
            if delivered == 0 {
                return Err(DaemonError::DockUnavailable);
            }
            Ok(serde_json::to_value(LaunchResult { delivered })?)
        }
        METHOD_STATUS => {
            let status = state
                .handle
                .status()
                .await
                .ok_or(DaemonError::DockUnavailable)?;
            Ok(serde_json::to_value(status)?)
        }
        METHOD_SHUTDOWN => {
            state.handle.shutdown();
            state.shutdown.send_replace(true);
            Ok(serde_json::json!({}))
        }
        other => Err(DaemonError::MethodNotFound(other.to_string())),
    }
}
